//! Outcome of a previously requested tool action
//!
//! Executing actions is the simulation runtime's job; this is only the record
//! it hands back so the next cycle can reason about it.

use serde::{Deserialize, Serialize};

use crate::core::types::Timestamp;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub tool: String,
    pub success: bool,
    pub message: String,
    pub timestamp: Timestamp,
}
