use std::time::Duration;

use thiserror::Error;

use crate::core::types::EntityId;
use crate::llm::decode::{DecodeError, ValidationError};

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Entity not found: {0:?}")]
    EntityNotFound(EntityId),

    #[error("Unknown component: {0}")]
    UnknownComponent(String),

    #[error("Unknown field {component}.{field}")]
    UnknownField { component: String, field: String },

    #[error("Field {component}.{field} expects {expected}")]
    FieldMismatch {
        component: String,
        field: String,
        expected: &'static str,
    },

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("LLM call exceeded deadline of {0:?}")]
    OracleTimeout(Duration),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl SimError {
    /// True for failures of the oracle itself (unreachable, errored, timed out)
    pub fn is_transport(&self) -> bool {
        matches!(self, SimError::LlmError(_) | SimError::OracleTimeout(_))
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
