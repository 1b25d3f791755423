//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};

/// Opaque identifier for entities in a [`World`](crate::ecs::world::World)
///
/// Ids are allocated monotonically and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u32);

impl EntityId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wall-clock time in milliseconds since the Unix epoch
pub type Timestamp = f64;

/// Current wall-clock time as a [`Timestamp`]
pub fn now_millis() -> Timestamp {
    chrono::Utc::now().timestamp_millis() as Timestamp
}

/// Fresh identifier for goals, plans and steps the oracle left unnamed
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Render a timestamp as `HH:MM:SS` (UTC) for prompt text
pub fn format_clock(ts: Timestamp) -> String {
    chrono::DateTime::from_timestamp_millis(ts as i64)
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| format!("{}", ts))
}
