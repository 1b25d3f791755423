//! Stimuli - events an agent perceives

use serde::{Deserialize, Serialize};

use crate::core::types::Timestamp;

/// Sensory channel a stimulus arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StimulusKind {
    Visual,
    Auditory,
    Speech,
    Tactile,
    Environmental,
    Cognitive,
}

/// Something an agent perceived; never modified after creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stimulus {
    #[serde(rename = "type")]
    pub kind: StimulusKind,
    pub content: String,
    pub timestamp: Timestamp,
    /// Name of whoever or whatever produced the stimulus
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Stimulus {
    pub fn new(kind: StimulusKind, content: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            kind,
            content: content.into(),
            timestamp,
            source: None,
        }
    }

    pub fn speech(content: impl Into<String>, timestamp: Timestamp) -> Self {
        Self::new(StimulusKind::Speech, content, timestamp)
    }

    pub fn from_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}
