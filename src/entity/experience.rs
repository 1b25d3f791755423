//! Experiences - validated, timestamped records of what an agent went through

use serde::{Deserialize, Serialize};

use crate::core::types::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperienceKind {
    Speech,
    Action,
    Observation,
    Thought,
}

impl ExperienceKind {
    pub const ALL: [&'static str; 4] = ["speech", "action", "observation", "thought"];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExperienceKind::Speech => "speech",
            ExperienceKind::Action => "action",
            ExperienceKind::Observation => "observation",
            ExperienceKind::Thought => "thought",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    #[serde(rename = "type")]
    pub kind: ExperienceKind,
    pub content: String,
    pub timestamp: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Experience {
    pub fn new(kind: ExperienceKind, content: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            kind,
            content: content.into(),
            timestamp,
            category: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Empty content or a non-positive timestamp may never enter history
    pub fn is_valid(&self) -> bool {
        !self.content.is_empty() && self.timestamp > 0.0
    }

    /// `[HH:MM:SS] <TYPE> content`
    pub fn render(&self) -> String {
        format!(
            "[{}] <{}> {}",
            crate::core::types::format_clock(self.timestamp),
            self.kind.as_str().to_uppercase(),
            self.content
        )
    }
}
