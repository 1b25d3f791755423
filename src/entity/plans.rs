//! Plans - ordered steps pursuing one goal

use serde::{Deserialize, Serialize};

use crate::core::types::{new_id, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    #[serde(default = "new_id")]
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_tools: Option<Vec<String>>,
    #[serde(default)]
    pub expected_outcome: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    #[default]
    Active,
    Completed,
    Failed,
    Suspended,
}

/// Steps execute in the order they are listed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    #[serde(default = "new_id")]
    pub id: String,
    pub goal_id: String,
    pub steps: Vec<Step>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step_id: Option<String>,
    #[serde(default)]
    pub status: PlanStatus,
    #[serde(default)]
    pub created_at: Timestamp,
    #[serde(default)]
    pub updated_at: Timestamp,
}

impl Plan {
    pub fn is_active(&self) -> bool {
        self.status == PlanStatus::Active
    }

    /// The step named by `current_step_id`, else the first unfinished step
    pub fn current_step(&self) -> Option<&Step> {
        if let Some(id) = &self.current_step_id {
            if let Some(step) = self.steps.iter().find(|s| &s.id == id) {
                return Some(step);
            }
        }
        self.steps
            .iter()
            .find(|s| matches!(s.status, StepStatus::Pending | StepStatus::InProgress))
    }
}
