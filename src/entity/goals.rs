//! Goals - tracked objectives with status and progress

use serde::{Deserialize, Serialize};

use crate::core::types::{new_id, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    LongTerm,
    ShortTerm,
    Immediate,
}

/// Goal lifecycle; only goal evaluation or change detection moves a goal
/// out of `Active`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    #[default]
    Active,
    Completed,
    Failed,
    Suspended,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    #[serde(default = "new_id")]
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub priority: f64,
    #[serde(rename = "type")]
    pub kind: GoalType,
    #[serde(default)]
    pub status: GoalStatus,
    /// Fraction complete, 0.0 - 1.0
    #[serde(default)]
    pub progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_goal_id: Option<String>,
    #[serde(default, rename = "success_criteria")]
    pub success_criteria: Vec<String>,
    #[serde(default, rename = "progress_indicators")]
    pub progress_indicators: Vec<String>,
}

impl Goal {
    pub fn new(description: impl Into<String>, kind: GoalType, priority: f64) -> Self {
        Self {
            id: new_id(),
            description: description.into(),
            priority,
            kind,
            status: GoalStatus::Active,
            progress: 0.0,
            deadline: None,
            parent_goal_id: None,
            success_criteria: Vec::new(),
            progress_indicators: Vec::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == GoalStatus::Active
    }

    /// Set progress, clamped to [0, 1]
    pub fn set_progress(&mut self, progress: f64) {
        self.progress = if progress.is_finite() { progress.clamp(0.0, 1.0) } else { 0.0 };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oracle_goal_defaults() {
        let goal: Goal =
            serde_json::from_str(r#"{"description":"find water","type":"immediate","priority":3}"#).unwrap();
        assert!(!goal.id.is_empty());
        assert_eq!(goal.status, GoalStatus::Active);
        assert_eq!(goal.progress, 0.0);
        assert_eq!(goal.kind, GoalType::Immediate);
    }

    #[test]
    fn test_wire_names() {
        let mut goal = Goal::new("explore", GoalType::LongTerm, 1.0);
        goal.parent_goal_id = Some("root".into());
        let json = serde_json::to_value(&goal).unwrap();
        assert_eq!(json["type"], "long_term");
        assert_eq!(json["parentGoalId"], "root");
        assert!(json.get("deadline").is_none());
    }

    #[test]
    fn test_progress_clamped() {
        let mut goal = Goal::new("x", GoalType::ShortTerm, 1.0);
        goal.set_progress(1.7);
        assert_eq!(goal.progress, 1.0);
        goal.set_progress(f64::NAN);
        assert_eq!(goal.progress, 0.0);
    }
}
