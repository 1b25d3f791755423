//! Change detection - does recent experience call for new goals?

use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::entity::Goal;
use crate::llm::decode::{decode_envelope, from_value};
use crate::llm::oracle::OracleGateway;
use crate::llm::template::compose_from;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectChangesState {
    pub name: String,
    #[serde(skip)]
    pub agent_id: String,
    pub role: String,
    #[serde(skip)]
    pub system_prompt: String,
    pub current_goals: Vec<Goal>,
    pub recent_experiences: String,
    pub perception_summary: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    #[default]
    MaintainGoals,
    UpdateGoals,
    GenerateNewGoals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeAnalysis {
    pub significant_change: bool,
    pub changes: Vec<String>,
    pub recommendation: Recommendation,
    #[serde(default)]
    pub reasoning: Vec<String>,
}

impl ChangeAnalysis {
    /// Used when the oracle could not be consulted: keep everything as is
    pub fn unchanged() -> Self {
        Self {
            significant_change: false,
            changes: Vec::new(),
            recommendation: Recommendation::MaintainGoals,
            reasoning: vec!["Error in change detection".to_string()],
        }
    }

    /// Whether the agent's goals should be regenerated
    pub fn calls_for_new_goals(&self) -> bool {
        self.significant_change && self.recommendation != Recommendation::MaintainGoals
    }
}

/// Never fails; an unusable reply means "no significant change"
pub async fn detect_significant_changes(gateway: &OracleGateway, state: &DetectChangesState) -> ChangeAnalysis {
    match try_detect(gateway, state).await {
        Ok(analysis) => {
            tracing::debug!(
                agent = %state.agent_id,
                significant = analysis.significant_change,
                recommendation = ?analysis.recommendation,
                "change analysis"
            );
            analysis
        }
        Err(e) => {
            tracing::warn!(agent = %state.agent_id, error = %e, "change detection failed");
            gateway.report(&state.agent_id, &e, "Error in change detection");
            ChangeAnalysis::unchanged()
        }
    }
}

async fn try_detect(gateway: &OracleGateway, state: &DetectChangesState) -> Result<ChangeAnalysis> {
    let prompt = compose_from(DETECT_CHANGES, state)?;
    let text = gateway.call(&prompt, &state.system_prompt, &state.agent_id).await?;
    let raw = decode_envelope(&text, "analysis")?;
    Ok(from_value(raw)?)
}

const DETECT_CHANGES: &str = r#"You are {name}, {role}.

Your current goals:
{currentGoals}

Your recent experiences:
{recentExperiences}

What you perceive:
{perceptionSummary}

Has anything happened that makes your current goals wrong, finished or
pointless? Only report a significant change when your goals really need to
change. Recommend one of: maintain_goals, update_goals, generate_new_goals.

Respond with JSON only, in exactly this shape:
{"analysis": {"significant_change": false, "changes": ["..."], "recommendation": "maintain_goals", "reasoning": ["..."]}}"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cognition::testing::{failing_gateway, fixed_gateway};

    fn state() -> DetectChangesState {
        DetectChangesState {
            name: "Ada".into(),
            agent_id: "Ada".into(),
            role: "a blacksmith".into(),
            system_prompt: String::new(),
            current_goals: Vec::new(),
            recent_experiences: "[00:00:01] <SPEECH> the forge is on fire".into(),
            perception_summary: String::new(),
        }
    }

    #[tokio::test]
    async fn test_significant_change() {
        let (gateway, _) = fixed_gateway(
            r#"{"analysis":{"significant_change":true,"changes":["forge burning"],"recommendation":"generate_new_goals","reasoning":["cannot work"]}}"#,
        );
        let analysis = detect_significant_changes(&gateway, &state()).await;
        assert_eq!(analysis.recommendation, Recommendation::GenerateNewGoals);
        assert!(analysis.calls_for_new_goals());
    }

    #[tokio::test]
    async fn test_failure_keeps_goals() {
        let (gateway, _) = failing_gateway();
        let analysis = detect_significant_changes(&gateway, &state()).await;
        assert!(!analysis.significant_change);
        assert!(analysis.changes.is_empty());
        assert_eq!(analysis.recommendation, Recommendation::MaintainGoals);
        assert_eq!(analysis.reasoning, vec!["Error in change detection".to_string()]);
        assert!(!analysis.calls_for_new_goals());
    }

    #[tokio::test]
    async fn test_prose_reply_keeps_goals() {
        let (gateway, audit) = fixed_gateway("Nothing much changed.");
        assert_eq!(detect_significant_changes(&gateway, &state()).await, ChangeAnalysis::unchanged());
        assert_eq!(audit.errors().len(), 1);

        let (gateway, _) = fixed_gateway(r#"{"significant_change": true}"#);
        assert_eq!(detect_significant_changes(&gateway, &state()).await, ChangeAnalysis::unchanged());
    }

    #[tokio::test]
    async fn test_unknown_recommendation_falls_back() {
        let (gateway, _) = fixed_gateway(
            r#"{"analysis":{"significant_change":true,"changes":[],"recommendation":"panic","reasoning":[]}}"#,
        );
        assert_eq!(detect_significant_changes(&gateway, &state()).await, ChangeAnalysis::unchanged());
    }

    #[test]
    fn test_wire_shape() {
        let json = serde_json::to_value(ChangeAnalysis::unchanged()).unwrap();
        assert_eq!(json["recommendation"], "maintain_goals");
        assert_eq!(json["significant_change"], false);
    }
}
