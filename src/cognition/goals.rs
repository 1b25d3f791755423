//! Goal manager - proposes new goals and evaluates progress on existing ones

use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::entity::{Goal, GoalType};
use crate::llm::decode::{decode_envelope, from_value, validate_batch, FieldRule, RecordSchema, TypedSchema};
use crate::llm::oracle::OracleGateway;
use crate::llm::template::compose_from;

/// Context for goal generation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateGoalsState {
    pub name: String,
    #[serde(skip)]
    pub agent_id: String,
    pub role: String,
    #[serde(skip)]
    pub system_prompt: String,
    pub current_goals: Vec<Goal>,
    pub recent_experiences: String,
    pub perception_summary: String,
    pub perception_context: Vec<String>,
}

/// Context for evaluating one goal
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateGoalState {
    pub name: String,
    #[serde(skip)]
    pub agent_id: String,
    #[serde(skip)]
    pub system_prompt: String,
    pub goal_description: String,
    pub goal_type: GoalType,
    pub success_criteria: Vec<String>,
    pub progress_indicators: Vec<String>,
    pub current_progress: f64,
    pub recent_experiences: String,
    pub perception_summary: String,
}

impl EvaluateGoalState {
    /// Goal fields copied out of `goal`; everything else left empty
    pub fn for_goal(name: &str, system_prompt: &str, goal: &Goal) -> Self {
        Self {
            name: name.to_string(),
            agent_id: name.to_string(),
            system_prompt: system_prompt.to_string(),
            goal_description: goal.description.clone(),
            goal_type: goal.kind,
            success_criteria: goal.success_criteria.clone(),
            progress_indicators: goal.progress_indicators.clone(),
            current_progress: goal.progress,
            recent_experiences: String::new(),
            perception_summary: String::new(),
        }
    }
}

/// Oracle's verdict on one goal
///
/// The default is the conservative "nothing happened" evaluation used when
/// the oracle cannot be consulted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GoalEvaluation {
    pub complete: bool,
    pub progress: f64,
    pub criteria_met: Vec<String>,
    pub criteria_partial: Vec<String>,
    pub criteria_blocked: Vec<String>,
    pub recent_advancements: Vec<String>,
    pub blockers: Vec<String>,
    pub next_steps: Vec<String>,
}

pub fn goal_schema() -> TypedSchema<Goal> {
    RecordSchema::new()
        .required("description", FieldRule::NonEmptyText)
        .required("type", FieldRule::one_of(&["long_term", "short_term", "immediate"]))
        .optional("priority", FieldRule::Number)
        .optional("status", FieldRule::one_of(&["active", "completed", "failed", "suspended"]))
        .optional("progress", FieldRule::Range { min: 0.0, max: 1.0 })
        .optional("success_criteria", FieldRule::TextList)
        .optional("progress_indicators", FieldRule::TextList)
        .typed()
}

/// Candidate goals, or an empty list on any failure
pub async fn generate_goals(gateway: &OracleGateway, state: &GenerateGoalsState) -> Vec<Goal> {
    match try_generate(gateway, state).await {
        Ok(goals) => {
            tracing::debug!(agent = %state.agent_id, count = goals.len(), "generated goals");
            goals
        }
        Err(e) => {
            tracing::warn!(agent = %state.agent_id, error = %e, "goal generation failed");
            gateway.report(&state.agent_id, &e, "Error generating goals");
            Vec::new()
        }
    }
}

async fn try_generate(gateway: &OracleGateway, state: &GenerateGoalsState) -> Result<Vec<Goal>> {
    let prompt = compose_from(GENERATE_GOALS, state)?;
    let text = gateway.call(&prompt, &state.system_prompt, &state.agent_id).await?;
    let raw = decode_envelope(&text, "goals")?;
    Ok(validate_batch(&raw, &goal_schema())?)
}

/// Progress report for one goal; the conservative default on any failure
pub async fn evaluate_goal_progress(gateway: &OracleGateway, state: &EvaluateGoalState) -> GoalEvaluation {
    match try_evaluate(gateway, state).await {
        Ok(evaluation) => {
            tracing::debug!(
                agent = %state.agent_id,
                goal = %state.goal_description,
                complete = evaluation.complete,
                progress = evaluation.progress,
                "evaluated goal"
            );
            evaluation
        }
        Err(e) => {
            tracing::warn!(agent = %state.agent_id, error = %e, "goal evaluation failed");
            gateway.report(&state.agent_id, &e, "Error evaluating goal progress");
            GoalEvaluation::default()
        }
    }
}

async fn try_evaluate(gateway: &OracleGateway, state: &EvaluateGoalState) -> Result<GoalEvaluation> {
    let prompt = compose_from(EVALUATE_GOAL, state)?;
    let text = gateway.call(&prompt, &state.system_prompt, &state.agent_id).await?;
    let raw = decode_envelope(&text, "evaluation")?;
    Ok(from_value(raw)?)
}

const GENERATE_GOALS: &str = r#"You are {name}, {role}.

Your current goals:
{currentGoals}

Your recent experiences:
{recentExperiences}

What you perceive:
{perceptionSummary}

Notable things around you:
{perceptionContext}

Decide which goals you should pursue now. Keep goals that still matter,
drop ones that no longer do, and add new ones when your situation calls for
it. Every goal needs a description, a type (long_term, short_term or
immediate), a numeric priority (higher is more urgent), success_criteria and
progress_indicators.

Respond with JSON only, in exactly this shape:
{"goals": [{"description": "...", "type": "short_term", "priority": 1, "success_criteria": ["..."], "progress_indicators": ["..."]}]}"#;

const EVALUATE_GOAL: &str = r#"You are {name}. Evaluate your progress on this {goalType} goal:

{goalDescription}

Success criteria:
{successCriteria}

Progress indicators:
{progressIndicators}

Progress so far: {currentProgress}

Your recent experiences:
{recentExperiences}

What you perceive:
{perceptionSummary}

Judge only from what actually happened. Progress is a number from 0 to 1.

Respond with JSON only, in exactly this shape:
{"evaluation": {"complete": false, "progress": 0.0, "criteria_met": [], "criteria_partial": [], "criteria_blocked": [], "recent_advancements": [], "blockers": [], "next_steps": []}}"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cognition::testing::{failing_gateway, fixed_gateway};
    use crate::entity::GoalStatus;

    fn generate_state() -> GenerateGoalsState {
        GenerateGoalsState {
            name: "Ada".into(),
            agent_id: "Ada".into(),
            role: "a blacksmith".into(),
            system_prompt: String::new(),
            current_goals: Vec::new(),
            recent_experiences: String::new(),
            perception_summary: "A quiet forge".into(),
            perception_context: Vec::new(),
        }
    }

    fn evaluate_state() -> EvaluateGoalState {
        let mut goal = Goal::new("forge a sword", GoalType::ShortTerm, 2.0);
        goal.success_criteria = vec!["sword finished".into()];
        EvaluateGoalState::for_goal("Ada", "", &goal)
    }

    #[tokio::test]
    async fn test_generate_goals() {
        let (gateway, _) = fixed_gateway(
            r#"{"goals":[{"description":"find iron","type":"immediate","priority":3,"success_criteria":["have iron"]}]}"#,
        );
        let goals = generate_goals(&gateway, &generate_state()).await;
        assert_eq!(goals.len(), 1);
        assert_eq!(goals[0].description, "find iron");
        assert_eq!(goals[0].status, GoalStatus::Active);
        assert_eq!(goals[0].success_criteria, vec!["have iron".to_string()]);
    }

    #[tokio::test]
    async fn test_generate_goals_decode_failure() {
        let (gateway, _) = fixed_gateway("I think I should rest.");
        assert!(generate_goals(&gateway, &generate_state()).await.is_empty());
    }

    #[tokio::test]
    async fn test_generate_goals_bad_type_rejects_all() {
        let (gateway, _) = fixed_gateway(
            r#"{"goals":[{"description":"a","type":"immediate"},{"description":"b","type":"someday"}]}"#,
        );
        assert!(generate_goals(&gateway, &generate_state()).await.is_empty());
    }

    #[tokio::test]
    async fn test_evaluate_goal() {
        let (gateway, _) = fixed_gateway(
            r#"{"evaluation":{"complete":false,"progress":0.4,"criteria_met":[],"criteria_partial":["blade shaped"],"criteria_blocked":[],"recent_advancements":["heated the steel"],"blockers":[],"next_steps":["quench"]}}"#,
        );
        let evaluation = evaluate_goal_progress(&gateway, &evaluate_state()).await;
        assert_eq!(evaluation.progress, 0.4);
        assert_eq!(evaluation.next_steps, vec!["quench".to_string()]);
    }

    #[tokio::test]
    async fn test_evaluate_goal_failure_is_conservative() {
        let (gateway, audit) = failing_gateway();
        let evaluation = evaluate_goal_progress(&gateway, &evaluate_state()).await;
        assert_eq!(evaluation, GoalEvaluation::default());
        assert!(!evaluation.complete);
        assert_eq!(evaluation.progress, 0.0);
        assert!(!audit.errors().is_empty());
    }

    #[tokio::test]
    async fn test_evaluate_goal_incomplete_payload_is_conservative() {
        let (gateway, _) = fixed_gateway(r#"{"evaluation":{"complete":true}}"#);
        assert_eq!(evaluate_goal_progress(&gateway, &evaluate_state()).await, GoalEvaluation::default());
    }

    #[test]
    fn test_evaluate_prompt() {
        let prompt = compose_from(EVALUATE_GOAL, &evaluate_state()).unwrap();
        assert!(prompt.starts_with("You are Ada. Evaluate your progress on this short_term goal:"));
        assert!(prompt.contains("\"sword finished\""));
        assert!(prompt.contains("Progress so far: 0"));
    }
}
