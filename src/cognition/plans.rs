//! Plan manager - one step-sequenced plan per requested goal
//!
//! Unlike every other stage, a failed plan request is returned to the
//! caller as an error. No default plan is ever fabricated.

use serde::Serialize;

use crate::cognition::tools::ToolSummary;
use crate::core::error::Result;
use crate::core::types::now_millis;
use crate::entity::{Goal, Plan, PlanStatus};
use crate::llm::decode::{decode_envelope, from_value};
use crate::llm::oracle::OracleGateway;
use crate::llm::template::compose_from;

/// Context for planning one goal
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePlanState {
    pub name: String,
    #[serde(skip)]
    pub agent_id: String,
    pub role: String,
    #[serde(skip)]
    pub system_prompt: String,
    pub goal: Goal,
    pub current_plans: Vec<Plan>,
    pub recent_experiences: String,
    pub available_tools: Vec<ToolSummary>,
}

/// Ask the oracle for a plan pursuing `state.goal`
///
/// The returned plan is always `Active`, stamped with the current time and
/// bound to the requested goal.
pub async fn generate_plan(gateway: &OracleGateway, state: &GeneratePlanState) -> Result<Plan> {
    let plan = match try_generate(gateway, state).await {
        Ok(plan) => plan,
        Err(e) => {
            tracing::error!(agent = %state.agent_id, goal = %state.goal.id, error = %e, "plan generation failed");
            gateway.report(&state.agent_id, &e, "Error generating plan");
            return Err(e);
        }
    };
    tracing::debug!(
        agent = %state.agent_id,
        goal = %state.goal.id,
        plan = %plan.id,
        steps = plan.steps.len(),
        "generated plan"
    );
    Ok(plan)
}

async fn try_generate(gateway: &OracleGateway, state: &GeneratePlanState) -> Result<Plan> {
    let prompt = compose_from(GENERATE_PLAN, state)?;
    let text = gateway.call(&prompt, &state.system_prompt, &state.agent_id).await?;
    let mut raw = decode_envelope(&text, "plan")?;

    // The oracle may omit or misquote the goal id; the plan belongs to the goal asked about.
    if let Some(object) = raw.as_object_mut() {
        let quoted = object.get("goalId").and_then(|v| v.as_str());
        if quoted.is_some_and(|id| id != state.goal.id) {
            tracing::warn!(agent = %state.agent_id, quoted = ?quoted, goal = %state.goal.id, "plan named another goal");
        }
        object.insert("goalId".into(), state.goal.id.clone().into());
    }

    let mut plan: Plan = from_value(raw)?;
    let now = now_millis();
    plan.created_at = now;
    plan.updated_at = now;
    plan.status = PlanStatus::Active;
    Ok(plan)
}

const GENERATE_PLAN: &str = r#"You are {name}, {role}.

Make a plan for this goal:
{goal.description}
(goal id: {goal.id}, type: {goal.type}, priority: {goal.priority})

Success criteria:
{goal.success_criteria}

Plans you are already following:
{currentPlans}

Your recent experiences:
{recentExperiences}

Tools you can use:
{availableTools}

Break the goal into concrete steps, in the order you will carry them out.
Each step has a description, the tools it needs and the outcome you expect.

Respond with JSON only, in exactly this shape:
{"plan": {"goalId": "...", "steps": [{"description": "...", "status": "pending", "requiredTools": ["..."], "expectedOutcome": "..."}]}}"#;
