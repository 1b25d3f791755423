//! Perception - raw stimuli into a first-person narrative

use serde::Serialize;

use crate::core::types::Timestamp;
use crate::entity::{ActionResult, Goal, Plan, Stimulus};
use crate::llm::oracle::OracleGateway;
use crate::llm::template::compose_from;

pub const NOTHING_PERCEIVED: &str = "I perceive nothing of note.";
pub const PERCEPTION_TROUBLE: &str = "I am having trouble processing my surroundings.";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessStimulusState {
    pub name: String,
    pub role: String,
    #[serde(skip)]
    pub system_prompt: String,
    pub current_timestamp: Timestamp,
    /// Seconds since the previous perception, if any
    pub time_since_last_perception: Option<f64>,
    pub recent_perceptions: Vec<String>,
    pub last_action: Option<ActionResult>,
    pub stimulus: Vec<Stimulus>,
    pub current_goals: Vec<Goal>,
    pub active_plans: Vec<Plan>,
    pub recent_experiences: String,
}

/// Narrative description of what the agent perceives; never fails
pub async fn process_stimulus(gateway: &OracleGateway, state: &ProcessStimulusState) -> String {
    let prompt = match compose_from(PROCESS_STIMULUS, state) {
        Ok(prompt) => prompt,
        Err(e) => {
            gateway.report(&state.name, &e, "Error composing perception prompt");
            return PERCEPTION_TROUBLE.to_string();
        }
    };

    match gateway.call(&prompt, &state.system_prompt, &state.name).await {
        Ok(text) if text.is_empty() => NOTHING_PERCEIVED.to_string(),
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(agent = %state.name, error = %e, "perception failed");
            gateway.report(&state.name, &e, "Error processing stimulus");
            PERCEPTION_TROUBLE.to_string()
        }
    }
}

const PROCESS_STIMULUS: &str = r#"You are {name}, {role}.

It has been {timeSinceLastPerception} seconds since you last took stock of
your surroundings. What you noticed recently:
{recentPerceptions}

The last thing you did:
{lastAction}

Your goals:
{currentGoals}

Plans you are following:
{activePlans}

Your recent experiences:
{recentExperiences}

Right now you perceive:
{stimulus}

Describe, in the first person and in a few sentences, what you are
perceiving and what stands out to you. Reply with plain prose, not JSON."#;
