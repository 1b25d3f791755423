//! Experience extraction - raw stimuli into validated experience records

use serde::Serialize;

use crate::cognition::render_experiences;
use crate::core::error::Result;
use crate::core::types::Timestamp;
use crate::entity::{Experience, ExperienceKind, Goal, Stimulus};
use crate::llm::decode::{decode_envelope, validate_batch, FieldRule, RecordSchema, TypedSchema};
use crate::llm::oracle::OracleGateway;
use crate::llm::template::compose_from;

/// Context for one extraction call
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractExperiencesState {
    pub name: String,
    #[serde(skip)]
    pub agent_id: String,
    pub role: String,
    #[serde(skip)]
    pub system_prompt: String,
    /// Already rendered as timestamped lines
    pub recent_experiences: String,
    pub timestamp: Timestamp,
    pub perception_summary: String,
    pub perception_context: Vec<String>,
    pub stimulus: Vec<Stimulus>,
    pub goals: Vec<Goal>,
}

impl ExtractExperiencesState {
    pub fn new(name: &str, role: &str, system_prompt: &str, history: &[Experience], timestamp: Timestamp) -> Self {
        Self {
            name: name.to_string(),
            agent_id: name.to_string(),
            role: role.to_string(),
            system_prompt: system_prompt.to_string(),
            recent_experiences: render_experiences(history),
            timestamp,
            perception_summary: String::new(),
            perception_context: Vec::new(),
            stimulus: Vec::new(),
            goals: Vec::new(),
        }
    }
}

/// Field rules every extracted experience must satisfy
pub fn experience_schema() -> TypedSchema<Experience> {
    RecordSchema::new()
        .required("type", FieldRule::one_of(&ExperienceKind::ALL))
        .required("content", FieldRule::NonEmptyText)
        .required("timestamp", FieldRule::PositiveNumber)
        .optional("category", FieldRule::Text)
        .typed()
}

/// New experiences for this tick, or an empty list on any failure
pub async fn extract_experiences(gateway: &OracleGateway, state: &ExtractExperiencesState) -> Vec<Experience> {
    match try_extract(gateway, state).await {
        Ok(experiences) => {
            tracing::debug!(agent = %state.agent_id, count = experiences.len(), "extracted experiences");
            experiences
        }
        Err(e) => {
            tracing::warn!(agent = %state.agent_id, error = %e, "experience extraction failed, keeping none");
            gateway.report(&state.agent_id, &e, "Error extracting experiences");
            Vec::new()
        }
    }
}

async fn try_extract(gateway: &OracleGateway, state: &ExtractExperiencesState) -> Result<Vec<Experience>> {
    let prompt = compose_from(EXTRACT_EXPERIENCES, state)?;
    let text = gateway.call(&prompt, &state.system_prompt, &state.agent_id).await?;
    let raw = decode_envelope(&text, "experiences")?;
    Ok(validate_batch(&raw, &experience_schema())?)
}

const EXTRACT_EXPERIENCES: &str = r#"You are {name}, {role}.

Your recent experiences:
{recentExperiences}

What you are perceiving right now:
{perceptionSummary}

Notable things around you:
{perceptionContext}

Raw stimuli:
{stimulus}

Your current goals:
{goals}

Turn what just happened into discrete experiences worth remembering. Each
experience has a type (speech, action, observation or thought), non-empty
content written from your point of view, and a timestamp. Use {timestamp} as
the timestamp unless a stimulus carries its own.

Respond with JSON only, in exactly this shape:
{"experiences": [{"type": "observation", "content": "...", "timestamp": 0, "category": "optional"}]}"#;
