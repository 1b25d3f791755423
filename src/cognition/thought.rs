//! Thought/action synthesis - the last stage of a cognitive cycle
//!
//! Builds the full agent context, asks the oracle for a thought, and checks
//! any requested action against the tool it names. Every failure degrades to
//! a thought-only response; nothing here returns an error.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cognition::render_experiences;
use crate::cognition::tools::{find_tool, tool_list, tool_schemas, ToolAction, ToolDescriptor};
use crate::entity::{ActionResult, Experience, Goal, Plan, Step, Stimulus};
use crate::llm::decode::{decode, from_value, ValidationError};
use crate::llm::oracle::OracleGateway;
use crate::llm::template::compose_from;

pub const BLANK_MIND: &str = "My mind is blank right now.";
pub const NOTHING_TO_THINK: &str = "I have nothing to think about at the moment.";

/// How the agent currently looks to others
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appearance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facial_expression: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social_cues: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ThoughtResponse {
    #[serde(default)]
    pub thought: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ToolAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appearance: Option<Appearance>,
}

impl ThoughtResponse {
    pub fn thought_only(thought: impl Into<String>) -> Self {
        Self {
            thought: thought.into(),
            ..Self::default()
        }
    }
}

/// The step an active plan is currently on
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStepRef {
    pub plan_id: String,
    pub goal_id: String,
    pub step: Step,
}

/// Everything the agent knows going into thought synthesis
#[derive(Debug, Clone, Default)]
pub struct AgentState {
    pub name: String,
    pub role: String,
    pub system_prompt: String,
    pub thought_history: Vec<String>,
    pub perception_narrative: String,
    pub perceptions: Vec<Stimulus>,
    pub last_action: Option<ActionResult>,
    /// Seconds since `last_action`
    pub time_since_last_action: Option<f64>,
    pub experiences: Vec<Experience>,
    pub available_tools: Vec<ToolDescriptor>,
    pub goals: Vec<Goal>,
    pub active_plans: Vec<Plan>,
}

impl AgentState {
    pub fn active_goals(&self) -> Vec<Goal> {
        self.goals.iter().filter(|g| g.is_active()).cloned().collect()
    }

    pub fn current_plan_steps(&self) -> Vec<PlanStepRef> {
        self.active_plans
            .iter()
            .filter(|p| p.is_active())
            .filter_map(|p| {
                p.current_step().map(|step| PlanStepRef {
                    plan_id: p.id.clone(),
                    goal_id: p.goal_id.clone(),
                    step: step.clone(),
                })
            })
            .collect()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Perceptions<'a> {
    narrative: &'a str,
    raw: &'a [Stimulus],
}

/// Prompt view of an [`AgentState`], built once per call
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ThoughtContext<'a> {
    name: &'a str,
    role: &'a str,
    thought_history: &'a [String],
    perceptions: Perceptions<'a>,
    last_action: Option<&'a ActionResult>,
    time_since_last_action: Option<f64>,
    experiences: String,
    tools: String,
    tool_schemas: Value,
    goals: &'a [Goal],
    active_goals: Vec<Goal>,
    active_plans: &'a [Plan],
    current_plan_steps: Vec<PlanStepRef>,
}

impl<'a> ThoughtContext<'a> {
    fn new(state: &'a AgentState) -> Self {
        Self {
            name: &state.name,
            role: &state.role,
            thought_history: &state.thought_history,
            perceptions: Perceptions {
                narrative: &state.perception_narrative,
                raw: &state.perceptions,
            },
            last_action: state.last_action.as_ref(),
            time_since_last_action: state.time_since_last_action,
            experiences: render_experiences(&state.experiences),
            tools: tool_list(&state.available_tools),
            tool_schemas: tool_schemas(&state.available_tools),
            goals: &state.goals,
            active_goals: state.active_goals(),
            active_plans: &state.active_plans,
            current_plan_steps: state.current_plan_steps(),
        }
    }
}

/// Synthesize this cycle's thought and optional action
pub async fn generate_thought(gateway: &OracleGateway, state: &AgentState) -> ThoughtResponse {
    let prompt = match compose_from(GENERATE_THOUGHT, &ThoughtContext::new(state)) {
        Ok(prompt) => prompt,
        Err(e) => {
            gateway.report(&state.name, &e, "Error composing thought prompt");
            return ThoughtResponse::thought_only(BLANK_MIND);
        }
    };

    let text = match gateway.call(&prompt, &state.system_prompt, &state.name).await {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(agent = %state.name, error = %e, "thought generation failed");
            gateway.report(&state.name, &e, "Error in thought generation");
            return ThoughtResponse::thought_only(BLANK_MIND);
        }
    };

    interpret(gateway, state, &text)
}

fn interpret(gateway: &OracleGateway, state: &AgentState, text: &str) -> ThoughtResponse {
    // Only a reply that is not JSON at all is kept as the thought itself.
    let raw = match decode::<Value>(text) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::debug!(agent = %state.name, error = %e, "thought reply is not JSON, keeping raw text");
            gateway.report(&state.name, &e, "Failed to parse thought response");
            return ThoughtResponse::thought_only(non_empty_thought(text.to_string()));
        }
    };

    let thought = non_empty_thought(raw.get("thought").and_then(Value::as_str).unwrap_or_default().to_string());

    let action = match raw.get("action") {
        None | Some(Value::Null) => None,
        Some(requested) => match check_action(state, requested) {
            Ok(action) => Some(action),
            Err(e) => {
                tracing::warn!(agent = %state.name, error = %e, "dropping invalid action");
                gateway.report(&state.name, &e, "Action validation failed");
                return ThoughtResponse::thought_only(thought);
            }
        },
    };

    let appearance = match raw.get("appearance") {
        None | Some(Value::Null) => None,
        Some(look) => match from_value::<Appearance>(look.clone()) {
            Ok(appearance) => Some(appearance),
            Err(e) => {
                tracing::warn!(agent = %state.name, error = %e, "dropping malformed appearance");
                gateway.report(&state.name, &e, "Appearance validation failed");
                None
            }
        },
    };

    ThoughtResponse {
        thought,
        action,
        appearance,
    }
}

/// Registered tools check their parameters; unregistered ones pass through as sent
fn check_action(state: &AgentState, requested: &Value) -> Result<ToolAction, ValidationError> {
    if !requested.is_object() {
        return Err(ValidationError::NotAnObject);
    }
    let tool = match requested.get("tool") {
        Some(Value::String(tool)) => tool.clone(),
        Some(_) => {
            return Err(ValidationError::InvalidField {
                field: "tool".into(),
                problem: "must be a string".into(),
            })
        }
        None => return Err(ValidationError::MissingField("tool".into())),
    };
    let parameters = requested.get("parameters").cloned().unwrap_or(Value::Null);

    match find_tool(&state.available_tools, &tool) {
        Some(descriptor) => {
            // A missing parameter object counts as empty.
            let checked = if parameters.is_null() {
                Value::Object(Map::new())
            } else {
                parameters.clone()
            };
            descriptor.schema.validate(&checked)?;
        }
        None => tracing::debug!(agent = %state.name, tool = %tool, "action names an unregistered tool"),
    }
    Ok(ToolAction { tool, parameters })
}

fn non_empty_thought(thought: String) -> String {
    if thought.is_empty() {
        NOTHING_TO_THINK.to_string()
    } else {
        thought
    }
}

const GENERATE_THOUGHT: &str = r#"You are {name}, {role}.

Your recent thoughts:
{thoughtHistory}

What you perceive:
{perceptions.narrative}

Raw perceptions:
{perceptions.raw}

The last thing you did ({timeSinceLastAction} seconds ago):
{lastAction}

Your experiences, oldest first:
{experiences}

Your active goals:
{activeGoals}

Plans you are following:
{activePlans}

The step you are on in each plan:
{currentPlanSteps}

Tools you can use:
{tools}

Parameters each tool expects:
{toolSchemas}

Think about your situation as {name} would, then decide whether to act. Only
use a tool from the list above, with the parameters it expects. Describe how
you look to others right now.

Respond with JSON only, in exactly this shape (action is optional):
{"thought": "...", "action": {"tool": "...", "parameters": {}}, "appearance": {"description": "...", "facialExpression": "...", "bodyLanguage": "...", "currentAction": "...", "socialCues": "..."}}"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cognition::testing::{failing_gateway, fixed_gateway};
    use crate::cognition::tools::default_tools;
    use crate::entity::ExperienceKind;
    use serde_json::json;

    fn state() -> AgentState {
        AgentState {
            name: "Ada".into(),
            role: "a blacksmith".into(),
            available_tools: default_tools(),
            ..AgentState::default()
        }
    }

    #[tokio::test]
    async fn test_thought_with_valid_action() {
        let (gateway, _) = fixed_gateway(
            r#"{"thought":"I should greet them","action":{"tool":"speak","parameters":{"message":"Hello!"}},"appearance":{"description":"a soot-stained smith","facialExpression":"smiling"}}"#,
        );
        let response = generate_thought(&gateway, &state()).await;
        assert_eq!(response.thought, "I should greet them");
        let action = response.action.unwrap();
        assert_eq!(action.tool, "speak");
        assert_eq!(action.parameters["message"], "Hello!");
        assert_eq!(response.appearance.unwrap().facial_expression.as_deref(), Some("smiling"));
    }

    #[tokio::test]
    async fn test_invalid_action_dropped_thought_kept() {
        let (gateway, audit) = fixed_gateway(r#"{"thought":"walk","action":{"tool":"move_to","parameters":{"x":"north"}}}"#);
        let response = generate_thought(&gateway, &state()).await;
        assert_eq!(response, ThoughtResponse::thought_only("walk"));
        assert_eq!(audit.errors().len(), 1);
    }

    #[tokio::test]
    async fn test_unregistered_tool_passes_unvalidated() {
        let (gateway, _) = fixed_gateway(r#"{"thought":"fly away","action":{"tool":"fly","parameters":{"height":"very"}}}"#);
        let response = generate_thought(&gateway, &state()).await;
        assert_eq!(
            response.action,
            Some(ToolAction {
                tool: "fly".into(),
                parameters: json!({"height": "very"}),
            })
        );
    }

    #[tokio::test]
    async fn test_unregistered_tool_keeps_odd_parameters() {
        let (gateway, _) = fixed_gateway(r#"{"thought":"I fly","action":{"tool":"fly","parameters":["up"]}}"#);
        let response = generate_thought(&gateway, &state()).await;
        assert_eq!(response.thought, "I fly");
        assert_eq!(
            response.action,
            Some(ToolAction {
                tool: "fly".into(),
                parameters: json!(["up"]),
            })
        );
    }

    #[tokio::test]
    async fn test_registered_tool_with_null_parameters_dropped() {
        let (gateway, audit) = fixed_gateway(
            r#"{"thought":"I speak","action":{"tool":"speak","parameters":null},"appearance":{"description":"mid-sentence"}}"#,
        );
        let response = generate_thought(&gateway, &state()).await;
        assert_eq!(response, ThoughtResponse::thought_only("I speak"));
        assert_eq!(audit.errors().len(), 1);
    }

    #[tokio::test]
    async fn test_action_without_tool_name_dropped() {
        let (gateway, _) = fixed_gateway(r#"{"thought":"hm","action":"wave"}"#);
        assert_eq!(generate_thought(&gateway, &state()).await, ThoughtResponse::thought_only("hm"));

        let (gateway, _) = fixed_gateway(r#"{"thought":"hm","action":{"tool":7}}"#);
        assert_eq!(generate_thought(&gateway, &state()).await, ThoughtResponse::thought_only("hm"));
    }

    #[tokio::test]
    async fn test_malformed_appearance_dropped_thought_kept() {
        let (gateway, audit) = fixed_gateway(
            r#"{"thought":"hello","action":{"tool":"speak","parameters":{"message":"hi"}},"appearance":"smiling"}"#,
        );
        let response = generate_thought(&gateway, &state()).await;
        assert_eq!(response.thought, "hello");
        assert_eq!(response.action.map(|a| a.tool).as_deref(), Some("speak"));
        assert!(response.appearance.is_none());
        assert_eq!(audit.errors().len(), 1);
    }

    #[tokio::test]
    async fn test_prose_reply_kept_as_thought() {
        let (gateway, _) = fixed_gateway("The fire needs more coal.");
        assert_eq!(
            generate_thought(&gateway, &state()).await,
            ThoughtResponse::thought_only("The fire needs more coal.")
        );
    }

    #[tokio::test]
    async fn test_empty_replies() {
        let (gateway, _) = fixed_gateway("");
        assert_eq!(generate_thought(&gateway, &state()).await.thought, NOTHING_TO_THINK);

        let (gateway, _) = fixed_gateway(r#"{"thought":""}"#);
        assert_eq!(generate_thought(&gateway, &state()).await.thought, NOTHING_TO_THINK);
    }

    #[tokio::test]
    async fn test_oracle_failure_blanks_mind() {
        let (gateway, _) = failing_gateway();
        assert_eq!(
            generate_thought(&gateway, &state()).await,
            ThoughtResponse::thought_only(BLANK_MIND)
        );
    }

    #[test]
    fn test_context_sorts_experiences() {
        let mut state = state();
        state.experiences = vec![
            Experience::new(ExperienceKind::Speech, "second", 2000.0),
            Experience::new(ExperienceKind::Observation, "first", 1000.0),
        ];
        let prompt = compose_from(GENERATE_THOUGHT, &ThoughtContext::new(&state)).unwrap();
        assert!(prompt.contains("[00:00:01] <OBSERVATION> first\n[00:00:02] <SPEECH> second"));
        assert!(prompt.contains("speak: Say something out loud"));
        assert!(prompt.contains("\"move_to\": {"));
    }
}
