//! Integration tests for the cognitive stages and the multi-agent tick,
//! driven by scripted oracles

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use world_sim::cognition::{
    default_tools, detect_significant_changes, evaluate_goal_progress, extract_experiences, generate_goals,
    generate_plan, generate_thought, process_stimulus, AgentState, DetectChangesState, EvaluateGoalState,
    ExtractExperiencesState, GenerateGoalsState, GeneratePlanState, GoalEvaluation, ProcessStimulusState,
    Recommendation,
};
use world_sim::core::config::CognitionConfig;
use world_sim::core::error::{Result, SimError};
use world_sim::ecs::loader::Scenario;
use world_sim::ecs::world::{DESCRIPTION, GOAL};
use world_sim::entity::{Experience, ExperienceKind, Goal, GoalStatus, GoalType, Stimulus};
use world_sim::llm::audit::MemoryAuditSink;
use world_sim::llm::oracle::{Oracle, OracleGateway};
use world_sim::simulation::tick::{broadcast, run_cognitive_cycle, run_world_tick, TickEvent};

/// Answers "A1B2C3" to anything asking "What sequence", "ack" otherwise
struct SequenceStub;

#[async_trait]
impl Oracle for SequenceStub {
    async fn generate(&self, prompt: &str, _system_prompt: &str) -> Result<String> {
        if prompt.contains("What sequence") {
            Ok("A1B2C3".into())
        } else {
            Ok("ack".into())
        }
    }
}

/// Picks a reply by the first needle found in the prompt
struct Scripted {
    replies: Vec<(&'static str, String)>,
    prompts: Mutex<Vec<String>>,
}

impl Scripted {
    fn new(replies: Vec<(&'static str, String)>) -> Self {
        Self {
            replies,
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn calls_containing(&self, needle: &str) -> usize {
        self.prompts.lock().unwrap().iter().filter(|p| p.contains(needle)).count()
    }
}

#[async_trait]
impl Oracle for Scripted {
    async fn generate(&self, prompt: &str, _system_prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .iter()
            .find(|(needle, _)| prompt.contains(needle))
            .map(|(_, reply)| reply.clone())
            .ok_or_else(|| SimError::LlmError("no scripted reply".into()))
    }
}

struct Unreachable;

#[async_trait]
impl Oracle for Unreachable {
    async fn generate(&self, _prompt: &str, _system_prompt: &str) -> Result<String> {
        Err(SimError::LlmError("connection refused".into()))
    }
}

const PERCEIVE: &str = "Describe, in the first person";
const EXTRACT: &str = "Turn what just happened into discrete experiences";
const GENERATE_GOALS: &str = "Decide which goals you should pursue now";
const EVALUATE: &str = "Evaluate your progress";
const DETECT: &str = "Has anything happened that makes your current goals";
const PLAN: &str = "Make a plan for this goal";
const THINK: &str = "Think about your situation";

fn happy_script(recommendation: &str) -> Vec<(&'static str, String)> {
    vec![
        (PERCEIVE, "A merchant is calling out prices.".to_string()),
        (
            EXTRACT,
            json!({"experiences": [{"type": "speech", "content": "Someone asked about silk", "timestamp": 1}]})
                .to_string(),
        ),
        (
            GENERATE_GOALS,
            json!({"goals": [{"description": "Sell the silk", "type": "short_term", "priority": 5}]}).to_string(),
        ),
        (
            EVALUATE,
            json!({"evaluation": {
                "complete": false, "progress": 0.5,
                "criteria_met": [], "criteria_partial": ["blade shaped"], "criteria_blocked": [],
                "recent_advancements": [], "blockers": [], "next_steps": ["fit the hilt"]
            }})
            .to_string(),
        ),
        (
            DETECT,
            json!({"analysis": {
                "significant_change": true, "changes": ["a buyer arrived"],
                "recommendation": recommendation, "reasoning": ["new opportunity"]
            }})
            .to_string(),
        ),
        (
            PLAN,
            json!({"plan": {"steps": [
                {"description": "Find a buyer", "expectedOutcome": "a buyer"},
                {"description": "Haggle", "requiredTools": ["speak"]}
            ]}})
            .to_string(),
        ),
        (
            THINK,
            json!({
                "thought": "Time to make a sale.",
                "action": {"tool": "speak", "parameters": {"message": "Fine silk for sale!"}},
                "appearance": {"description": "A merchant waving a bolt of silk"}
            })
            .to_string(),
        ),
    ]
}

fn gateway(oracle: Arc<dyn Oracle>) -> (OracleGateway, Arc<MemoryAuditSink>) {
    let audit = Arc::new(MemoryAuditSink::new());
    (OracleGateway::new(oracle).with_audit(audit.clone()), audit)
}

const SCENARIO: &str = r#"
[[entities]]
name = "Well"
position = { x = 0, y = 0 }

[[agents]]
name = "Ada"
role = "the village blacksmith"

[[agents.goals]]
description = "Finish the sword"
type = "short_term"
priority = 2

[[agents]]
name = "Bo"
role = "a travelling merchant"
"#;

fn perception_state(text: &str) -> ProcessStimulusState {
    ProcessStimulusState {
        name: "Ada".into(),
        role: "the village blacksmith".into(),
        system_prompt: String::new(),
        current_timestamp: 1000.0,
        time_since_last_perception: Some(3.0),
        recent_perceptions: Vec::new(),
        last_action: None,
        stimulus: vec![Stimulus::speech(text, 1000.0)],
        current_goals: Vec::new(),
        active_plans: Vec::new(),
        recent_experiences: String::new(),
    }
}

#[tokio::test]
async fn test_stub_answers_surface_unchanged() {
    let (gateway, _) = gateway(Arc::new(SequenceStub));
    assert_eq!(
        process_stimulus(&gateway, &perception_state("What sequence did you see?")).await,
        "A1B2C3"
    );
    assert_eq!(process_stimulus(&gateway, &perception_state("Good morning")).await, "ack");
}

#[tokio::test]
async fn test_stub_drives_whole_cycle_without_failing() {
    let (gateway, _) = gateway(Arc::new(SequenceStub));
    let mut scenario = Scenario::parse_toml(SCENARIO).unwrap();
    broadcast(&mut scenario.agents, &Stimulus::speech("What sequence was on the wall?", 1000.0));

    let config = CognitionConfig::default();
    let outcome = run_cognitive_cycle(&gateway, &scenario.agents[0], &[], &config).await;

    assert_eq!(outcome.perception, "A1B2C3");
    assert!(outcome.experiences.is_empty());
    // The sequence shows up in the raw perceptions, so the thought is the bare reply
    assert_eq!(outcome.thought.thought, "A1B2C3");
    assert!(outcome.thought.action.is_none());
    // Evaluation fell back to "no progress"; the plan request raised and was recorded
    assert_eq!(outcome.goals[0].progress, 0.0);
    assert!(outcome.new_plans.is_empty());
    assert!(outcome
        .events
        .iter()
        .any(|e| matches!(e, TickEvent::PlanFailed { goal, .. } if goal == "Finish the sword")));
}

#[tokio::test]
async fn test_experience_batch_is_all_or_nothing() {
    let state = ExtractExperiencesState::new("Ada", "smith", "", &[], 1000.0);

    let (gw, _) = gateway(Arc::new(Scripted::new(vec![(
        EXTRACT,
        r#"{"experiences":[{"type":"speech","content":"hi","timestamp":1}]}"#.to_string(),
    )])));
    assert_eq!(
        extract_experiences(&gw, &state).await,
        vec![Experience::new(ExperienceKind::Speech, "hi", 1.0)]
    );

    let (gw, _) = gateway(Arc::new(Scripted::new(vec![(
        EXTRACT,
        r#"{"experiences":[{"type":"speech","content":"hi","timestamp":1},{"type":"speech","content":"yo","timestamp":0}]}"#
            .to_string(),
    )])));
    assert!(extract_experiences(&gw, &state).await.is_empty());
}

#[tokio::test]
async fn test_failure_policies_per_stage() {
    let (gw, audit) = gateway(Arc::new(Unreachable));
    let goal = Goal::new("Finish the sword", GoalType::ShortTerm, 2.0);

    let evaluation = evaluate_goal_progress(&gw, &EvaluateGoalState::for_goal("Ada", "", &goal)).await;
    assert_eq!(
        serde_json::to_value(&evaluation).unwrap(),
        json!({
            "complete": false, "progress": 0.0,
            "criteria_met": [], "criteria_partial": [], "criteria_blocked": [],
            "recent_advancements": [], "blockers": [], "next_steps": []
        })
    );
    assert_eq!(evaluation, GoalEvaluation::default());

    let goals_state = GenerateGoalsState {
        name: "Ada".into(),
        agent_id: "Ada".into(),
        role: "smith".into(),
        system_prompt: String::new(),
        current_goals: vec![goal.clone()],
        recent_experiences: String::new(),
        perception_summary: String::new(),
        perception_context: Vec::new(),
    };
    assert!(generate_goals(&gw, &goals_state).await.is_empty());

    let analysis = detect_significant_changes(
        &gw,
        &DetectChangesState {
            name: "Ada".into(),
            agent_id: "Ada".into(),
            role: "smith".into(),
            system_prompt: String::new(),
            current_goals: vec![goal.clone()],
            recent_experiences: String::new(),
            perception_summary: String::new(),
        },
    )
    .await;
    assert!(!analysis.significant_change);
    assert!(analysis.changes.is_empty());
    assert_eq!(analysis.recommendation, Recommendation::MaintainGoals);
    assert!(!analysis.reasoning.is_empty());

    let plan_state = GeneratePlanState {
        name: "Ada".into(),
        agent_id: "Ada".into(),
        role: "smith".into(),
        system_prompt: String::new(),
        goal,
        current_plans: Vec::new(),
        recent_experiences: String::new(),
        available_tools: Vec::new(),
    };
    assert!(generate_plan(&gw, &plan_state).await.is_err());

    let thought = generate_thought(
        &gw,
        &AgentState {
            name: "Ada".into(),
            ..AgentState::default()
        },
    )
    .await;
    assert_eq!(thought.thought, "My mind is blank right now.");

    assert!(audit.errors().iter().all(|r| r.caller_id() == "Ada"));
}

#[tokio::test]
async fn test_plan_decode_failure_raises() {
    let (gw, _) = gateway(Arc::new(SequenceStub));
    let state = GeneratePlanState {
        name: "Ada".into(),
        agent_id: "Ada".into(),
        role: "smith".into(),
        system_prompt: String::new(),
        goal: Goal::new("Finish the sword", GoalType::ShortTerm, 2.0),
        current_plans: Vec::new(),
        recent_experiences: String::new(),
        available_tools: Vec::new(),
    };
    assert!(matches!(generate_plan(&gw, &state).await, Err(SimError::Decode(_))));
}

#[tokio::test]
async fn test_unregistered_tool_action_passes_through() {
    let reply = r#"{"thought":"I will teleport","action":{"tool":"teleport","parameters":{"to":42}}}"#;
    let (gw, _) = gateway(Arc::new(Scripted::new(vec![(THINK, reply.to_string())])));
    let state = AgentState {
        name: "Ada".into(),
        available_tools: default_tools(),
        ..AgentState::default()
    };
    let response = generate_thought(&gw, &state).await;
    let action = response.action.unwrap();
    assert_eq!(action.tool, "teleport");
    assert_eq!(action.parameters["to"], 42);
}

#[tokio::test]
async fn test_world_tick_end_to_end() {
    let oracle = Arc::new(Scripted::new(happy_script("maintain_goals")));
    let audit = Arc::new(MemoryAuditSink::new());
    let gateway = Arc::new(OracleGateway::new(oracle.clone()).with_audit(audit.clone()));
    let config = CognitionConfig::default();

    let mut scenario = Scenario::parse_toml(SCENARIO).unwrap();
    broadcast(&mut scenario.agents, &Stimulus::speech("Who wants silk?", 1000.0).from_source("Bo"));

    let events = run_world_tick(
        &mut scenario.world,
        &scenario.names,
        &mut scenario.agents,
        gateway,
        &config,
    )
    .await;
    assert_eq!(scenario.world.current_tick, 1);
    assert!(audit.errors().is_empty());

    // Ada had a goal: evaluated, not regenerated, then planned
    let ada = &scenario.agents[0];
    assert_eq!(ada.goals.len(), 1);
    assert_eq!(ada.goals[0].progress, 0.5);
    assert!(ada.has_active_plan(&ada.goals[0].id));
    assert!(ada.pending_stimuli.is_empty());

    // Bo had none: goals generated, change detection skipped
    let bo = &scenario.agents[1];
    assert_eq!(bo.goals[0].description, "Sell the silk");
    assert_eq!(bo.plans.len(), 1);
    assert_eq!(bo.plans[0].goal_id, bo.goals[0].id);
    assert_eq!(oracle.calls_containing(DETECT), 1);
    assert_eq!(oracle.calls_containing(GENERATE_GOALS), 1);

    for mind in &scenario.agents {
        assert_eq!(mind.thought_history, vec!["Time to make a sale.".to_string()]);
        assert_eq!(mind.requested_action.as_ref().unwrap().tool, "speak");
        assert!(mind.experiences.iter().any(|e| e.content == "Someone asked about silk"));
        assert!(mind.experiences.iter().all(Experience::is_valid));

        let entity = mind.entity.unwrap();
        assert_eq!(
            scenario.world.text(entity, DESCRIPTION),
            Some("A merchant waving a bolt of silk")
        );
        assert_eq!(scenario.world.text(entity, GOAL), Some(mind.top_goal().unwrap().description.as_str()));
    }

    let thoughts = events.iter().filter(|e| matches!(e, TickEvent::Thought { .. })).count();
    assert_eq!(thoughts, 2);
}

#[tokio::test]
async fn test_significant_change_replaces_goals() {
    let oracle = Arc::new(Scripted::new(happy_script("generate_new_goals")));
    let (gw, _) = gateway(oracle.clone());
    let config = CognitionConfig::default();

    let mut scenario = Scenario::parse_toml(SCENARIO).unwrap();
    broadcast(&mut scenario.agents, &Stimulus::speech("A buyer is here", 1000.0));
    let outcome = run_cognitive_cycle(&gw, &scenario.agents[0], &[], &config).await;

    assert_eq!(outcome.goals.len(), 2);
    assert_eq!(outcome.goals[0].status, GoalStatus::Suspended);
    assert_eq!(outcome.goals[1].description, "Sell the silk");
    assert!(outcome.goals[1].is_active());
    assert_eq!(outcome.new_plans.len(), 1);
    assert_eq!(outcome.new_plans[0].goal_id, outcome.goals[1].id);
    assert!(outcome
        .events
        .iter()
        .any(|e| matches!(e, TickEvent::GoalsReplaced { retired: 1, .. })));
}
