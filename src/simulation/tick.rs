//! Tick system - runs every agent's cognitive cycle
//!
//! A cycle for one agent runs these stages strictly in order:
//! perception -> experience extraction -> goal generation or evaluation ->
//! change detection -> planning -> thought synthesis.
//!
//! Agents run concurrently, each on an owned snapshot of its working memory.
//! Results are applied afterwards one agent at a time, so the world store is
//! only ever written from this task.

use std::sync::Arc;

use crate::cognition::tools::ToolAction;
use crate::cognition::{
    detect_significant_changes, evaluate_goal_progress, extract_experiences, generate_goals, generate_plan,
    generate_thought, process_stimulus, render_experiences, AgentState, DetectChangesState, EvaluateGoalState,
    ExtractExperiencesState, GenerateGoalsState, GeneratePlanState, ProcessStimulusState,
};
use crate::core::config::CognitionConfig;
use crate::core::types::{now_millis, Timestamp};
use crate::ecs::describe::describe_entity;
use crate::ecs::entity_map::EntityMap;
use crate::ecs::world::{World, DESCRIPTION, GOAL};
use crate::entity::{Experience, Goal, GoalStatus, Stimulus};
use crate::llm::oracle::OracleGateway;
use crate::simulation::mind::{active_goals, AgentMind, CycleOutcome};

/// Events generated during a tick, in the order they happened per agent
#[derive(Debug, Clone, PartialEq)]
pub enum TickEvent {
    Perceived {
        agent: String,
        narrative: String,
    },
    ExperiencesExtracted {
        agent: String,
        count: usize,
    },
    GoalsGenerated {
        agent: String,
        count: usize,
    },
    GoalCompleted {
        agent: String,
        goal: String,
    },
    GoalProgress {
        agent: String,
        goal: String,
        progress: f64,
    },
    /// Change detection retired the active goals in favour of new ones
    GoalsReplaced {
        agent: String,
        retired: usize,
        reasoning: Vec<String>,
    },
    PlanCreated {
        agent: String,
        goal: String,
        steps: usize,
    },
    /// The planner raised; the goal stays unplanned until the next tick
    PlanFailed {
        agent: String,
        goal: String,
        error: String,
    },
    Thought {
        agent: String,
        thought: String,
    },
    ActionRequested {
        agent: String,
        action: ToolAction,
    },
}

/// Run one agent's full cycle against a snapshot of its mind
///
/// `surroundings` are descriptions of the other entities the agent can
/// perceive. Never fails: every stage but planning has its own fallback, and
/// a planning failure only leaves that goal without a plan.
pub async fn run_cognitive_cycle(
    gateway: &OracleGateway,
    mind: &AgentMind,
    surroundings: &[String],
    config: &CognitionConfig,
) -> CycleOutcome {
    let now = now_millis();
    let agent = mind.name.clone();
    let mut events = Vec::new();
    let recent = mind.recent_experiences(config.recent_experience_window).to_vec();

    tracing::debug!(agent = %agent, stimuli = mind.pending_stimuli.len(), "cognitive cycle start");

    let perception = process_stimulus(
        gateway,
        &ProcessStimulusState {
            name: mind.name.clone(),
            role: mind.role.clone(),
            system_prompt: mind.system_prompt.clone(),
            current_timestamp: now,
            time_since_last_perception: mind.last_perception_at.map(|t| seconds_between(t, now)),
            recent_perceptions: mind.recent_perceptions.clone(),
            last_action: mind.last_action.clone(),
            stimulus: mind.pending_stimuli.clone(),
            current_goals: mind.active_goals(),
            active_plans: mind.active_plans(),
            recent_experiences: render_experiences(&recent),
        },
    )
    .await;
    events.push(TickEvent::Perceived {
        agent: agent.clone(),
        narrative: perception.clone(),
    });

    let mut extract = ExtractExperiencesState::new(&mind.name, &mind.role, &mind.system_prompt, &recent, now);
    extract.perception_summary = perception.clone();
    extract.perception_context = surroundings.to_vec();
    extract.stimulus = mind.pending_stimuli.clone();
    extract.goals = mind.active_goals();
    let experiences = extract_experiences(gateway, &extract).await;
    events.push(TickEvent::ExperiencesExtracted {
        agent: agent.clone(),
        count: experiences.len(),
    });

    // Later stages see this tick's experiences without a round trip through memory.
    let mut history = recent;
    history.extend(experiences.iter().cloned());
    history.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
    let start = history.len().saturating_sub(config.recent_experience_window);
    let history: Vec<Experience> = history.split_off(start);
    let history_text = render_experiences(&history);

    let mut goals = mind.goals.clone();
    let generated_now = if active_goals(&goals).is_empty() {
        let generated = generate_goals(gateway, &goals_state(mind, &goals, &history_text, &perception, surroundings)).await;
        let count = generated.len();
        goals.extend(generated);
        if count > 0 {
            events.push(TickEvent::GoalsGenerated {
                agent: agent.clone(),
                count,
            });
        }
        true
    } else {
        evaluate_goals(gateway, mind, &mut goals, &history_text, &perception, config, &mut events).await;
        false
    };

    if !generated_now
        && experiences.len() >= config.change_detection_min_experiences
        && !active_goals(&goals).is_empty()
    {
        let analysis = detect_significant_changes(
            gateway,
            &DetectChangesState {
                name: mind.name.clone(),
                agent_id: mind.name.clone(),
                role: mind.role.clone(),
                system_prompt: mind.system_prompt.clone(),
                current_goals: active_goals(&goals),
                recent_experiences: history_text.clone(),
                perception_summary: perception.clone(),
            },
        )
        .await;

        if analysis.calls_for_new_goals() {
            let replacement =
                generate_goals(gateway, &goals_state(mind, &goals, &history_text, &perception, surroundings)).await;
            if !replacement.is_empty() {
                let mut retired = 0;
                for goal in goals.iter_mut().filter(|g| g.is_active()) {
                    goal.status = GoalStatus::Suspended;
                    retired += 1;
                }
                goals.extend(replacement);
                events.push(TickEvent::GoalsReplaced {
                    agent: agent.clone(),
                    retired,
                    reasoning: analysis.reasoning,
                });
            }
        }
    }

    let mut new_plans = Vec::new();
    if config.plan_missing_goals {
        let tools: Vec<_> = mind.tools.iter().map(|t| t.summary()).collect();
        let mut unplanned: Vec<Goal> = active_goals(&goals)
            .into_iter()
            .filter(|g| !mind.has_active_plan(&g.id))
            .collect();
        unplanned.sort_by(|a, b| b.priority.total_cmp(&a.priority));

        for goal in unplanned {
            let mut current_plans = mind.active_plans();
            current_plans.extend(new_plans.iter().cloned());
            let state = GeneratePlanState {
                name: mind.name.clone(),
                agent_id: mind.name.clone(),
                role: mind.role.clone(),
                system_prompt: mind.system_prompt.clone(),
                goal: goal.clone(),
                current_plans,
                recent_experiences: history_text.clone(),
                available_tools: tools.clone(),
            };
            match generate_plan(gateway, &state).await {
                Ok(plan) => {
                    events.push(TickEvent::PlanCreated {
                        agent: agent.clone(),
                        goal: goal.description.clone(),
                        steps: plan.steps.len(),
                    });
                    new_plans.push(plan);
                }
                Err(e) => events.push(TickEvent::PlanFailed {
                    agent: agent.clone(),
                    goal: goal.description.clone(),
                    error: e.to_string(),
                }),
            }
        }
    }

    let mut active_plans = mind.active_plans();
    active_plans.extend(new_plans.iter().cloned());
    let state = AgentState {
        name: mind.name.clone(),
        role: mind.role.clone(),
        system_prompt: mind.system_prompt.clone(),
        thought_history: mind.thought_history.clone(),
        perception_narrative: perception.clone(),
        perceptions: mind.pending_stimuli.clone(),
        last_action: mind.last_action.clone(),
        time_since_last_action: mind.last_action.as_ref().map(|a| seconds_between(a.timestamp, now)),
        experiences: history,
        available_tools: mind.tools.clone(),
        goals: goals.clone(),
        active_plans,
    };
    let thought = generate_thought(gateway, &state).await;
    events.push(TickEvent::Thought {
        agent: agent.clone(),
        thought: thought.thought.clone(),
    });
    if let Some(action) = &thought.action {
        events.push(TickEvent::ActionRequested {
            agent: agent.clone(),
            action: action.clone(),
        });
    }

    tracing::debug!(agent = %agent, events = events.len(), "cognitive cycle done");

    CycleOutcome {
        timestamp: now,
        consumed_stimuli: mind.pending_stimuli.len(),
        perception,
        experiences,
        goals,
        new_plans,
        thought,
        events,
    }
}

/// Run every agent's cycle concurrently, then merge results and write back
/// into the world store
pub async fn run_world_tick(
    world: &mut World,
    names: &EntityMap,
    minds: &mut [AgentMind],
    gateway: Arc<OracleGateway>,
    config: &CognitionConfig,
) -> Vec<TickEvent> {
    let mut handles = Vec::with_capacity(minds.len());
    for mind in minds.iter() {
        let snapshot = mind.clone();
        let surroundings = surroundings_of(world, names, &mind.name);
        let gateway = Arc::clone(&gateway);
        let config = config.clone();
        handles.push(tokio::spawn(async move {
            run_cognitive_cycle(&gateway, &snapshot, &surroundings, &config).await
        }));
    }

    let mut events = Vec::new();
    for (mind, handle) in minds.iter_mut().zip(handles) {
        match handle.await {
            Ok(mut outcome) => {
                events.append(&mut outcome.events);
                mind.absorb(outcome, config);
                write_back(world, mind);
            }
            Err(e) => {
                tracing::error!(agent = %mind.name, error = %e, "cognitive cycle did not finish");
            }
        }
    }

    world.tick();
    tracing::info!(tick = world.current_tick, agents = minds.len(), events = events.len(), "tick complete");
    events
}

/// Deliver the same stimulus to every agent
pub fn broadcast(minds: &mut [AgentMind], stimulus: &Stimulus) {
    for mind in minds.iter_mut() {
        mind.perceive(stimulus.clone());
    }
}

/// Evaluate the highest-priority active goals and apply the verdicts
async fn evaluate_goals(
    gateway: &OracleGateway,
    mind: &AgentMind,
    goals: &mut [Goal],
    history_text: &str,
    perception: &str,
    config: &CognitionConfig,
    events: &mut Vec<TickEvent>,
) {
    let mut order: Vec<usize> = (0..goals.len()).filter(|&i| goals[i].is_active()).collect();
    order.sort_by(|&a, &b| goals[b].priority.total_cmp(&goals[a].priority));
    order.truncate(config.max_goal_evaluations);

    for i in order {
        let mut state = EvaluateGoalState::for_goal(&mind.name, &mind.system_prompt, &goals[i]);
        state.recent_experiences = history_text.to_string();
        state.perception_summary = perception.to_string();
        let evaluation = evaluate_goal_progress(gateway, &state).await;

        let goal = &mut goals[i];
        if evaluation.complete {
            goal.status = GoalStatus::Completed;
            goal.set_progress(1.0);
            events.push(TickEvent::GoalCompleted {
                agent: mind.name.clone(),
                goal: goal.description.clone(),
            });
        } else {
            goal.set_progress(evaluation.progress);
            events.push(TickEvent::GoalProgress {
                agent: mind.name.clone(),
                goal: goal.description.clone(),
                progress: goal.progress,
            });
        }
    }
}

fn goals_state(
    mind: &AgentMind,
    goals: &[Goal],
    history_text: &str,
    perception: &str,
    surroundings: &[String],
) -> GenerateGoalsState {
    GenerateGoalsState {
        name: mind.name.clone(),
        agent_id: mind.name.clone(),
        role: mind.role.clone(),
        system_prompt: mind.system_prompt.clone(),
        current_goals: active_goals(goals),
        recent_experiences: history_text.to_string(),
        perception_summary: perception.to_string(),
        perception_context: surroundings.to_vec(),
    }
}

/// Descriptions of every named entity except the agent itself
fn surroundings_of(world: &World, names: &EntityMap, agent: &str) -> Vec<String> {
    names
        .names()
        .iter()
        .filter(|name| name.as_str() != agent)
        .map(|name| describe_entity(world, names, name))
        .collect()
}

/// Goal and Description components mirror the agent's mind
fn write_back(world: &mut World, mind: &AgentMind) {
    let Some(entity) = mind.entity.filter(|e| world.is_alive(*e)) else {
        return;
    };
    if let Some(goal) = mind.top_goal() {
        if let Err(e) = world.set_text(entity, GOAL, goal.description.clone()) {
            tracing::warn!(agent = %mind.name, error = %e, "could not write goal back");
        }
    }
    if let Some(description) = mind.appearance.as_ref().and_then(|a| a.description.clone()) {
        if let Err(e) = world.set_text(entity, DESCRIPTION, description) {
            tracing::warn!(agent = %mind.name, error = %e, "could not write appearance back");
        }
    }
}

fn seconds_between(from: Timestamp, to: Timestamp) -> f64 {
    ((to - from) / 1000.0).max(0.0)
}
