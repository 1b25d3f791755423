//! Agent working memory
//!
//! An `AgentMind` holds everything an agent carries between ticks that does
//! not live in the world store. A cognitive cycle runs on a snapshot of it
//! and hands back a [`CycleOutcome`], which is merged here afterwards.

use crate::cognition::{Appearance, ThoughtResponse, ToolAction, ToolDescriptor};
use crate::core::config::CognitionConfig;
use crate::core::types::{EntityId, Timestamp};
use crate::entity::{ActionResult, Experience, ExperienceKind, Goal, GoalStatus, Plan, PlanStatus, Stimulus};
use crate::simulation::tick::TickEvent;

#[derive(Debug, Clone)]
pub struct AgentMind {
    pub name: String,
    pub role: String,
    pub system_prompt: String,
    /// World entity this agent writes back to, if it has one
    pub entity: Option<EntityId>,
    /// Kept sorted by timestamp, oldest first
    pub experiences: Vec<Experience>,
    pub goals: Vec<Goal>,
    pub plans: Vec<Plan>,
    pub thought_history: Vec<String>,
    pub recent_perceptions: Vec<String>,
    pub last_perception_at: Option<Timestamp>,
    /// Stimuli delivered since the last cycle
    pub pending_stimuli: Vec<Stimulus>,
    pub last_action: Option<ActionResult>,
    /// Action requested by the last cycle, waiting for the runtime
    pub requested_action: Option<ToolAction>,
    pub appearance: Option<Appearance>,
    pub tools: Vec<ToolDescriptor>,
}

/// What one cognitive cycle produced
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub timestamp: Timestamp,
    /// How many pending stimuli the cycle saw
    pub consumed_stimuli: usize,
    pub perception: String,
    pub experiences: Vec<Experience>,
    /// The agent's full goal list after evaluation and regeneration
    pub goals: Vec<Goal>,
    pub new_plans: Vec<Plan>,
    pub thought: ThoughtResponse,
    pub events: Vec<TickEvent>,
}

impl AgentMind {
    pub fn new(name: impl Into<String>, role: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            system_prompt: system_prompt.into(),
            entity: None,
            experiences: Vec::new(),
            goals: Vec::new(),
            plans: Vec::new(),
            thought_history: Vec::new(),
            recent_perceptions: Vec::new(),
            last_perception_at: None,
            pending_stimuli: Vec::new(),
            last_action: None,
            requested_action: None,
            appearance: None,
            tools: crate::cognition::default_tools(),
        }
    }

    pub fn with_entity(mut self, entity: EntityId) -> Self {
        self.entity = Some(entity);
        self
    }

    pub fn perceive(&mut self, stimulus: Stimulus) {
        self.pending_stimuli.push(stimulus);
    }

    /// The `window` most recent experiences, oldest first
    pub fn recent_experiences(&self, window: usize) -> &[Experience] {
        let start = self.experiences.len().saturating_sub(window);
        &self.experiences[start..]
    }

    pub fn active_goals(&self) -> Vec<Goal> {
        active_goals(&self.goals)
    }

    pub fn active_plans(&self) -> Vec<Plan> {
        self.plans.iter().filter(|p| p.is_active()).cloned().collect()
    }

    /// Highest-priority active goal
    pub fn top_goal(&self) -> Option<&Goal> {
        self.goals
            .iter()
            .filter(|g| g.is_active())
            .max_by(|a, b| a.priority.total_cmp(&b.priority))
    }

    pub fn has_active_plan(&self, goal_id: &str) -> bool {
        self.plans.iter().any(|p| p.is_active() && p.goal_id == goal_id)
    }

    /// Runtime reports back on the action it executed
    pub fn record_action_result(&mut self, result: ActionResult) {
        self.requested_action = None;
        self.last_action = Some(result);
    }

    /// Merge a cycle's results into working memory
    pub fn absorb(&mut self, outcome: CycleOutcome, config: &CognitionConfig) {
        let consumed = outcome.consumed_stimuli.min(self.pending_stimuli.len());
        self.pending_stimuli.drain(..consumed);

        self.experiences
            .extend(outcome.experiences.into_iter().filter(Experience::is_valid));
        let thought = Experience::new(ExperienceKind::Thought, outcome.thought.thought.clone(), outcome.timestamp);
        if thought.is_valid() {
            self.experiences.push(thought);
        }
        self.experiences.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        truncate_front(&mut self.experiences, config.max_experiences);

        self.goals = outcome.goals;
        self.plans.extend(outcome.new_plans);
        self.settle_plans(outcome.timestamp);

        push_capped(&mut self.recent_perceptions, outcome.perception, config.max_thought_history);
        self.last_perception_at = Some(outcome.timestamp);

        push_capped(&mut self.thought_history, outcome.thought.thought, config.max_thought_history);
        if outcome.thought.action.is_some() {
            self.requested_action = outcome.thought.action;
        }
        if outcome.thought.appearance.is_some() {
            self.appearance = outcome.thought.appearance;
        }
    }

    /// Plans follow their goal out of `Active`
    fn settle_plans(&mut self, now: Timestamp) {
        for plan in self.plans.iter_mut().filter(|p| p.is_active()) {
            let status = self.goals.iter().find(|g| g.id == plan.goal_id).map(|g| g.status);
            let settled = match status {
                Some(GoalStatus::Active) => continue,
                Some(GoalStatus::Completed) => PlanStatus::Completed,
                Some(GoalStatus::Failed) => PlanStatus::Failed,
                Some(GoalStatus::Suspended) | None => PlanStatus::Suspended,
            };
            plan.status = settled;
            plan.updated_at = now;
        }
    }
}

pub(crate) fn active_goals(goals: &[Goal]) -> Vec<Goal> {
    goals.iter().filter(|g| g.is_active()).cloned().collect()
}

fn push_capped(items: &mut Vec<String>, item: String, cap: usize) {
    items.push(item);
    truncate_front(items, cap);
}

fn truncate_front<T>(items: &mut Vec<T>, cap: usize) {
    if items.len() > cap {
        items.drain(..items.len() - cap);
    }
}
