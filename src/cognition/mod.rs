//! Cognitive stages
//!
//! Each stage composes a prompt from a typed context, calls the oracle
//! gateway and decodes the reply. All stages except planning swallow
//! failures and return a safe default so a tick can always advance.

pub mod changes;
pub mod experiences;
pub mod goals;
pub mod perception;
pub mod plans;
pub mod thought;
pub mod tools;

pub use changes::{detect_significant_changes, ChangeAnalysis, DetectChangesState, Recommendation};
pub use experiences::{extract_experiences, ExtractExperiencesState};
pub use goals::{evaluate_goal_progress, generate_goals, EvaluateGoalState, GenerateGoalsState, GoalEvaluation};
pub use perception::{process_stimulus, ProcessStimulusState};
pub use plans::{generate_plan, GeneratePlanState};
pub use thought::{generate_thought, AgentState, Appearance, ThoughtResponse};
pub use tools::{default_tools, ToolAction, ToolDescriptor};

use crate::entity::Experience;

/// Experiences oldest first, one `[HH:MM:SS] <TYPE> content` line each
pub fn render_experiences(experiences: &[Experience]) -> String {
    let mut sorted: Vec<&Experience> = experiences.iter().collect();
    sorted.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
    sorted.iter().map(|e| e.render()).collect::<Vec<_>>().join("\n")
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::ExperienceKind;

    #[test]
    fn test_render_experiences_sorted() {
        let history = vec![
            Experience::new(ExperienceKind::Thought, "later", 62_000.0),
            Experience::new(ExperienceKind::Action, "earlier", 61_000.0),
        ];
        assert_eq!(
            render_experiences(&history),
            "[00:01:01] <ACTION> earlier\n[00:01:02] <THOUGHT> later"
        );
        assert_eq!(render_experiences(&[]), "");
    }
}
