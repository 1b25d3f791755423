pub mod actions;
pub mod experience;
pub mod goals;
pub mod plans;
pub mod stimulus;

pub use actions::ActionResult;
pub use experience::{Experience, ExperienceKind};
pub use goals::{Goal, GoalStatus, GoalType};
pub use plans::{Plan, PlanStatus, Step, StepStatus};
pub use stimulus::{Stimulus, StimulusKind};
