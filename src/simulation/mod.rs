//! Simulation runtime: agent working memory and the cognitive tick

pub mod mind;
pub mod tick;

pub use mind::{AgentMind, CycleOutcome};
pub use tick::{broadcast, run_cognitive_cycle, run_world_tick, TickEvent};
