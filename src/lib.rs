//! World Sim - oracle-driven agent cognition over an entity/component world

pub mod cognition;
pub mod core;
pub mod ecs;
pub mod entity;
pub mod llm;
pub mod simulation;
