//! World store: entities, columnar components, names and scenario loading

pub mod describe;
pub mod entity_map;
pub mod loader;
pub mod world;

pub use describe::{describe_entity, entity_names, world_state};
pub use entity_map::EntityMap;
pub use loader::Scenario;
pub use world::{ComponentDef, FieldKind, FieldValue, World};
