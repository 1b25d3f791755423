//! Human-readable renderings of world state
//!
//! Only components an entity actually holds are printed.

use std::fmt::Write;

use crate::core::types::EntityId;
use crate::ecs::entity_map::EntityMap;
use crate::ecs::world::{World, INVENTORY, POSITION, VALUE_FIELD};

/// Summary of every live entity and its components
pub fn world_state(world: &World) -> String {
    let mut s = String::from("World State:\n");
    for entity in world.entities() {
        let _ = writeln!(s, "\nEntity {}:", entity);
        s.push_str(&component_lines(world, entity));
    }
    s
}

/// Description of one named entity
pub fn describe_entity(world: &World, map: &EntityMap, name: &str) -> String {
    let Some(entity) = map.resolve(name) else {
        return format!("Entity '{}' not found", name);
    };
    let mut s = format!("Entity {} (ID: {})\n", name, entity);
    s.push_str(&component_lines(world, entity));
    s
}

/// Every bound name, sorted
pub fn entity_names(map: &EntityMap) -> Vec<String> {
    map.names()
}

fn component_lines(world: &World, entity: EntityId) -> String {
    let mut s = String::new();
    for component in world.component_names() {
        if !world.has_component(entity, component) {
            continue;
        }
        match component {
            POSITION => {
                if let Some((x, y)) = world.position(entity) {
                    let _ = writeln!(s, "  Position: ({}, {})", x, y);
                }
            }
            INVENTORY => {
                if let Some(items) = world.inventory(entity) {
                    let _ = writeln!(s, "  Inventory: [{}]", items.join(", "));
                }
            }
            other => {
                if let Some(value) = world.get(entity, other, VALUE_FIELD).and_then(|v| v.as_text()) {
                    let _ = writeln!(s, "  {}: {}", other, value);
                }
            }
        }
    }
    s
}
