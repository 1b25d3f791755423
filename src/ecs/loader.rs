//! Scenario files - initial world contents and agent roster in TOML
//!
//! ```toml
//! [[components]]
//! name = "Mood"
//! fields = { value = "text" }
//!
//! [[entities]]
//! name = "Forge"
//! description = "A roaring forge"
//! position = { x = 2.0, y = 3.0 }
//! components = { Mood = { value = "hot" } }
//!
//! [[agents]]
//! name = "Ada"
//! role = "the village blacksmith"
//! inventory = ["hammer"]
//!
//! [[agents.goals]]
//! description = "Finish the mayor's sword"
//! type = "short_term"
//! priority = 2
//! ```
//!
//! Every entity and agent gets a Name component and a binding in the
//! [`EntityMap`]. Agents are ordinary entities plus an [`AgentMind`].

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::core::error::Result;
use crate::core::types::EntityId;
use crate::ecs::entity_map::EntityMap;
use crate::ecs::world::{ComponentDef, FieldKind, FieldValue, World, DESCRIPTION, GOAL, INVENTORY, NAME, POSITION};
use crate::entity::Goal;
use crate::simulation::mind::AgentMind;

/// A populated world ready to run
#[derive(Debug)]
pub struct Scenario {
    pub world: World,
    pub names: EntityMap,
    pub agents: Vec<AgentMind>,
}

impl Scenario {
    /// Load a scenario from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    /// Parse a scenario from TOML text
    pub fn parse_toml(content: &str) -> Result<Self> {
        let data: TomlScenario = toml::from_str(content)?;

        let mut defs = ComponentDef::standard();
        for component in &data.components {
            let fields: Vec<(&str, FieldKind)> = component.fields.iter().map(|(f, k)| (f.as_str(), *k)).collect();
            defs.push(ComponentDef::new(component.name.clone(), &fields));
        }

        let mut world = World::new(defs);
        let mut names = EntityMap::new();

        for entity in &data.entities {
            entity.spawn(&mut world, &mut names)?;
        }

        let mut agents = Vec::with_capacity(data.agents.len());
        for agent in data.agents {
            let entity = agent.entity.spawn(&mut world, &mut names)?;
            let system_prompt = agent
                .system_prompt
                .unwrap_or_else(|| format!("You are {}, {}. Stay in character.", agent.entity.name, agent.role));
            let mut mind = AgentMind::new(agent.entity.name.clone(), agent.role, system_prompt).with_entity(entity);

            if let Some(top) = agent.goals.iter().max_by(|a, b| a.priority.total_cmp(&b.priority)) {
                world.set_text(entity, GOAL, top.description.clone())?;
            }
            mind.goals = agent.goals;
            agents.push(mind);
        }

        tracing::info!(
            entities = world.entity_count(),
            agents = agents.len(),
            "scenario loaded"
        );
        Ok(Self { world, names, agents })
    }

    pub fn agent(&self, name: &str) -> Option<&AgentMind> {
        self.agents.iter().find(|a| a.name == name)
    }
}

/// TOML representation of a scenario file
#[derive(Debug, Deserialize)]
struct TomlScenario {
    #[serde(default)]
    components: Vec<TomlComponent>,
    #[serde(default)]
    entities: Vec<TomlEntity>,
    #[serde(default)]
    agents: Vec<TomlAgent>,
}

/// Extra component table beyond the standard set
#[derive(Debug, Deserialize)]
struct TomlComponent {
    name: String,
    fields: BTreeMap<String, FieldKind>,
}

#[derive(Debug, Deserialize)]
struct TomlPosition {
    x: f64,
    y: f64,
}

#[derive(Debug, Deserialize)]
struct TomlEntity {
    name: String,
    description: Option<String>,
    position: Option<TomlPosition>,
    inventory: Option<Vec<String>>,
    /// Component name → field → value, for non-standard components
    #[serde(default)]
    components: BTreeMap<String, BTreeMap<String, FieldValue>>,
}

#[derive(Debug, Deserialize)]
struct TomlAgent {
    #[serde(flatten)]
    entity: TomlEntity,
    role: String,
    system_prompt: Option<String>,
    #[serde(default)]
    goals: Vec<Goal>,
}

impl TomlEntity {
    fn spawn(&self, world: &mut World, names: &mut EntityMap) -> Result<EntityId> {
        let entity = world.add_entity();
        world.set_text(entity, NAME, self.name.clone())?;
        if let Some(description) = &self.description {
            world.set_text(entity, DESCRIPTION, description.clone())?;
        }
        if let Some(position) = &self.position {
            world.add_component(
                entity,
                POSITION,
                [("x", FieldValue::Number(position.x)), ("y", FieldValue::Number(position.y))],
            )?;
        }
        if let Some(items) = &self.inventory {
            world.add_component(entity, INVENTORY, [("items", FieldValue::List(items.clone()))])?;
        }
        for (component, values) in &self.components {
            world.add_component(entity, component, values.iter().map(|(f, v)| (f.as_str(), v.clone())))?;
        }

        if let Some(previous) = names.bind(self.name.clone(), entity) {
            tracing::warn!(name = %self.name, previous = %previous, now = %entity, "name rebound to a newer entity");
        }
        Ok(entity)
    }
}
