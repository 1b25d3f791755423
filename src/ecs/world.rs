//! World store - columnar component tables over entity ids
//!
//! Every component is a table with one dense column per field, indexed by
//! entity id. A presence mask per table records which entities currently
//! hold the component, so queries intersect masks instead of scanning
//! columns. Reading a field of an entity that lacks the component yields
//! `None`.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SimError};
use crate::core::types::EntityId;

pub const POSITION: &str = "Position";
pub const NAME: &str = "Name";
pub const DESCRIPTION: &str = "Description";
pub const GOAL: &str = "Goal";
pub const INVENTORY: &str = "Inventory";

/// Field name used by single-value components (Name, Description, Goal)
pub const VALUE_FIELD: &str = "value";

/// Storage kind of a component field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Number,
    Text,
    List,
}

impl FieldKind {
    fn describe(&self) -> &'static str {
        match self {
            FieldKind::Number => "a number",
            FieldKind::Text => "a string",
            FieldKind::List => "a list of strings",
        }
    }
}

/// A single cell value in a component column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Number(_) => FieldKind::Number,
            FieldValue::Text(_) => FieldKind::Text,
            FieldValue::List(_) => FieldKind::List,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(items: Vec<String>) -> Self {
        FieldValue::List(items)
    }
}

/// Schema of a component: its name and typed fields
#[derive(Debug, Clone)]
pub struct ComponentDef {
    pub name: String,
    pub fields: Vec<(String, FieldKind)>,
}

impl ComponentDef {
    pub fn new(name: impl Into<String>, fields: &[(&str, FieldKind)]) -> Self {
        Self {
            name: name.into(),
            fields: fields.iter().map(|(f, k)| (f.to_string(), *k)).collect(),
        }
    }

    pub fn position() -> Self {
        Self::new(POSITION, &[("x", FieldKind::Number), ("y", FieldKind::Number)])
    }

    /// A component holding a single text value (Name, Description, Goal)
    pub fn value(name: &str) -> Self {
        Self::new(name, &[(VALUE_FIELD, FieldKind::Text)])
    }

    pub fn inventory() -> Self {
        Self::new(INVENTORY, &[("items", FieldKind::List)])
    }

    /// Position, Name, Description, Goal and Inventory
    pub fn standard() -> Vec<Self> {
        vec![
            Self::position(),
            Self::value(NAME),
            Self::value(DESCRIPTION),
            Self::value(GOAL),
            Self::inventory(),
        ]
    }
}

/// Growable bitset keyed by entity index
#[derive(Debug, Clone, Default)]
pub struct PresenceMask {
    words: Vec<u64>,
}

impl PresenceMask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, index: usize) {
        let word = index / 64;
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1u64 << (index % 64);
    }

    pub fn contains(&self, index: usize) -> bool {
        self.words
            .get(index / 64)
            .map(|w| w & (1u64 << (index % 64)) != 0)
            .unwrap_or(false)
    }

    pub fn intersect_with(&mut self, other: &PresenceMask) {
        self.words.truncate(other.words.len());
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a &= *b;
        }
    }

    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Set indices in ascending order
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            let mut bits = word;
            std::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }
                let bit = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                Some(i * 64 + bit)
            })
        })
    }
}

/// Handle to a component table within one world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentId(usize);

/// One component's columns plus its presence mask
#[derive(Debug, Clone)]
struct ComponentTable {
    def: ComponentDef,
    presence: PresenceMask,
    columns: Vec<Vec<Option<FieldValue>>>,
}

impl ComponentTable {
    fn new(def: ComponentDef) -> Self {
        let columns = vec![Vec::new(); def.fields.len()];
        Self {
            def,
            presence: PresenceMask::new(),
            columns,
        }
    }

    fn field_index(&self, field: &str) -> Option<usize> {
        self.def.fields.iter().position(|(name, _)| name == field)
    }
}

/// The world: a fixed set of component tables plus the live entity set
#[derive(Debug, Clone)]
pub struct World {
    pub current_tick: u64,
    tables: Vec<ComponentTable>,
    by_name: AHashMap<String, ComponentId>,
    live: PresenceMask,
    next_entity: u32,
}

impl World {
    /// Create a world bound to the given component definitions
    ///
    /// A repeated component name keeps its first definition.
    pub fn new(components: impl IntoIterator<Item = ComponentDef>) -> Self {
        let mut tables = Vec::new();
        let mut by_name = AHashMap::new();
        for def in components {
            if by_name.contains_key(&def.name) {
                tracing::warn!(component = %def.name, "duplicate component definition ignored");
                continue;
            }
            by_name.insert(def.name.clone(), ComponentId(tables.len()));
            tables.push(ComponentTable::new(def));
        }

        Self {
            current_tick: 0,
            tables,
            by_name,
            live: PresenceMask::new(),
            next_entity: 0,
        }
    }

    /// A world with the standard component set
    pub fn standard() -> Self {
        Self::new(ComponentDef::standard())
    }

    /// Allocate a fresh entity id; ids are never reused
    pub fn add_entity(&mut self) -> EntityId {
        let id = EntityId(self.next_entity);
        self.next_entity += 1;
        self.live.insert(id.index());
        id
    }

    /// Allocate an entity and attach each listed component with its values
    pub fn spawn<'a, I, F>(&mut self, components: I) -> Result<EntityId>
    where
        I: IntoIterator<Item = (&'a str, F)>,
        F: IntoIterator<Item = (&'a str, FieldValue)>,
    {
        let entity = self.add_entity();
        for (component, values) in components {
            self.add_component(entity, component, values)?;
        }
        Ok(entity)
    }

    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.live.contains(entity.index())
    }

    pub fn entity_count(&self) -> usize {
        self.live.count()
    }

    /// All live entities in ascending id order
    pub fn entities(&self) -> Vec<EntityId> {
        self.live.iter().map(|i| EntityId(i as u32)).collect()
    }

    pub fn component_id(&self, name: &str) -> Option<ComponentId> {
        self.by_name.get(name).copied()
    }

    /// Component names in definition order
    pub fn component_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.tables.iter().map(|t| t.def.name.as_str())
    }

    /// Attach a component to an entity and write its initial field values
    ///
    /// Attaching a component the entity already has overwrites the given
    /// fields; fields not listed keep their previous values. All values are
    /// checked before anything is written.
    pub fn add_component<'a>(
        &mut self,
        entity: EntityId,
        component: &str,
        values: impl IntoIterator<Item = (&'a str, FieldValue)>,
    ) -> Result<()> {
        if !self.is_alive(entity) {
            return Err(SimError::EntityNotFound(entity));
        }
        let id = self
            .component_id(component)
            .ok_or_else(|| SimError::UnknownComponent(component.to_string()))?;
        let table = &mut self.tables[id.0];

        let mut writes = Vec::new();
        for (field, value) in values {
            let index = table.field_index(field).ok_or_else(|| SimError::UnknownField {
                component: component.to_string(),
                field: field.to_string(),
            })?;
            let expected = table.def.fields[index].1;
            if value.kind() != expected {
                return Err(SimError::FieldMismatch {
                    component: component.to_string(),
                    field: field.to_string(),
                    expected: expected.describe(),
                });
            }
            writes.push((index, value));
        }

        let slot = entity.index();
        for column in &mut table.columns {
            if column.len() <= slot {
                column.resize(slot + 1, None);
            }
        }
        for (index, value) in writes {
            table.columns[index][slot] = Some(value);
        }
        table.presence.insert(slot);
        Ok(())
    }

    pub fn has_component(&self, entity: EntityId, component: &str) -> bool {
        self.component_id(component)
            .map(|id| self.tables[id.0].presence.contains(entity.index()))
            .unwrap_or(false)
    }

    /// Read one field; None when the entity lacks the component or the value
    pub fn get(&self, entity: EntityId, component: &str, field: &str) -> Option<&FieldValue> {
        let table = &self.tables[self.component_id(component)?.0];
        if !table.presence.contains(entity.index()) {
            return None;
        }
        let index = table.field_index(field)?;
        table.columns[index].get(entity.index())?.as_ref()
    }

    /// Entities holding every component in the signature, in ascending id order
    ///
    /// A signature naming an unknown component matches nothing.
    pub fn query(&self, signature: &[&str]) -> Vec<EntityId> {
        let mut mask = self.live.clone();
        for name in signature {
            match self.component_id(name) {
                Some(id) => mask.intersect_with(&self.tables[id.0].presence),
                None => return Vec::new(),
            }
        }
        mask.iter().map(|i| EntityId(i as u32)).collect()
    }

    pub fn position(&self, entity: EntityId) -> Option<(f64, f64)> {
        let x = self.get(entity, POSITION, "x")?.as_number()?;
        let y = self.get(entity, POSITION, "y")?.as_number()?;
        Some((x, y))
    }

    /// Text of a single-value component (Name, Description, Goal)
    pub fn text(&self, entity: EntityId, component: &str) -> Option<&str> {
        self.get(entity, component, VALUE_FIELD)?.as_text()
    }

    pub fn set_text(&mut self, entity: EntityId, component: &str, value: impl Into<String>) -> Result<()> {
        self.add_component(entity, component, [(VALUE_FIELD, FieldValue::Text(value.into()))])
    }

    pub fn inventory(&self, entity: EntityId) -> Option<&[String]> {
        self.get(entity, INVENTORY, "items")?.as_list()
    }

    pub fn tick(&mut self) {
        self.current_tick += 1;
    }
}

impl Default for World {
    fn default() -> Self {
        Self::standard()
    }
}
