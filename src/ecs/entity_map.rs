//! Name → entity resolution

use ahash::AHashMap;

use crate::core::types::EntityId;

/// Maps human-readable names to entity ids
///
/// Each name binds to exactly one entity; binding a name again replaces
/// the previous binding.
#[derive(Debug, Clone, Default)]
pub struct EntityMap {
    names: AHashMap<String, EntityId>,
}

impl EntityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `entity`, returning the entity it was bound to before
    pub fn bind(&mut self, name: impl Into<String>, entity: EntityId) -> Option<EntityId> {
        self.names.insert(name.into(), entity)
    }

    pub fn resolve(&self, name: &str) -> Option<EntityId> {
        self.names.get(name).copied()
    }

    /// Bound names in sorted order
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.names.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_write_wins() {
        let mut map = EntityMap::new();
        assert_eq!(map.bind("Marcus", EntityId(1)), None);
        assert_eq!(map.bind("Marcus", EntityId(4)), Some(EntityId(1)));
        assert_eq!(map.resolve("Marcus"), Some(EntityId(4)));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_names_sorted() {
        let mut map = EntityMap::new();
        map.bind("zed", EntityId(0));
        map.bind("alpha", EntityId(1));
        assert_eq!(map.names(), vec!["alpha".to_string(), "zed".to_string()]);
        assert_eq!(map.resolve("nobody"), None);
    }
}
