use crate::ids::new_id;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The generic record every selectable object in a session is built on.
///
/// An entity has a stable id (generated when absent), an optional name, an
/// optional type and a set of flags. Fields are private and only settable
/// through the builder methods, so an entity is immutable once it has been
/// handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(default = "new_id")]
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default)]
    flags: BTreeSet<String>,
}

impl Entity {
    /// Creates an unnamed entity with a fresh id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: new_id(),
            name: None,
            kind: None,
            flags: BTreeSet::new(),
        }
    }

    /// Creates a named entity with a fresh id.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self::new().with_name(name)
    }

    /// Replaces the generated id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    #[must_use]
    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        self.flags.insert(flag.into());
        self
    }

    #[must_use]
    pub fn with_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.flags.extend(flags.into_iter().map(Into::into));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    pub fn flags(&self) -> &BTreeSet<String> {
        &self.flags
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::new()
    }
}

/// Anything built on an [`Entity`] and therefore selectable by filters.
pub trait Filterable {
    fn entity(&self) -> &Entity;

    fn id(&self) -> &str {
        self.entity().id()
    }

    fn name(&self) -> Option<&str> {
        self.entity().name()
    }

    fn kind(&self) -> Option<&str> {
        self.entity().kind()
    }

    fn flags(&self) -> &BTreeSet<String> {
        self.entity().flags()
    }
}

impl Filterable for Entity {
    fn entity(&self) -> &Entity {
        self
    }
}

impl<T: Filterable + ?Sized> Filterable for &T {
    fn entity(&self) -> &Entity {
        (**self).entity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_entities_get_distinct_ids() {
        assert_ne!(Entity::new().id(), Entity::new().id());
    }

    #[test]
    fn builder_sets_fields() {
        let e = Entity::named("Foo")
            .with_kind("card")
            .with_flags(["a", "b"])
            .with_flag("c");
        assert_eq!(e.name(), Some("Foo"));
        assert_eq!(e.kind(), Some("card"));
        assert!(e.has_flag("a"));
        assert!(e.has_flag("c"));
        assert!(!e.has_flag("d"));
    }

    #[test]
    fn deserialize_generates_missing_id() {
        let e: Entity = serde_json::from_str(r#"{"name":"x","flags":["f"]}"#).unwrap();
        assert!(!e.id().is_empty());
        assert_eq!(e.name(), Some("x"));
    }

    #[test]
    fn type_field_uses_wire_name() {
        let e = Entity::new().with_id("e1").with_kind("tile");
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["type"], "tile");
        assert_eq!(json["id"], "e1");
        assert!(json.get("name").is_none());
    }
}
