//! Grant, Call and Expiry records.

use ludus_filter::Filter;
use ludus_types::{Args, Entity, Filterable};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A capability token letting one player run one action.
///
/// The grant's entity name is the action it authorizes. Arguments the
/// player supplies when triggering are merged with the grant's own:
/// `kwargs` always win, `defaults` only fill keys the player left out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grant {
    #[serde(flatten)]
    entity: Entity,
    #[serde(default, skip_serializing_if = "Args::is_empty")]
    kwargs: Args,
    #[serde(default, skip_serializing_if = "Args::is_empty")]
    defaults: Args,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    data: Value,
    #[serde(default)]
    repeatable: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    expires: Vec<Expiry>,
}

impl Grant {
    /// A one-shot grant for `action` with a fresh id.
    #[must_use]
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            entity: Entity::named(action),
            kwargs: Args::new(),
            defaults: Args::new(),
            data: Value::Null,
            repeatable: false,
            expires: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.entity = self.entity.with_id(id);
        self
    }

    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.entity = self.entity.with_kind(kind);
        self
    }

    #[must_use]
    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        self.entity = self.entity.with_flag(flag);
        self
    }

    #[must_use]
    pub fn with_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entity = self.entity.with_flags(flags);
        self
    }

    /// Forces `key` to `value` whatever the player supplies.
    #[must_use]
    pub fn with_kwarg(mut self, key: impl Into<String>, value: Value) -> Self {
        self.kwargs.insert(key.into(), value);
        self
    }

    /// Supplies `value` for `key` when the player leaves it out.
    #[must_use]
    pub fn with_default(mut self, key: impl Into<String>, value: Value) -> Self {
        self.defaults.insert(key.into(), value);
        self
    }

    /// Opaque payload for clients, e.g. which cells a placement may target.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    #[must_use]
    pub fn repeatable(mut self) -> Self {
        self.repeatable = true;
        self
    }

    /// Grants to expire once this one is triggered successfully.
    #[must_use]
    pub fn with_expiry(mut self, expiry: impl Into<Expiry>) -> Self {
        self.expires.push(expiry.into());
        self
    }

    pub fn id(&self) -> &str {
        self.entity.id()
    }

    /// The action this grant authorizes.
    pub fn action(&self) -> &str {
        self.entity.name().unwrap_or_default()
    }

    pub fn kwargs(&self) -> &Args {
        &self.kwargs
    }

    pub fn defaults(&self) -> &Args {
        &self.defaults
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn is_repeatable(&self) -> bool {
        self.repeatable
    }

    pub fn expires(&self) -> &[Expiry] {
        &self.expires
    }

    /// Final arguments for a trigger: `supplied`, overridden by the forced
    /// kwargs, with defaults filling whatever is still absent.
    pub fn resolve_args(&self, supplied: Args) -> Args {
        let mut args = supplied;
        for (key, value) in &self.kwargs {
            args.insert(key.clone(), value.clone());
        }
        for (key, value) in &self.defaults {
            args.entry(key.clone()).or_insert_with(|| value.clone());
        }
        args
    }

    /// A request to trigger this grant with `args`.
    pub fn call(&self, args: Args) -> Call {
        Call::new(self.id(), self.action(), args)
    }
}

impl Filterable for Grant {
    fn entity(&self) -> &Entity {
        &self.entity
    }
}

/// What a client sends to ask the server to trigger a grant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    #[serde(flatten)]
    entity: Entity,
    #[serde(default)]
    args: Args,
}

impl Call {
    /// `grant_id` becomes the call's id and `action` its name.
    #[must_use]
    pub fn new(grant_id: impl Into<String>, action: impl Into<String>, args: Args) -> Self {
        Self {
            entity: Entity::named(action).with_id(grant_id),
            args,
        }
    }

    pub fn grant_id(&self) -> &str {
        self.entity.id()
    }

    pub fn action(&self) -> &str {
        self.entity.name().unwrap_or_default()
    }

    pub fn args(&self) -> &Args {
        &self.args
    }

    pub fn into_args(self) -> Args {
        self.args
    }
}

impl Filterable for Call {
    fn entity(&self) -> &Entity {
        &self.entity
    }
}

/// One entry of an expiry list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expiry {
    /// Every grant of every player.
    All,
    /// The grant with this id, from every player.
    Id(String),
    /// Every grant the filter matches.
    Matching(Filter),
}

impl From<&str> for Expiry {
    fn from(id: &str) -> Self {
        Self::Id(id.to_string())
    }
}

impl From<String> for Expiry {
    fn from(id: String) -> Self {
        Self::Id(id)
    }
}

impl From<Filter> for Expiry {
    fn from(filter: Filter) -> Self {
        if filter.is_all() {
            Self::All
        } else {
            Self::Matching(filter)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Args {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn kwargs_win_and_defaults_fill() {
        let grant = Grant::new("place")
            .with_kwarg("player", json!(0))
            .with_default("cell", json!(4))
            .with_default("mark", json!("x"));
        let resolved = grant.resolve_args(args(json!({"player": 1, "mark": "o"})));
        assert_eq!(resolved, args(json!({"player": 0, "cell": 4, "mark": "o"})));
    }

    #[test]
    fn call_carries_grant_identity() {
        let grant = Grant::new("place").with_id("g1");
        let call = grant.call(args(json!({"cell": 2})));
        assert_eq!(call.grant_id(), "g1");
        assert_eq!(call.action(), "place");
        assert_eq!(call.args()["cell"], json!(2));
    }

    #[test]
    fn wire_shape_is_flat() {
        let grant = Grant::new("place")
            .with_id("g1")
            .with_flag("move")
            .with_expiry("g2")
            .with_expiry(Filter::flag("move"));
        let value = serde_json::to_value(&grant).unwrap();
        assert_eq!(value["id"], json!("g1"));
        assert_eq!(value["name"], json!("place"));
        assert_eq!(value["repeatable"], json!(false));
        assert_eq!(value["expires"][0], json!({"id": "g2"}));
        let back: Grant = serde_json::from_value(value).unwrap();
        assert_eq!(back, grant);
    }

    #[test]
    fn all_filter_becomes_all_expiry() {
        assert_eq!(Expiry::from(Filter::All), Expiry::All);
        assert!(matches!(Expiry::from(Filter::id("x")), Expiry::Matching(_)));
    }
}
