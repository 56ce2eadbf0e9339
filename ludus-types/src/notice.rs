//! Notices and the notice-type registry.
//!
//! A notice is the unit of replication: the authoritative engine emits one
//! for every state change a replica needs to hear about, and replicas route
//! incoming notices by their type token.
//!
//! Type tokens are registered once per `(owner, identifier)` pair in a
//! [`NoticeTypes`] registry owned by the engine. Tokens declared by the core
//! start with two colons (`"::call"`); plugins should use a single colon plus
//! their own dotted name (`":cards.deal"`).

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::warn;

/// A registered notice type token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoticeType(Cow<'static, str>);

impl NoticeType {
    /// A replicated action call.
    pub const CALL: NoticeType = NoticeType(Cow::Borrowed("::call"));
    /// Session initialization data.
    pub const INIT: NoticeType = NoticeType(Cow::Borrowed("::init"));
    /// Grants issued to players.
    pub const GRANT: NoticeType = NoticeType(Cow::Borrowed("::grant"));
    /// Grants expired.
    pub const EXPIRE: NoticeType = NoticeType(Cow::Borrowed("::expire"));
    /// Object store insertions.
    pub const STORE_SET: NoticeType = NoticeType(Cow::Borrowed("::store-set"));
    /// Object store deletions.
    pub const STORE_DEL: NoticeType = NoticeType(Cow::Borrowed("::store-del"));

    /// Wraps an arbitrary token. Prefer registering it in [`NoticeTypes`].
    #[must_use]
    pub fn custom(token: impl Into<String>) -> Self {
        Self(Cow::Owned(token.into()))
    }

    /// Wraps a static token, usable in `const` items.
    #[must_use]
    pub const fn from_static(token: &'static str) -> Self {
        Self(Cow::Borrowed(token))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NoticeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Owner under which the core notice types are registered.
pub const CORE_OWNER: &str = "ludus";

/// Registry mapping `(owner, IDENTIFIER)` pairs to type tokens.
#[derive(Debug, Clone, Default)]
pub struct NoticeTypes {
    by_key: BTreeMap<(String, String), NoticeType>,
    by_token: HashMap<String, (String, String)>,
}

impl NoticeTypes {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the core `CALL` and `INIT` types.
    #[must_use]
    pub fn with_core_types() -> Self {
        let mut types = Self::new();
        types.insert(CORE_OWNER, "CALL", NoticeType::CALL);
        types.insert(CORE_OWNER, "INIT", NoticeType::INIT);
        types
    }

    /// Registers `ident` for `owner` with the given token.
    ///
    /// Registering the identical triple again only warns. Registering the
    /// same identifier with another token, or a token already owned by a
    /// different identifier, is an error.
    pub fn register(
        &mut self,
        owner: &str,
        ident: &str,
        token: impl Into<Cow<'static, str>>,
    ) -> Result<NoticeType> {
        let token = NoticeType(token.into());
        validate_ident(ident)?;

        let key = (owner.to_string(), ident.to_string());
        if let Some(existing) = self.by_key.get(&key) {
            if *existing == token {
                warn!(owner, ident, token = %token, "duplicate notice type declaration");
                return Ok(token);
            }
            return Err(Error::IdentifierTaken {
                owner: owner.to_string(),
                ident: ident.to_string(),
                token: existing.to_string(),
            });
        }
        if let Some((o, i)) = self.by_token.get(token.as_str()) {
            return Err(Error::TokenTaken {
                token: token.to_string(),
                owner: o.clone(),
                ident: i.clone(),
            });
        }

        self.insert(owner, ident, token.clone());
        Ok(token)
    }

    /// Looks up the token registered for `(owner, ident)`.
    pub fn get(&self, owner: &str, ident: &str) -> Option<&NoticeType> {
        self.by_key.get(&(owner.to_string(), ident.to_string()))
    }

    /// Returns the `(owner, ident)` pair that registered `token`.
    pub fn owner_of(&self, token: &NoticeType) -> Option<(&str, &str)> {
        self.by_token
            .get(token.as_str())
            .map(|(o, i)| (o.as_str(), i.as_str()))
    }

    /// Iterates `(owner, ident, token)` triples in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &NoticeType)> {
        self.by_key
            .iter()
            .map(|((o, i), t)| (o.as_str(), i.as_str(), t))
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    fn insert(&mut self, owner: &str, ident: &str, token: NoticeType) {
        self.by_token.insert(
            token.as_str().to_string(),
            (owner.to_string(), ident.to_string()),
        );
        self.by_key
            .insert((owner.to_string(), ident.to_string()), token);
    }
}

fn validate_ident(ident: &str) -> Result<()> {
    let mut chars = ident.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_uppercase() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');
    if valid_start && valid_rest {
        Ok(())
    } else {
        Err(Error::InvalidIdentifier(ident.to_string()))
    }
}

/// An immutable message describing a state change.
///
/// Wire shape: `{ "source": .., "type": .., "name": .., "data": .. }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    source: String,
    #[serde(rename = "type")]
    kind: NoticeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default)]
    data: Value,
}

impl Notice {
    #[must_use]
    pub fn new(source: impl Into<String>, kind: NoticeType, data: Value) -> Self {
        Self {
            source: source.into(),
            kind,
            name: None,
            data,
        }
    }

    /// Attaches the action name this notice reports on.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Id of the component that emitted the notice.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn kind(&self) -> &NoticeType {
        &self.kind
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn into_data(self) -> Value {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn core_types_preregistered() {
        let types = NoticeTypes::with_core_types();
        assert_eq!(types.get(CORE_OWNER, "CALL"), Some(&NoticeType::CALL));
        assert_eq!(types.get(CORE_OWNER, "INIT"), Some(&NoticeType::INIT));
        assert_eq!(types.len(), 2);
    }

    #[test]
    fn identical_registration_is_noop() {
        let mut types = NoticeTypes::new();
        types.register("cards", "DEAL", ":cards.deal").unwrap();
        let again = types.register("cards", "DEAL", ":cards.deal").unwrap();
        assert_eq!(again.as_str(), ":cards.deal");
        assert_eq!(types.len(), 1);
    }

    #[test]
    fn same_ident_different_token_rejected() {
        let mut types = NoticeTypes::new();
        types.register("cards", "DEAL", ":cards.deal").unwrap();
        let err = types.register("cards", "DEAL", ":cards.deal2").unwrap_err();
        assert!(matches!(err, Error::IdentifierTaken { .. }));
    }

    #[test]
    fn same_token_different_ident_rejected() {
        let mut types = NoticeTypes::new();
        types.register("cards", "DEAL", ":cards.deal").unwrap();
        let err = types.register("dice", "ROLL", ":cards.deal").unwrap_err();
        assert!(matches!(err, Error::TokenTaken { .. }));
    }

    #[test]
    fn identifiers_are_namespaced_by_owner() {
        let mut types = NoticeTypes::new();
        types.register("cards", "PING", ":cards.ping").unwrap();
        types.register("dice", "PING", ":dice.ping").unwrap();
        assert_eq!(types.get("cards", "PING").unwrap().as_str(), ":cards.ping");
        assert_eq!(types.get("dice", "PING").unwrap().as_str(), ":dice.ping");
        assert_eq!(
            types.owner_of(&NoticeType::custom(":dice.ping")),
            Some(("dice", "PING"))
        );
    }

    #[test]
    fn identifier_must_be_upper_case() {
        let mut types = NoticeTypes::new();
        assert!(matches!(
            types.register("cards", "deal", ":cards.deal"),
            Err(Error::InvalidIdentifier(_))
        ));
        assert!(types.register("cards", "1DEAL", ":x").is_err());
        assert!(types.register("cards", "", ":y").is_err());
        assert!(types.register("cards", "_DEAL_2", ":z").is_ok());
    }

    #[test]
    fn notice_wire_shape() {
        let notice = Notice::new("server", NoticeType::CALL, json!({"x": 1})).with_name("place");
        let wire = serde_json::to_value(&notice).unwrap();
        assert_eq!(
            wire,
            json!({"source": "server", "type": "::call", "name": "place", "data": {"x": 1}})
        );
        let back: Notice = serde_json::from_value(wire).unwrap();
        assert_eq!(back, notice);
    }
}
