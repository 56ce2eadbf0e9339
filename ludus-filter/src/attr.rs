//! Attribute filters: leaf criteria over id, name, type and flags.

use crate::filter::{Filter, Verdict};
use ludus_types::Filterable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Matches a single string attribute either exactly or by set membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Selector {
    One(String),
    AnyOf(BTreeSet<String>),
}

impl Selector {
    fn test(&self, value: Option<&str>) -> bool {
        let Some(value) = value else {
            return false;
        };
        match self {
            Self::One(expected) => expected == value,
            Self::AnyOf(set) => set.contains(value),
        }
    }
}

impl From<&str> for Selector {
    fn from(value: &str) -> Self {
        Self::One(value.to_string())
    }
}

impl From<String> for Selector {
    fn from(value: String) -> Self {
        Self::One(value)
    }
}

/// A test against an entity's flag set.
///
/// | variant | passes when the entity has |
/// |---|---|
/// | `Has(f)` | flag `f` |
/// | `All([..])` | every listed flag |
/// | `Any({..})` | at least one listed flag |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagTest {
    Has(String),
    All(Vec<String>),
    Any(BTreeSet<String>),
}

impl FlagTest {
    fn test(&self, flags: &BTreeSet<String>) -> bool {
        match self {
            Self::Has(flag) => flags.contains(flag),
            Self::All(wanted) => wanted.iter().all(|f| flags.contains(f)),
            Self::Any(wanted) => wanted.iter().any(|f| flags.contains(f)),
        }
    }
}

/// A conjunction of optional leaf criteria and nested sub-filter lists.
///
/// Unset criteria have no opinion. A filter with nothing set abstains.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttrFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Selector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Selector>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag: Option<FlagTest>,
    /// At least one of these must match.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub any: Vec<Filter>,
    /// Every one of these must match.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub all: Vec<Filter>,
}

impl AttrFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<Selector>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<Selector>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    #[must_use]
    pub fn with_flag(mut self, flag: FlagTest) -> Self {
        self.flag = Some(flag);
        self
    }

    #[must_use]
    pub fn with_any(mut self, filters: Vec<Filter>) -> Self {
        self.any = filters;
        self
    }

    #[must_use]
    pub fn with_all(mut self, filters: Vec<Filter>) -> Self {
        self.all = filters;
        self
    }

    /// Three-valued evaluation.
    ///
    /// Rejects if any set criterion disagrees; nested lists are only visited
    /// once every leaf criterion passed. Accepts when at least one criterion
    /// was evaluated and none disagreed.
    pub fn accepts<T: Filterable + ?Sized>(&self, obj: &T) -> Verdict {
        let entity = obj.entity();

        let leaves = [
            self.id.as_ref().map(|s| s.test(Some(entity.id()))),
            self.name.as_ref().map(|s| s.test(entity.name())),
            self.kind.as_deref().map(|k| entity.kind() == Some(k)),
            self.flag.as_ref().map(|f| f.test(entity.flags())),
        ];
        if leaves.contains(&Some(false)) {
            return Verdict::Reject;
        }
        let mut opinion = leaves.contains(&Some(true));

        if !self.any.is_empty() {
            if !self.any.iter().any(|f| f.matches(entity)) {
                return Verdict::Reject;
            }
            opinion = true;
        }
        if !self.all.is_empty() {
            if !self.all.iter().all(|f| f.matches(entity)) {
                return Verdict::Reject;
            }
            opinion = true;
        }

        if opinion {
            Verdict::Accept
        } else {
            Verdict::Abstain
        }
    }

    /// True when no criterion is set.
    pub fn is_empty(&self) -> bool {
        self.id.is_none()
            && self.name.is_none()
            && self.kind.is_none()
            && self.flag.is_none()
            && self.any.is_empty()
            && self.all.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ludus_types::Entity;

    fn card() -> Entity {
        Entity::named("ace")
            .with_id("c1")
            .with_kind("card")
            .with_flags(["a", "b", "c"])
    }

    #[test]
    fn empty_filter_abstains() {
        assert_eq!(AttrFilter::new().accepts(&card()), Verdict::Abstain);
        assert!(AttrFilter::new().is_empty());
    }

    #[test]
    fn id_exact_and_membership() {
        assert_eq!(AttrFilter::new().with_id("c1").accepts(&card()), Verdict::Accept);
        assert_eq!(AttrFilter::new().with_id("c2").accepts(&card()), Verdict::Reject);
        let set = Selector::AnyOf(["c0".to_string(), "c1".to_string()].into());
        assert_eq!(AttrFilter::new().with_id(set).accepts(&card()), Verdict::Accept);
    }

    #[test]
    fn name_on_unnamed_entity_rejects() {
        let e = Entity::new();
        assert_eq!(AttrFilter::new().with_name("ace").accepts(&e), Verdict::Reject);
    }

    #[test]
    fn kind_must_match_exactly() {
        assert_eq!(AttrFilter::new().with_kind("card").accepts(&card()), Verdict::Accept);
        assert_eq!(AttrFilter::new().with_kind("tile").accepts(&card()), Verdict::Reject);
    }

    #[test]
    fn flag_semantics() {
        let has = FlagTest::Has("a".into());
        let all = FlagTest::All(vec!["a".into(), "d".into()]);
        let any = FlagTest::Any(["a".to_string(), "d".to_string()].into());
        assert_eq!(AttrFilter::new().with_flag(has).accepts(&card()), Verdict::Accept);
        assert_eq!(AttrFilter::new().with_flag(all).accepts(&card()), Verdict::Reject);
        assert_eq!(AttrFilter::new().with_flag(any).accepts(&card()), Verdict::Accept);
    }

    #[test]
    fn criteria_combine_with_and() {
        let f = AttrFilter::new().with_name("ace").with_kind("tile");
        assert_eq!(f.accepts(&card()), Verdict::Reject);
    }

    #[test]
    fn nested_lists() {
        let any = AttrFilter::new().with_any(vec![Filter::name("king"), Filter::name("ace")]);
        assert_eq!(any.accepts(&card()), Verdict::Accept);

        let all = AttrFilter::new().with_all(vec![Filter::name("ace"), Filter::kind("tile")]);
        assert_eq!(all.accepts(&card()), Verdict::Reject);
    }

    #[test]
    fn abstaining_member_of_any_list_does_not_count() {
        let f = AttrFilter::new().with_any(vec![Filter::Attr(AttrFilter::new())]);
        assert_eq!(f.accepts(&card()), Verdict::Reject);
    }
}
