use crate::attr::{AttrFilter, FlagTest, Selector};
use ludus_types::Filterable;
use serde::{Deserialize, Serialize};
use std::ops::{BitAnd, BitOr, BitXor, Not};

/// Outcome of evaluating a filter against one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject,
    /// The filter had no criterion to evaluate.
    Abstain,
}

impl Verdict {
    /// Collapses to a boolean; only `Accept` matches.
    #[must_use]
    pub fn matches(self) -> bool {
        self == Self::Accept
    }

    fn from_bool(matched: bool) -> Self {
        if matched { Self::Accept } else { Self::Reject }
    }
}

/// A composable predicate over filterable entities.
///
/// Serialized externally tagged: `"all"`, `{"attr": {..}}`, `{"and": [a, b]}`,
/// `{"not": f}` and so on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    /// Matches everything. Bulk callers check [`Filter::is_all`] and skip the
    /// per-entity scan.
    All,
    Attr(AttrFilter),
    And(Box<Filter>, Box<Filter>),
    Or(Box<Filter>, Box<Filter>),
    Xor(Box<Filter>, Box<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    /// Evaluates the filter. Combinators treat an abstaining operand as not
    /// matching and always answer `Accept` or `Reject`.
    pub fn accepts<T: Filterable + ?Sized>(&self, obj: &T) -> Verdict {
        match self {
            Self::All => Verdict::Accept,
            Self::Attr(attr) => attr.accepts(obj),
            Self::And(a, b) => Verdict::from_bool(a.matches(obj) && b.matches(obj)),
            Self::Or(a, b) => Verdict::from_bool(a.matches(obj) || b.matches(obj)),
            Self::Xor(a, b) => Verdict::from_bool(a.matches(obj) != b.matches(obj)),
            Self::Not(a) => Verdict::from_bool(!a.matches(obj)),
        }
    }

    pub fn matches<T: Filterable + ?Sized>(&self, obj: &T) -> bool {
        self.accepts(obj).matches()
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    /// Returns the items this filter matches, in input order.
    pub fn select<'a, T, I>(&self, items: I) -> Vec<&'a T>
    where
        T: Filterable + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        items.into_iter().filter(|item| self.matches(*item)).collect()
    }

    // ── Convenience constructors ──

    pub fn id(id: impl Into<String>) -> Self {
        AttrFilter::new().with_id(Selector::One(id.into())).into()
    }

    pub fn ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AttrFilter::new()
            .with_id(Selector::AnyOf(ids.into_iter().map(Into::into).collect()))
            .into()
    }

    pub fn name(name: impl Into<String>) -> Self {
        AttrFilter::new().with_name(Selector::One(name.into())).into()
    }

    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AttrFilter::new()
            .with_name(Selector::AnyOf(names.into_iter().map(Into::into).collect()))
            .into()
    }

    pub fn kind(kind: impl Into<String>) -> Self {
        AttrFilter::new().with_kind(kind).into()
    }

    pub fn flag(flag: impl Into<String>) -> Self {
        AttrFilter::new().with_flag(FlagTest::Has(flag.into())).into()
    }

    /// Entity must carry every one of `flags`.
    pub fn all_flags<I, S>(flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AttrFilter::new()
            .with_flag(FlagTest::All(flags.into_iter().map(Into::into).collect()))
            .into()
    }

    /// Entity must carry at least one of `flags`.
    pub fn any_flag<I, S>(flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AttrFilter::new()
            .with_flag(FlagTest::Any(flags.into_iter().map(Into::into).collect()))
            .into()
    }

    pub fn any_of(filters: Vec<Filter>) -> Self {
        AttrFilter::new().with_any(filters).into()
    }

    pub fn all_of(filters: Vec<Filter>) -> Self {
        AttrFilter::new().with_all(filters).into()
    }
}

impl From<AttrFilter> for Filter {
    fn from(attr: AttrFilter) -> Self {
        Self::Attr(attr)
    }
}

impl BitAnd for Filter {
    type Output = Filter;

    fn bitand(self, rhs: Self) -> Filter {
        Filter::And(Box::new(self), Box::new(rhs))
    }
}

impl BitOr for Filter {
    type Output = Filter;

    fn bitor(self, rhs: Self) -> Filter {
        Filter::Or(Box::new(self), Box::new(rhs))
    }
}

impl BitXor for Filter {
    type Output = Filter;

    fn bitxor(self, rhs: Self) -> Filter {
        Filter::Xor(Box::new(self), Box::new(rhs))
    }
}

impl Not for Filter {
    type Output = Filter;

    fn not(self) -> Filter {
        Filter::Not(Box::new(self))
    }
}
