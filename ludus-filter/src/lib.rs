//! Entity filters for ludus.
//!
//! A [`Filter`] is a composable predicate over anything [`Filterable`]. Leaf
//! criteria live in an [`AttrFilter`] (id, name, type, flags plus nested
//! `any`/`all` lists); [`Filter`] adds the `All` sentinel and the boolean
//! combinators, also reachable through the `&`, `|`, `^` and `!` operators.
//!
//! Attribute filters answer with a three-valued [`Verdict`]. Wherever a plain
//! boolean is needed, [`Verdict::Abstain`] counts as *no match*.
//!
//! [`Filterable`]: ludus_types::Filterable

mod attr;
mod filter;

pub use attr::{AttrFilter, FlagTest, Selector};
pub use filter::{Filter, Verdict};
