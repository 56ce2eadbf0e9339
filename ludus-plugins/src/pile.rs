//! Ordered piles: draw piles, discard piles, hands, stacks of units.
//!
//! The last element of the stack is the top of the pile. Random operations
//! come in two halves: a `plan_*` method draws positions from an RNG and a
//! matching method applies them. Plan inside an init handler and stash the
//! positions, so a replayed call applies the same ones.

use crate::error::{PluginError, PluginResult};
use crate::store::Item;
use ludus_filter::Filter;
use ludus_types::{Entity, Filterable};
use rand::seq::{index, SliceRandom};
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A filterable entity holding an ordered stack of items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pile<T = Item> {
    #[serde(flatten)]
    entity: Entity,
    #[serde(default)]
    stack: Vec<T>,
}

impl<T> Pile<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entity: Entity::new(),
            stack: Vec::new(),
        }
    }

    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            entity: Entity::named(name),
            stack: Vec::new(),
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

    /// Replaces the stack. The last item ends up on top.
    #[must_use]
    pub fn with_items(mut self, items: impl IntoIterator<Item = T>) -> Self {
        self.stack = items.into_iter().collect();
        self
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Items bottom to top.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.stack.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.stack
    }

    pub fn get(&self, position: usize) -> Option<&T> {
        self.stack.get(position)
    }

    pub fn get_mut(&mut self, position: usize) -> Option<&mut T> {
        self.stack.get_mut(position)
    }

    /// Replaces the item at `position`, returning the old one.
    pub fn set(&mut self, position: usize, item: T) -> PluginResult<T> {
        let len = self.stack.len();
        let slot = self
            .stack
            .get_mut(position)
            .ok_or(PluginError::OutOfRange { position, len })?;
        Ok(std::mem::replace(slot, item))
    }

    /// Puts `item` on top.
    pub fn push(&mut self, item: T) {
        self.stack.push(item);
    }

    pub fn extend(&mut self, items: impl IntoIterator<Item = T>) {
        self.stack.extend(items);
    }

    /// Inserts at `position`; positions past the top append.
    pub fn insert(&mut self, position: usize, item: T) {
        let position = position.min(self.stack.len());
        self.stack.insert(position, item);
    }

    pub fn remove_at(&mut self, position: usize) -> Option<T> {
        (position < self.stack.len()).then(|| self.stack.remove(position))
    }

    pub fn clear(&mut self) {
        self.stack.clear();
    }

    /// Takes up to `n` items off the top, topmost first.
    pub fn pop(&mut self, n: usize) -> Vec<T> {
        let keep = self.stack.len().saturating_sub(n);
        let mut taken = self.stack.split_off(keep);
        taken.reverse();
        taken
    }

    /// The top `n` items without removing them, in stack order with the top
    /// item last.
    pub fn peek(&self, n: usize) -> &[T] {
        let start = self.stack.len().saturating_sub(n);
        &self.stack[start..]
    }

    /// A random order for [`reorder`](Self::reorder).
    pub fn plan_shuffle<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.stack.len()).collect();
        order.shuffle(rng);
        order
    }

    /// Rearranges the stack so that position `i` holds the item previously at
    /// `order[i]`. `order` must be a permutation of the current positions.
    pub fn reorder(&mut self, order: &[usize]) -> PluginResult<()> {
        let len = self.stack.len();
        let mut seen = vec![false; len];
        for &position in order {
            match seen.get_mut(position) {
                Some(slot) if !*slot => *slot = true,
                _ => return Err(PluginError::NotAPermutation { len }),
            }
        }
        if order.len() != len {
            return Err(PluginError::NotAPermutation { len });
        }

        let mut old: Vec<Option<T>> = self.stack.drain(..).map(Some).collect();
        self.stack = order.iter().filter_map(|&position| old[position].take()).collect();
        Ok(())
    }

    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.stack.shuffle(rng);
    }

    /// Positions for [`take_at`](Self::take_at) drawing up to `n` items at
    /// random. Each position refers to the stack left by the previous ones.
    pub fn plan_pick<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<usize> {
        let len = self.stack.len();
        (0..n.min(len)).map(|drawn| rng.gen_range(0..len - drawn)).collect()
    }

    /// Removes items one at a time at each of `positions`. Nothing is removed
    /// when any position is out of range.
    pub fn take_at(&mut self, positions: &[usize]) -> PluginResult<Vec<T>> {
        let len = self.stack.len();
        for (drawn, &position) in positions.iter().enumerate() {
            let remaining = len.saturating_sub(drawn);
            if position >= remaining {
                return Err(PluginError::OutOfRange { position, len: remaining });
            }
        }
        Ok(positions.iter().map(|&position| self.stack.remove(position)).collect())
    }

    /// Removes up to `n` items from random positions.
    pub fn pick<R: Rng + ?Sized>(&mut self, n: usize, rng: &mut R) -> Vec<T> {
        let positions = self.plan_pick(n, rng);
        positions.into_iter().map(|position| self.stack.remove(position)).collect()
    }

    /// Up to `n` distinct items chosen at random. The pile is unchanged.
    pub fn sample<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<&T> {
        let k = n.min(self.stack.len());
        index::sample(rng, self.stack.len(), k)
            .into_iter()
            .map(|position| &self.stack[position])
            .collect()
    }

    /// Up to `n` items chosen at random with repetition. The pile is
    /// unchanged.
    pub fn choices<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<&T> {
        (0..n.min(self.stack.len()))
            .filter_map(|_| self.stack.choose(rng))
            .collect()
    }
}

impl<T: Filterable> Pile<T> {
    /// Items matching `filter`, bottom to top.
    pub fn list(&self, filter: &Filter) -> Vec<&T> {
        filter.select(&self.stack)
    }

    pub fn count(&self, filter: &Filter) -> usize {
        if filter.is_all() {
            return self.stack.len();
        }
        self.stack.iter().filter(|item| filter.matches(*item)).count()
    }

    /// Positions of the items matching `filter`.
    pub fn find(&self, filter: &Filter) -> Vec<usize> {
        self.stack
            .iter()
            .enumerate()
            .filter(|(_, item)| filter.matches(*item))
            .map(|(position, _)| position)
            .collect()
    }

    /// Removes and returns the items matching `filter`, keeping the order
    /// of the rest.
    pub fn filter(&mut self, filter: &Filter) -> Vec<T> {
        if filter.is_all() {
            return std::mem::take(&mut self.stack);
        }
        let (removed, kept): (Vec<T>, Vec<T>) = std::mem::take(&mut self.stack)
            .into_iter()
            .partition(|item| filter.matches(item));
        self.stack = kept;
        removed
    }
}

impl<T: PartialEq> Pile<T> {
    pub fn contains(&self, item: &T) -> bool {
        self.stack.contains(item)
    }

    /// Removes the lowest item equal to `item`.
    pub fn remove(&mut self, item: &T) -> Option<T> {
        let position = self.stack.iter().position(|x| x == item)?;
        Some(self.stack.remove(position))
    }
}

impl<T> Default for Pile<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Filterable for Pile<T> {
    fn entity(&self) -> &Entity {
        &self.entity
    }
}

impl<'a, T> IntoIterator for &'a Pile<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.stack.iter()
    }
}

impl<T: Serialize> Pile<T> {
    /// Packs the pile into a storable [`Item`] with the same identity. The
    /// stack travels as `data.stack`.
    pub fn to_item(&self) -> PluginResult<Item> {
        let stack = serde_json::to_value(&self.stack)?;
        Ok(Item::from_parts(self.entity.clone(), json!({ "stack": stack })))
    }
}

impl<T: DeserializeOwned> Pile<T> {
    /// Unpacks a pile stored with [`to_item`](Self::to_item).
    pub fn from_item(item: &Item) -> PluginResult<Self> {
        let stack = match item.data().get("stack") {
            Some(stack) => serde_json::from_value(stack.clone())?,
            None if item.data().is_null() => Vec::new(),
            None => {
                return Err(PluginError::InvalidArgument {
                    name: "stack".to_string(),
                    reason: format!("item '{}' does not hold a pile", item.id()),
                });
            }
        };
        Ok(Self {
            entity: item.entity().clone(),
            stack,
        })
    }
}

/// Reads stashed positions written by a `plan_*` call.
pub fn stashed_positions(stash: &ludus_types::Stash, key: &str) -> PluginResult<Vec<usize>> {
    let value = stash.get(key).cloned().unwrap_or(Value::Array(Vec::new()));
    serde_json::from_value(value).map_err(|e| PluginError::InvalidArgument {
        name: key.to_string(),
        reason: e.to_string(),
    })
}
