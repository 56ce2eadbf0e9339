//! The ordered record of committed action calls.

use ludus_types::{Args, Stash};
use serde::{Deserialize, Serialize};

/// One accepted call: replaying it with its stash reproduces the call
/// without running init handlers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub action: String,
    #[serde(default)]
    pub args: Args,
    #[serde(default)]
    pub stash: Stash,
}

/// Journal plus the undo depth: how many trailing entries are still revocable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Journal {
    entries: Vec<JournalEntry>,
    undoable: usize,
}

impl Journal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn append(&mut self, entry: JournalEntry) {
        self.entries.push(entry);
        self.undoable += 1;
    }

    /// Drops every entry past `len`. The undo depth is left to the caller.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }

    /// Limits the undo depth to at most `n`.
    pub fn commit(&mut self, n: usize) {
        self.undoable = self.undoable.min(n);
    }

    /// Removes and returns every entry no longer revocable.
    pub fn trim(&mut self) -> Vec<JournalEntry> {
        let keep = self.undoable.min(self.entries.len());
        let cut = self.entries.len() - keep;
        self.entries.drain(..cut).collect()
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn undoable(&self) -> usize {
        self.undoable
    }

    pub(crate) fn set_undoable(&mut self, undoable: usize) {
        self.undoable = undoable;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> JournalEntry {
        JournalEntry {
            action: name.to_string(),
            args: Args::new(),
            stash: Stash::new(),
        }
    }

    #[test]
    fn append_counts_undoable() {
        let mut j = Journal::new();
        j.append(entry("a"));
        j.append(entry("b"));
        assert_eq!(j.len(), 2);
        assert_eq!(j.undoable(), 2);
    }

    #[test]
    fn commit_only_lowers() {
        let mut j = Journal::new();
        j.append(entry("a"));
        j.commit(5);
        assert_eq!(j.undoable(), 1);
        j.commit(0);
        assert_eq!(j.undoable(), 0);
    }

    #[test]
    fn trim_keeps_revocable_tail() {
        let mut j = Journal::new();
        for n in ["a", "b", "c"] {
            j.append(entry(n));
        }
        j.commit(1);
        let trimmed = j.trim();
        assert_eq!(trimmed.len(), 2);
        assert_eq!(j.entries()[0].action, "c");
    }

    #[test]
    fn truncate_drops_tail() {
        let mut j = Journal::new();
        for n in ["a", "b", "c"] {
            j.append(entry(n));
        }
        j.truncate(1);
        j.set_undoable(1);
        assert_eq!(j.len(), 1);
        assert_eq!(j.entries()[0].action, "a");
        assert_eq!(j.undoable(), 1);
    }
}
