//! Visited-passage history and the owned session context.
//!
//! [`History`] is the authoritative record of shown passages. In replace
//! mode its last entry is always the passage on screen. [`Session`] bundles
//! it with the author-defined [`StateBag`] so the pair can be checkpointed,
//! saved, and restored as a unit.

extern crate alloc;

use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::error::StoryError;

/// Author-defined session state. Opaque to the player.
pub type StateBag = serde_json::Map<alloc::string::String, serde_json::Value>;

/// Ordered list of visited passage ids.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct History {
    entries: Vec<u32>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<u32>) -> Self {
        Self { entries }
    }

    /// Id of the most recent entry.
    pub fn current_id(&self) -> Result<u32, StoryError> {
        self.entries.last().copied().ok_or(StoryError::EmptyHistory)
    }

    /// Push `id` and return the new length.
    pub fn append(&mut self, id: u32) -> usize {
        self.entries.push(id);
        self.entries.len()
    }

    /// Drop every entry after `index`. Out-of-range indices are a no-op.
    pub fn truncate_after(&mut self, index: usize) {
        self.entries.truncate(index.saturating_add(1));
    }

    pub fn snapshot(&self) -> Vec<u32> {
        self.entries.clone()
    }

    pub fn restore_from(&mut self, snapshot: Vec<u32>) {
        self.entries = snapshot;
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[u32] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, u32> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a u32;
    type IntoIter = core::slice::Iter<'a, u32>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Serializable `{state, history}` pair.
///
/// This is both the native-history checkpoint payload and the value carried
/// by restorable tokens.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub state: StateBag,
    pub history: Vec<u32>,
}

/// Checkpoint pushed onto the native history stack.
pub type Checkpoint = SessionSnapshot;

/// Explicitly owned session context: history plus state bag.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Session {
    pub history: History,
    pub state: StateBag,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state.clone(),
            history: self.history.snapshot(),
        }
    }

    pub fn restore_from(&mut self, snapshot: SessionSnapshot) {
        self.state = snapshot.state;
        self.history.restore_from(snapshot.history);
    }

    /// Forget all progress (new game).
    pub fn reset(&mut self) {
        self.state.clear();
        self.history.clear();
    }
}
