//! The persisted set of collected places and its storage port.

use std::collections::HashSet;
use std::io;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::place::StableId;

/// Stable ids of every place the user has collected.
///
/// The set only grows during normal use; [`CollectedSet::clear`] is the sole
/// removal path and is reserved for an explicit user request. Membership
/// tests are O(1).
///
/// # Examples
///
/// ```
/// use lumigram_core::{CollectedSet, StableId};
///
/// let mut set = CollectedSet::default();
/// assert!(set.insert(StableId::new("node/1")));
/// assert!(!set.insert(StableId::new("node/1")));
/// assert!(set.contains(&StableId::new("node/1")));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectedSet {
    ids: HashSet<StableId>,
    updated_at: Option<DateTime<Utc>>,
}

impl CollectedSet {
    /// Rebuild a set from persisted parts.
    #[must_use]
    pub fn from_parts<I>(ids: I, updated_at: Option<DateTime<Utc>>) -> Self
    where
        I: IntoIterator<Item = StableId>,
    {
        Self {
            ids: ids.into_iter().collect(),
            updated_at,
        }
    }

    /// Add `id`, returning `true` when it was not already present.
    ///
    /// Re-adding a present id leaves the set and its timestamp untouched.
    pub fn insert(&mut self, id: StableId) -> bool {
        let added = self.ids.insert(id);
        if added {
            self.updated_at = Some(Utc::now());
        }
        added
    }

    /// Whether `id` has been collected.
    #[must_use]
    pub fn contains(&self, id: &StableId) -> bool {
        self.ids.contains(id)
    }

    /// Remove every id.
    pub fn clear(&mut self) {
        self.ids.clear();
        self.updated_at = Some(Utc::now());
    }

    /// Number of collected places.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether nothing has been collected yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Time of the last mutation, if known.
    #[must_use]
    pub const fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Iterate over ids in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &StableId> {
        self.ids.iter()
    }

    /// Ids in lexicographic order, for deterministic output.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<&StableId> {
        let mut ids: Vec<_> = self.ids.iter().collect();
        ids.sort_unstable();
        ids
    }
}

/// Errors raised while persisting a [`CollectedSet`].
///
/// Callers log and swallow these: a failed write never blocks a check-in.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The backing storage could not be written.
    #[error("collected set storage unavailable: {0}")]
    Storage(#[from] io::Error),
    /// The set could not be encoded.
    #[error("failed to encode collected set: {message}")]
    Encode {
        /// Encoder diagnostic.
        message: String,
    },
}

/// Durable storage for the collected set.
///
/// `load` never fails: absent or unreadable content is reported as an empty
/// set so a damaged file cannot lock the user out.
pub trait CollectedStore: Send + Sync {
    /// Read the persisted set, or an empty set when nothing usable exists.
    fn load(&self) -> CollectedSet;

    /// Persist `set`, replacing any previous content.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the write fails.
    fn save(&self, set: &CollectedSet) -> Result<(), PersistenceError>;
}

/// In-memory [`CollectedStore`] for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryCollectedStore {
    inner: Mutex<CollectedSet>,
}

impl MemoryCollectedStore {
    /// Create a store pre-populated with `set`.
    #[must_use]
    pub const fn with_set(set: CollectedSet) -> Self {
        Self {
            inner: Mutex::new(set),
        }
    }

    /// Snapshot of the currently stored set.
    #[must_use]
    pub fn snapshot(&self) -> CollectedSet {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CollectedStore for MemoryCollectedStore {
    fn load(&self) -> CollectedSet {
        self.snapshot()
    }

    fn save(&self, set: &CollectedSet) -> Result<(), PersistenceError> {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        guard.clone_from(set);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn round_trips_through_memory_store() {
        let store = MemoryCollectedStore::default();
        let mut set = CollectedSet::default();
        set.insert(StableId::new("b"));
        set.insert(StableId::new("a"));
        store.save(&set).expect("memory save");

        let loaded = store.load();
        let ids: Vec<_> = loaded.sorted_ids().into_iter().map(StableId::as_str).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[rstest]
    fn duplicate_insert_keeps_timestamp() {
        let mut set = CollectedSet::default();
        set.insert(StableId::new("node/1"));
        let stamped = set.updated_at();
        assert!(!set.insert(StableId::new("node/1")));
        assert_eq!(set.updated_at(), stamped);
        assert_eq!(set.len(), 1);
    }

    #[rstest]
    fn clear_empties_and_stamps() {
        let mut set = CollectedSet::from_parts([StableId::new("node/1")], None);
        set.clear();
        assert!(set.is_empty());
        assert!(set.updated_at().is_some());
    }
}
