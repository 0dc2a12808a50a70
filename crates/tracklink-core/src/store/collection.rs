// ── Keyed record collection ──
//
// Concurrent keyed storage with O(1) lookups. Conditional upserts run
// under the `DashMap` entry lock so check-and-write is a single step.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Outcome of a conditional upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Upsert {
    Inserted,
    Replaced,
    Kept,
}

/// A concurrent collection of records keyed by their natural identity.
#[derive(Debug)]
pub(crate) struct RecordCollection<T: Clone + Send + Sync + 'static> {
    by_key: DashMap<String, Arc<T>>,
}

impl<T: Clone + Send + Sync + 'static> RecordCollection<T> {
    pub(crate) fn new() -> Self {
        Self {
            by_key: DashMap::new(),
        }
    }

    /// Insert or replace unconditionally. Returns `true` if the key was new.
    pub(crate) fn upsert(&self, key: String, record: T) -> bool {
        self.by_key.insert(key, Arc::new(record)).is_none()
    }

    /// Insert, or replace only when `accept(stored)` holds.
    ///
    /// The predicate runs while the entry is locked, so concurrent writers
    /// for the same key are serialized.
    pub(crate) fn upsert_if(&self, key: String, record: T, accept: impl FnOnce(&T) -> bool) -> Upsert {
        match self.by_key.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(record));
                Upsert::Inserted
            }
            Entry::Occupied(mut slot) => {
                if accept(slot.get()) {
                    slot.insert(Arc::new(record));
                    Upsert::Replaced
                } else {
                    Upsert::Kept
                }
            }
        }
    }

    /// Apply `f` to the stored record in place. Returns `false` if absent.
    pub(crate) fn update(&self, key: &str, f: impl FnOnce(&mut T)) -> bool {
        match self.by_key.get_mut(key) {
            Some(mut slot) => {
                f(Arc::make_mut(slot.value_mut()));
                true
            }
            None => false,
        }
    }

    pub(crate) fn get(&self, key: &str) -> Option<Arc<T>> {
        self.by_key.get(key).map(|r| Arc::clone(r.value()))
    }

    /// All records, ordered by key.
    pub(crate) fn values(&self) -> Vec<T> {
        let mut entries: Vec<(String, Arc<T>)> = self
            .by_key
            .iter()
            .map(|r| (r.key().clone(), Arc::clone(r.value())))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries.into_iter().map(|(_, v)| T::clone(&v)).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_key.len()
    }
}
