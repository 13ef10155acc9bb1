use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::map::access::AccessOrder;
use crate::map::index::{GuardIndex, TryDelete};
use crate::map::{FileMap, Stored};
use crate::utils::clock::Clock;

/// Deletion callback run on an entry chosen for eviction. Returning `Ok`
/// retracts the entry; an error leaves it registered.
pub type Evictor<E> = Box<dyn Fn(&str, &mut E) -> Result<(), StoreError> + Send + Sync>;

/// Registry holding at most `capacity` entries, evicting the least recently
/// used ones when an insert pushes it over.
///
/// Eviction never waits: an entry that is locked by someone else is skipped
/// and the next least recently used one is tried. If every candidate is busy
/// the new entry is still admitted and the map stays over capacity until a
/// later insert catches up.
pub struct LruFileMap<E> {
    index: GuardIndex<E, AccessOrder>,
    capacity: usize,
    evictor: Evictor<E>,
}

impl<E> LruFileMap<E> {
    pub fn new(capacity: usize, clock: Arc<dyn Clock>, evictor: Evictor<E>) -> Self {
        LruFileMap {
            index: GuardIndex::new(AccessOrder::new(clock)),
            capacity,
            evictor,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Time `name` was last stored, read or written.
    pub fn last_access(&self, name: &str) -> Option<DateTime<Utc>> {
        self.index.book().last_access(name)
    }

    /// Evicts entries until the map is back within capacity or it runs out
    /// of candidates. Each candidate is tried at most once.
    fn evict(&self, inserted: &str) {
        let mut skipped = HashSet::new();
        while self.index.len() > self.capacity {
            let Some(candidate) = self.index.book().next_candidate(inserted, &skipped) else {
                tracing::debug!(
                    "over capacity after inserting {inserted}: {} > {}",
                    self.index.len(),
                    self.capacity
                );
                return;
            };
            match self.index.try_delete(&candidate, |name, entry| (self.evictor)(name, entry)) {
                TryDelete::Retracted => tracing::debug!("evicted {candidate}"),
                TryDelete::Absent => {}
                TryDelete::Busy => tracing::trace!("skipped busy eviction candidate {candidate}"),
                TryDelete::Kept(err) => tracing::warn!("failed to evict {candidate}: {err}"),
            }
            skipped.insert(candidate);
        }
    }
}

impl<E: Send + Sync> FileMap<E> for LruFileMap<E> {
    fn contains(&self, name: &str) -> bool {
        self.index.contains(name)
    }

    fn load_or_store<T, X, F>(&self, name: &str, entry: E, init: F) -> Result<Stored<T, E>, X>
    where
        F: FnOnce(&str, &mut E) -> Result<T, X>,
    {
        let stored = self.index.load_or_store(name, entry, init)?;
        if !stored.is_loaded() {
            self.evict(name);
        }
        Ok(stored)
    }

    fn load_for_read<T, F>(&self, name: &str, f: F) -> Option<T>
    where
        F: FnOnce(&str, &E) -> T,
    {
        self.index.load_for_read(name, f)
    }

    fn load_for_write<T, F>(&self, name: &str, f: F) -> Option<T>
    where
        F: FnOnce(&str, &mut E) -> T,
    {
        self.index.load_for_write(name, f)
    }

    fn delete<X, F>(&self, name: &str, f: F) -> Result<bool, X>
    where
        F: FnOnce(&str, &mut E) -> Result<(), X>,
    {
        self.index.delete(name, f)
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn names(&self) -> Vec<String> {
        self.index.names()
    }
}
