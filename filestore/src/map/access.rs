use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use lru::LruCache;

use crate::map::index::Bookkeeping;
use crate::utils::clock::Clock;

/// Access order of the registered keys, least recently used at the back,
/// with the time of each key's last touch.
pub(crate) struct AccessOrder {
    clock: Arc<dyn Clock>,
    order: Mutex<LruCache<String, DateTime<Utc>>>,
}

impl AccessOrder {
    pub(crate) fn new(clock: Arc<dyn Clock>) -> Self {
        AccessOrder {
            clock,
            order: Mutex::new(LruCache::unbounded()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, DateTime<Utc>>> {
        self.order.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn last_access(&self, name: &str) -> Option<DateTime<Utc>> {
        self.lock().peek(name).copied()
    }

    /// Least recently used key that is neither `exclude` nor in `skipped`.
    pub(crate) fn next_candidate(
        &self,
        exclude: &str,
        skipped: &HashSet<String>,
    ) -> Option<String> {
        self.lock()
            .iter()
            .rev()
            .map(|(name, _)| name)
            .find(|name| name.as_str() != exclude && !skipped.contains(name.as_str()))
            .cloned()
    }
}

impl Bookkeeping for AccessOrder {
    fn on_insert(&self, name: &str) {
        let now = self.clock.now();
        self.lock().put(name.to_string(), now);
    }

    fn on_remove(&self, name: &str) {
        self.lock().pop(name);
    }

    fn on_access(&self, name: &str) {
        let now = self.clock.now();
        if let Some(touched) = self.lock().get_mut(name) {
            *touched = now;
        }
    }
}
