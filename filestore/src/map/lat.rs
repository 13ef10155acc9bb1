use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::map::access::AccessOrder;
use crate::map::index::GuardIndex;
use crate::map::{FileMap, Stored};
use crate::utils::clock::Clock;

/// Unbounded registry that records when each entry was last stored, read or
/// written. Nothing is ever evicted.
pub struct LatFileMap<E> {
    index: GuardIndex<E, AccessOrder>,
}

impl<E> LatFileMap<E> {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        LatFileMap {
            index: GuardIndex::new(AccessOrder::new(clock)),
        }
    }

    pub fn last_access(&self, name: &str) -> Option<DateTime<Utc>> {
        self.index.book().last_access(name)
    }
}

impl<E: Send + Sync> FileMap<E> for LatFileMap<E> {
    fn contains(&self, name: &str) -> bool {
        self.index.contains(name)
    }

    fn load_or_store<T, X, F>(&self, name: &str, entry: E, init: F) -> Result<Stored<T, E>, X>
    where
        F: FnOnce(&str, &mut E) -> Result<T, X>,
    {
        self.index.load_or_store(name, entry, init)
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::clock::ManualClock;
    use chrono::Duration;

    #[test]
    fn test_tracks_access_without_evicting() {
        let clock = Arc::new(ManualClock::default());
        let map = LatFileMap::new(clock.clone());
        let start = clock.now();
        for name in ["a", "b", "c"] {
            map.load_or_store(name, 0u32, |_, _| Ok::<_, ()>(())).unwrap();
        }
        assert_eq!(map.len(), 3);
        assert_eq!(map.last_access("a"), Some(start));

        clock.advance(Duration::seconds(30));
        assert_eq!(map.load_for_read("a", |_, v| *v), Some(0));
        assert_eq!(map.last_access("a"), Some(start + Duration::seconds(30)));
        assert_eq!(map.last_access("b"), Some(start));

        assert_eq!(map.delete("a", |_, _| Ok::<_, ()>(())), Ok(true));
        assert_eq!(map.last_access("a"), None);
    }
}
