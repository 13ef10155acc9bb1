use crate::map::index::GuardIndex;
use crate::map::{FileMap, Stored};

/// Registry without a capacity limit.
pub struct SimpleFileMap<E> {
    index: GuardIndex<E>,
}

impl<E> SimpleFileMap<E> {
    pub fn new() -> Self {
        SimpleFileMap {
            index: GuardIndex::new(()),
        }
    }
}

impl<E> Default for SimpleFileMap<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Send + Sync> FileMap<E> for SimpleFileMap<E> {
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
