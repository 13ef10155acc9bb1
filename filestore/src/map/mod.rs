//! Concurrent name to entry registries.
//!
//! Every key owns its own reader/writer lock, so operations on different keys
//! never wait for each other. The index that maps names to those locks has a
//! separate lock that is only held for lookups, inserts and retractions.
//!
//! Callbacks run on the caller's thread while the key's lock is held:
//! shared for `load_for_read`, exclusive for everything else.

mod access;
mod guard;
mod index;
pub mod lat;
pub mod lru;
pub mod simple;

pub use lat::LatFileMap;
pub use lru::{Evictor, LruFileMap};
pub use simple::SimpleFileMap;

/// Result of `FileMap::load_or_store`.
#[derive(Debug, PartialEq, Eq)]
pub enum Stored<T, E> {
    /// The name was already registered. Carries back the caller's unused entry.
    Loaded(E),
    /// The entry was registered and its initializer succeeded.
    Inserted(T),
}

impl<T, E> Stored<T, E> {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Stored::Loaded(_))
    }
}

pub trait FileMap<E>: Send + Sync {
    /// Whether `name` is currently registered. A key becomes visible the
    /// moment it is inserted, before its initializer has finished.
    fn contains(&self, name: &str) -> bool;

    /// Registers `entry` under `name` unless the name is taken, then runs
    /// `init` with exclusive access. A failing `init` retracts the entry
    /// again before its error is returned unchanged.
    fn load_or_store<T, X, F>(&self, name: &str, entry: E, init: F) -> Result<Stored<T, E>, X>
    where
        F: FnOnce(&str, &mut E) -> Result<T, X>;

    /// Runs `f` with shared access. `None` if `name` is not registered.
    fn load_for_read<T, F>(&self, name: &str, f: F) -> Option<T>
    where
        F: FnOnce(&str, &E) -> T;

    /// Runs `f` with exclusive access. `None` if `name` is not registered.
    fn load_for_write<T, F>(&self, name: &str, f: F) -> Option<T>
    where
        F: FnOnce(&str, &mut E) -> T;

    /// Runs `f` with exclusive access and retracts the entry if it returns
    /// `Ok`. Returns `Ok(false)` without calling `f` if `name` is not
    /// registered, and `f`'s error (entry kept) if it fails.
    fn delete<X, F>(&self, name: &str, f: F) -> Result<bool, X>
    where
        F: FnOnce(&str, &mut E) -> Result<(), X>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted snapshot of the registered names.
    fn names(&self) -> Vec<String>;
}
