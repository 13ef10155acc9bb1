use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::map::Stored;
use crate::map::guard::{Guard, Slot};

/// Side bookkeeping kept in step with the index.
///
/// `on_insert` and `on_remove` run while the index is write-locked, so the
/// bookkeeping never disagrees with the index about which keys exist.
/// `on_access` runs while the entry's own lock is held.
pub(crate) trait Bookkeeping: Send + Sync {
    fn on_insert(&self, _name: &str) {}
    fn on_remove(&self, _name: &str) {}
    fn on_access(&self, _name: &str) {}
}

impl Bookkeeping for () {}

/// Outcome of a non-blocking deletion attempt.
pub(crate) enum TryDelete<X> {
    Retracted,
    Absent,
    Busy,
    Kept(X),
}

/// Name to guard index plus the load/store/delete protocol shared by every
/// registry.
///
/// Lock order is entry lock, then index lock, then whatever `B` locks. The
/// index lock is never held while waiting for an entry lock.
pub(crate) struct GuardIndex<E, B = ()> {
    guards: RwLock<HashMap<String, Arc<Guard<E>>>>,
    book: B,
}

impl<E, B: Bookkeeping> GuardIndex<E, B> {
    pub(crate) fn new(book: B) -> Self {
        GuardIndex {
            guards: RwLock::new(HashMap::new()),
            book,
        }
    }

    pub(crate) fn book(&self) -> &B {
        &self.book
    }

    fn read_guards(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<Guard<E>>>> {
        self.guards.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_guards(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<Guard<E>>>> {
        self.guards.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lookup(&self, name: &str) -> Option<Arc<Guard<E>>> {
        self.read_guards().get(name).cloned()
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.read_guards().contains_key(name)
    }

    pub(crate) fn len(&self) -> usize {
        self.read_guards().len()
    }

    pub(crate) fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read_guards().keys().cloned().collect();
        names.sort();
        names
    }

    pub(crate) fn load_or_store<T, X, F>(
        &self,
        name: &str,
        entry: E,
        init: F,
    ) -> Result<Stored<T, E>, X>
    where
        F: FnOnce(&str, &mut E) -> Result<T, X>,
    {
        let mut guards = self.write_guards();
        if guards.contains_key(name) {
            return Ok(Stored::Loaded(entry));
        }
        let guard = Arc::new(Guard::new(entry));
        // Nobody else can reach the guard yet, so this never waits. Holding
        // it across the insert keeps everyone out until init has finished.
        let mut slot = guard.write();
        guards.insert(name.to_string(), guard.clone());
        self.book.on_insert(name);
        drop(guards);

        // A panicking init is rolled back like a failing one, then the panic
        // carries on. The lock is still held here, so it is not poisoned.
        let res = panic::catch_unwind(AssertUnwindSafe(|| init(name, &mut slot.entry)));
        let res = match res {
            Ok(res) => res,
            Err(payload) => {
                self.retract(name, &guard, &mut slot);
                tracing::warn!("init of {name} panicked, rolled back");
                drop(slot);
                panic::resume_unwind(payload);
            }
        };
        match res {
            Ok(value) => {
                tracing::debug!("stored {name}");
                Ok(Stored::Inserted(value))
            }
            Err(err) => {
                self.retract(name, &guard, &mut slot);
                tracing::debug!("init of {name} failed, rolled back");
                Err(err)
            }
        }
    }

    pub(crate) fn load_for_read<T, F>(&self, name: &str, f: F) -> Option<T>
    where
        F: FnOnce(&str, &E) -> T,
    {
        let guard = self.lookup(name)?;
        let slot = guard.read();
        if slot.retracted {
            return None;
        }
        self.book.on_access(name);
        Some(f(name, &slot.entry))
    }

    pub(crate) fn load_for_write<T, F>(&self, name: &str, f: F) -> Option<T>
    where
        F: FnOnce(&str, &mut E) -> T,
    {
        let guard = self.lookup(name)?;
        let mut slot = guard.write();
        if slot.retracted {
            return None;
        }
        self.book.on_access(name);
        Some(f(name, &mut slot.entry))
    }

    pub(crate) fn delete<X, F>(&self, name: &str, f: F) -> Result<bool, X>
    where
        F: FnOnce(&str, &mut E) -> Result<(), X>,
    {
        let Some(guard) = self.lookup(name) else {
            return Ok(false);
        };
        let mut slot = guard.write();
        if slot.retracted {
            return Ok(false);
        }
        f(name, &mut slot.entry)?;
        self.retract(name, &guard, &mut slot);
        tracing::debug!("deleted {name}");
        Ok(true)
    }

    /// Like `delete`, but gives up immediately if the entry is locked.
    pub(crate) fn try_delete<X, F>(&self, name: &str, f: F) -> TryDelete<X>
    where
        F: FnOnce(&str, &mut E) -> Result<(), X>,
    {
        let Some(guard) = self.lookup(name) else {
            return TryDelete::Absent;
        };
        let Some(mut slot) = guard.try_write() else {
            return TryDelete::Busy;
        };
        if slot.retracted {
            return TryDelete::Absent;
        }
        match f(name, &mut slot.entry) {
            Ok(()) => {
                self.retract(name, &guard, &mut slot);
                TryDelete::Retracted
            }
            Err(err) => TryDelete::Kept(err),
        }
    }

    /// Must be called with the guard's write lock held.
    fn retract(&self, name: &str, guard: &Arc<Guard<E>>, slot: &mut Slot<E>) {
        slot.retracted = true;
        let mut guards = self.write_guards();
        if guards.get(name).is_some_and(|g| Arc::ptr_eq(g, guard)) {
            guards.remove(name);
            self.book.on_remove(name);
        }
    }
}
