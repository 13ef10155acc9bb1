use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, TryLockError};

/// The locked part of a guard: the entry itself and whether it has been
/// retracted from the index.
pub(crate) struct Slot<E> {
    pub(crate) entry: E,
    pub(crate) retracted: bool,
}

/// Per-key reader/writer lock around one entry.
///
/// A guard is created for every insertion and never reused: once `retracted`
/// is set it is unreachable from the index, and a later insertion under the
/// same name gets a fresh guard. Anyone who looked the guard up before the
/// retraction sees the flag after acquiring the lock and must back off.
pub(crate) struct Guard<E> {
    slot: RwLock<Slot<E>>,
}

impl<E> Guard<E> {
    pub(crate) fn new(entry: E) -> Self {
        Guard {
            slot: RwLock::new(Slot {
                entry,
                retracted: false,
            }),
        }
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Slot<E>> {
        self.slot.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Slot<E>> {
        self.slot.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns `None` instead of waiting when someone else holds the lock.
    pub(crate) fn try_write(&self) -> Option<RwLockWriteGuard<'_, Slot<E>>> {
        match self.slot.try_write() {
            Ok(slot) => Some(slot),
            Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }
}
