use std::collections::HashSet;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{StoreConfig, StoreKind};
use crate::error::{Result, StoreError};
use crate::map::{FileMap, LatFileMap, LruFileMap, Stored};
use crate::storage::driver::{CasFileEntryFactory, LocalFileEntry, LocalFileEntryFactory};
use crate::storage::{CreateFlags, FileEntry, FileEntryFactory, FileInfo, FileState};
use crate::utils::clock::{Clock, SystemClock};

/// File operations a store exposes, independent of its naming scheme and
/// registry.
pub trait FileOps: Send + Sync {
    fn contains(&self, name: &str) -> bool;

    /// Creates an empty file of `len` bytes in `state`.
    fn create_file(&self, name: &str, state: &FileState, len: u64) -> Result<()>;

    /// Creates a file in `state` holding everything read from `src`. A failed
    /// copy removes the partial file and leaves the name unregistered.
    fn import_file(&self, name: &str, state: &FileState, src: &mut dyn Read) -> Result<u64>;

    /// Moves a file from `from` to `to`. Fails with `WrongState` if the file
    /// is not in `from`.
    fn move_file(&self, name: &str, from: &FileState, to: &FileState) -> Result<()>;

    fn delete_file(&self, name: &str) -> Result<()>;

    fn stat(&self, name: &str) -> Result<FileInfo>;

    fn state_of(&self, name: &str) -> Option<FileState>;

    fn path(&self, name: &str) -> Result<PathBuf>;

    fn list(&self) -> Vec<String>;

    /// Registers every file found on disk in `states`. The registry is not
    /// persisted, so this is how a store picks up where it left off. Files
    /// are registered oldest first by modification time, so a bounded store
    /// keeps the most recently written ones.
    fn reload(&self, states: &[FileState]) -> Result<usize>;
}

/// Removes an entry's backing file. A file that is already gone counts as
/// removed, so the entry can still be retracted.
fn remove_backing<E: FileEntry>(entry: &mut E) -> Result<()> {
    match entry.delete() {
        Err(err) if err.is_not_found() => {
            tracing::warn!("{} was already gone from {}", entry.name(), entry.state());
            Ok(())
        }
        res => res,
    }
}

pub struct FileStore<F, M> {
    factory: F,
    map: M,
}

pub type LocalFileStore = FileStore<LocalFileEntryFactory, LatFileMap<LocalFileEntry>>;
pub type CasFileStore = FileStore<CasFileEntryFactory, LatFileMap<LocalFileEntry>>;
pub type LruFileStore = FileStore<LocalFileEntryFactory, LruFileMap<LocalFileEntry>>;

impl<F, M> FileStore<F, M> {
    pub fn new(factory: F, map: M) -> Self {
        FileStore { factory, map }
    }

    pub fn map(&self) -> &M {
        &self.map
    }
}

impl LocalFileStore {
    pub fn local(clock: Arc<dyn Clock>) -> Self {
        FileStore::new(LocalFileEntryFactory::new(), LatFileMap::new(clock))
    }
}

impl CasFileStore {
    /// Names are hex digests; the first bytes of each digest shard files into
    /// nested directories.
    pub fn cas(clock: Arc<dyn Clock>) -> Self {
        FileStore::new(CasFileEntryFactory::new(), LatFileMap::new(clock))
    }
}

impl LruFileStore {
    /// When more than `capacity` files are registered, the least recently
    /// accessed ones are removed from disk.
    pub fn lru(capacity: usize, clock: Arc<dyn Clock>) -> Self {
        let map = LruFileMap::new(
            capacity,
            clock,
            Box::new(|_: &str, entry: &mut LocalFileEntry| remove_backing(entry)),
        );
        FileStore::new(LocalFileEntryFactory::new(), map)
    }
}

/// Builds the store described by `config`.
pub fn open(config: &StoreConfig) -> Result<Box<dyn FileOps>> {
    config.validate()?;
    let clock = Arc::new(SystemClock);
    let store: Box<dyn FileOps> = match config.kind {
        StoreKind::Local => Box::new(LocalFileStore::local(clock)),
        StoreKind::Cas => Box::new(CasFileStore::cas(clock)),
        StoreKind::Lru => {
            let capacity = config
                .capacity
                .ok_or_else(|| StoreError::Config("missing capacity".to_string()))?;
            Box::new(LruFileStore::lru(capacity, clock))
        }
    };
    tracing::info!("opened {:?} store at {}", config.kind, config.root.display());
    Ok(store)
}

impl<F, M> FileOps for FileStore<F, M>
where
    F: FileEntryFactory,
    M: FileMap<F::Entry>,
{
    fn contains(&self, name: &str) -> bool {
        self.map.contains(name)
    }

    fn create_file(&self, name: &str, state: &FileState, len: u64) -> Result<()> {
        let entry = self.factory.create(name, state)?;
        let stored = self.map.load_or_store(name, entry, |_, entry| {
            entry.create(state, CreateFlags::empty(), len)
        })?;
        match stored {
            Stored::Inserted(()) => Ok(()),
            Stored::Loaded(_) => Err(StoreError::AlreadyExists {
                name: name.to_string(),
                state: state.clone(),
            }),
        }
    }

    fn import_file(&self, name: &str, state: &FileState, src: &mut dyn Read) -> Result<u64> {
        let entry = self.factory.create(name, state)?;
        let stored = self.map.load_or_store(name, entry, |_, entry| {
            entry.create(state, CreateFlags::empty(), 0)?;
            let copied = entry
                .open_write()
                .and_then(|mut file| Ok(io::copy(src, &mut file)?));
            if copied.is_err() {
                if let Err(err) = entry.delete() {
                    tracing::warn!("failed to remove partial {name}: {err}");
                }
            }
            copied
        })?;
        match stored {
            Stored::Inserted(len) => Ok(len),
            Stored::Loaded(_) => Err(StoreError::AlreadyExists {
                name: name.to_string(),
                state: state.clone(),
            }),
        }
    }

    fn move_file(&self, name: &str, from: &FileState, to: &FileState) -> Result<()> {
        self.map
            .load_for_write(name, |_, entry| {
                if entry.state() != from {
                    return Err(StoreError::WrongState {
                        name: name.to_string(),
                        expected: from.clone(),
                        actual: entry.state().clone(),
                    });
                }
                entry.move_to(to)
            })
            .unwrap_or_else(|| Err(StoreError::NotFound(name.to_string())))
    }

    fn delete_file(&self, name: &str) -> Result<()> {
        if self.map.delete(name, |_, entry| remove_backing(entry))? {
            Ok(())
        } else {
            Err(StoreError::NotFound(name.to_string()))
        }
    }

    fn stat(&self, name: &str) -> Result<FileInfo> {
        self.map
            .load_for_read(name, |_, entry| entry.stat())
            .unwrap_or_else(|| Err(StoreError::NotFound(name.to_string())))
    }

    fn state_of(&self, name: &str) -> Option<FileState> {
        self.map.load_for_read(name, |_, entry| entry.state().clone())
    }

    fn path(&self, name: &str) -> Result<PathBuf> {
        self.map
            .load_for_read(name, |_, entry| entry.path())
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    fn list(&self) -> Vec<String> {
        self.map.names()
    }

    fn reload(&self, states: &[FileState]) -> Result<usize> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();
        for state in states {
            for name in self.factory.list_names(state)? {
                if !seen.insert(name.clone()) {
                    tracing::warn!("{name} exists in more than one state, keeping the first");
                    continue;
                }
                let entry = self.factory.create(&name, state)?;
                let modified = entry.stat()?.modified;
                found.push((modified, name, entry));
            }
        }
        found.sort_by_key(|(modified, _, _)| *modified);

        let mut loaded = 0;
        for (_, name, entry) in found {
            let stored = self
                .map
                .load_or_store(&name, entry, |_, entry| entry.stat().map(|_| ()))?;
            if stored.is_loaded() {
                tracing::debug!("{name} is already registered");
            } else {
                loaded += 1;
            }
        }
        tracing::info!("reloaded {loaded} files");
        Ok(loaded)
    }
}
