use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Result, StoreError};
use crate::storage::paths::PathLayout;
use crate::storage::{CreateFlags, FileEntry, FileEntryFactory, FileInfo, FileState};

/// A file on local disk. Its state is the directory it currently lives in.
#[derive(Debug)]
pub struct LocalFileEntry {
    name: String,
    state: FileState,
    layout: PathLayout,
}

impl LocalFileEntry {
    fn new(name: &str, state: &FileState, layout: PathLayout) -> Self {
        LocalFileEntry {
            name: name.to_string(),
            state: state.clone(),
            layout,
        }
    }

    fn ensure_parent(path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl FileEntry for LocalFileEntry {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> &FileState {
        &self.state
    }

    fn path(&self) -> PathBuf {
        self.layout.entry_path(&self.state, &self.name)
    }

    fn create(&mut self, state: &FileState, flags: CreateFlags, len: u64) -> Result<()> {
        let path = self.layout.entry_path(state, &self.name);
        Self::ensure_parent(&path)?;

        let mut options = OpenOptions::new();
        options.write(true);
        if flags.contains(CreateFlags::OVERWRITE) {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }
        let file = options.open(&path).map_err(|err| match err.kind() {
            io::ErrorKind::AlreadyExists => StoreError::AlreadyExists {
                name: self.name.clone(),
                state: state.clone(),
            },
            _ => StoreError::Io(err),
        })?;
        file.set_len(len)?;

        self.state = state.clone();
        tracing::trace!("created {} in {}", self.name, state);
        Ok(())
    }

    fn move_to(&mut self, state: &FileState) -> Result<()> {
        if *state == self.state {
            return Err(StoreError::InvalidStateTransition {
                name: self.name.clone(),
                state: state.clone(),
            });
        }
        let source = self.path();
        let target = self.layout.entry_path(state, &self.name);
        Self::ensure_parent(&target)?;
        fs::rename(&source, &target)?;

        tracing::trace!("moved {} from {} to {}", self.name, self.state, state);
        self.state = state.clone();
        Ok(())
    }

    fn delete(&mut self) -> Result<()> {
        fs::remove_file(self.path())?;
        Ok(())
    }

    fn stat(&self) -> Result<FileInfo> {
        let metadata = fs::metadata(self.path())?;
        Ok(FileInfo {
            size: metadata.len(),
            modified: metadata.modified()?,
        })
    }

    fn open(&self) -> Result<File> {
        Ok(File::open(self.path())?)
    }

    fn open_write(&self) -> Result<File> {
        Ok(OpenOptions::new().read(true).write(true).open(self.path())?)
    }
}

/// Names files by their plain name: `<state dir>/<name>`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalFileEntryFactory;

impl LocalFileEntryFactory {
    pub fn new() -> Self {
        LocalFileEntryFactory
    }
}

impl FileEntryFactory for LocalFileEntryFactory {
    type Entry = LocalFileEntry;

    fn create(&self, name: &str, state: &FileState) -> Result<LocalFileEntry> {
        PathLayout::Flat.validate(name)?;
        Ok(LocalFileEntry::new(name, state, PathLayout::Flat))
    }

    fn name_from_path(&self, state: &FileState, path: &Path) -> Result<String> {
        PathLayout::Flat.name_from_path(state, path)
    }

    fn list_names(&self, state: &FileState) -> Result<Vec<String>> {
        PathLayout::Flat.walk(state)
    }
}

/// Content-addressable naming: the name is a hex digest, and its leading
/// bytes shard the file into nested directories.
#[derive(Clone, Copy, Debug, Default)]
pub struct CasFileEntryFactory;

impl CasFileEntryFactory {
    pub fn new() -> Self {
        CasFileEntryFactory
    }
}

impl FileEntryFactory for CasFileEntryFactory {
    type Entry = LocalFileEntry;

    fn create(&self, name: &str, state: &FileState) -> Result<LocalFileEntry> {
        PathLayout::Sharded.validate(name)?;
        Ok(LocalFileEntry::new(name, state, PathLayout::Sharded))
    }

    fn name_from_path(&self, state: &FileState, path: &Path) -> Result<String> {
        PathLayout::Sharded.name_from_path(state, path)
    }

    fn list_names(&self, state: &FileState) -> Result<Vec<String>> {
        PathLayout::Sharded.walk(state)
    }
}
