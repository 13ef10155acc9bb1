use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use bitflags::bitflags;

use crate::error::Result;

pub mod driver;
pub mod paths;

/// A lifecycle stage of a file. Every state is backed by a directory, and a
/// file in that state lives somewhere below it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FileState {
    dir: PathBuf,
}

impl FileState {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileState { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl fmt::Display for FileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dir.display())
    }
}

bitflags! {
    /// Options for `FileEntry::create`.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct CreateFlags: u32 {
        /// Replace the backing file if it already exists.
        const OVERWRITE = 1;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileInfo {
    pub size: u64,
    pub modified: SystemTime,
}

/// One logical file and the state machine around its backing resource.
///
/// Mutating calls are only made while the owning registry guard is held
/// exclusively, so implementations do not synchronize internally.
pub trait FileEntry: Send + Sync {
    fn name(&self) -> &str;

    fn state(&self) -> &FileState;

    /// Current location of the backing file.
    fn path(&self) -> PathBuf;

    /// Materializes the backing file in `state`, sized to `len` bytes.
    fn create(&mut self, state: &FileState, flags: CreateFlags, len: u64) -> Result<()>;

    /// Relocates the backing file into `state`. Moving to the current state
    /// is rejected with `InvalidStateTransition`.
    fn move_to(&mut self, state: &FileState) -> Result<()>;

    /// Removes the backing file. Calling it twice surfaces the second
    /// removal's I/O error.
    fn delete(&mut self) -> Result<()>;

    fn stat(&self) -> Result<FileInfo>;

    fn open(&self) -> Result<File>;

    fn open_write(&self) -> Result<File>;
}

/// Builds fresh, not-yet-created entries for a naming scheme.
pub trait FileEntryFactory: Send + Sync {
    type Entry: FileEntry;

    fn create(&self, name: &str, state: &FileState) -> Result<Self::Entry>;

    /// Recovers the file name from a path found below `state`.
    fn name_from_path(&self, state: &FileState, path: &Path) -> Result<String>;

    /// Names of all files currently on disk in `state`.
    fn list_names(&self, state: &FileState) -> Result<Vec<String>>;
}
