// PathLayout maps file names to paths inside a state directory.
//
// The layout of a single state directory is roughly as follows:
//
//	<state dir>
//	├── <name>                        (flat layout)
//	└── <shard 0>
//	    └── <shard 1>
//	        └── <hex digest>          (sharded layout)
//
// The sharded layout is used for content-addressable storage: the name is the
// hex digest of the content, and each of its first `SHARD_BYTES` bytes adds
// one directory level, which keeps directory sizes bounded.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Result, StoreError};
use crate::storage::FileState;
use crate::utils::validation::{is_valid_digest, is_valid_name};

/// Number of digest bytes turned into directory levels.
pub const SHARD_BYTES: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathLayout {
    Flat,
    Sharded,
}

impl PathLayout {
    pub fn validate(self, name: &str) -> Result<()> {
        let valid = match self {
            PathLayout::Flat => is_valid_name(name),
            PathLayout::Sharded => is_valid_digest(name, SHARD_BYTES),
        };
        if valid {
            Ok(())
        } else {
            Err(StoreError::InvalidName(name.to_string()))
        }
    }

    /// Returns the path of `name` relative to its state directory,
    /// (e.g. `ab/cd/abcdef01` for the sharded layout). Names are expected to
    /// be validated; shards a name is too short for are left out.
    fn relative_path(self, name: &str) -> PathBuf {
        let mut path = PathBuf::new();
        if self == PathLayout::Sharded {
            for shard in 0..SHARD_BYTES {
                match name.get(shard * 2..shard * 2 + 2) {
                    Some(prefix) => path.push(prefix),
                    None => break,
                }
            }
        }
        path.push(name);
        path
    }

    /// Returns the full path of `name` in `state`,
    /// (e.g. `<state dir>/ab/cd/abcdef01`).
    pub fn entry_path(self, state: &FileState, name: &str) -> PathBuf {
        state.dir().join(self.relative_path(name))
    }

    pub fn name_from_path(self, state: &FileState, path: &Path) -> Result<String> {
        let relative = path
            .strip_prefix(state.dir())
            .map_err(|_| StoreError::UnknownPath(path.to_path_buf()))?;
        let name = relative
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| StoreError::UnknownPath(path.to_path_buf()))?;
        self.validate(name)?;
        if self.relative_path(name) != relative {
            return Err(StoreError::UnknownPath(path.to_path_buf()));
        }
        Ok(name.to_string())
    }

    /// Walks a state directory and returns the names of the files it holds.
    /// A missing state directory holds nothing.
    pub fn walk(self, state: &FileState) -> Result<Vec<String>> {
        let depth = match self {
            PathLayout::Flat => 0,
            PathLayout::Sharded => SHARD_BYTES,
        };
        let mut files = Vec::new();
        collect_files(state.dir(), depth, &mut files)?;

        let mut names = Vec::with_capacity(files.len());
        for path in files {
            match self.name_from_path(state, &path) {
                Ok(name) => names.push(name),
                Err(err) => tracing::debug!("skipping {}: {err}", path.display()),
            }
        }
        names.sort();
        Ok(names)
    }
}

fn collect_files(dir: &Path, depth: usize, out: &mut Vec<PathBuf>) -> io::Result<()> {
    let read_dir = match fs::read_dir(dir) {
        Ok(read_dir) => read_dir,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err),
    };
    for entry in read_dir {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if depth == 0 {
            if file_type.is_file() {
                out.push(entry.path());
            }
        } else if file_type.is_dir() {
            collect_files(&entry.path(), depth - 1, out)?;
        }
    }
    Ok(())
}
