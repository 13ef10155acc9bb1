use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::storage::FileState;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("file {name} already exists in state {state}")]
    AlreadyExists { name: String, state: FileState },

    #[error("file {name} is already in state {state}")]
    InvalidStateTransition { name: String, state: FileState },

    #[error("file {name} is in state {actual}, expected {expected}")]
    WrongState {
        name: String,
        expected: FileState,
        actual: FileState,
    },

    #[error("file {0} not found")]
    NotFound(String),

    #[error("invalid file name: {0}")]
    InvalidName(String),

    #[error("path {0} does not belong to any known state")]
    UnknownPath(PathBuf),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl StoreError {
    /// True when the underlying cause is a missing backing file.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Io(err) => err.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
