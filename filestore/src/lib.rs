//! Local file store for a content-distribution agent.
//!
//! Files move through caller-defined states (directories under a root). A
//! concurrent registry tracks every known file and makes sure that, of all
//! the callers racing on the same name, exactly one wins each transition.

pub mod config;
pub mod error;
pub mod map;
pub mod storage;
pub mod store;
pub mod utils;

pub use config::{StoreConfig, StoreKind};
pub use error::StoreError;
pub use map::{FileMap, LatFileMap, LruFileMap, SimpleFileMap, Stored};
pub use storage::{CreateFlags, FileEntry, FileEntryFactory, FileInfo, FileState};
pub use store::{FileOps, FileStore};
