pub mod filesystem;

pub use filesystem::{CasFileEntryFactory, LocalFileEntry, LocalFileEntryFactory};
