use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::storage::FileState;
use crate::utils::validation::is_valid_name;

/// Which factory and registry a store is built from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Plain names, unbounded registry.
    #[default]
    Local,
    /// Content-addressed, sharded names, unbounded registry.
    Cas,
    /// Plain names, registry bounded by `capacity`.
    Lru,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub root: PathBuf,
    #[serde(default)]
    pub kind: StoreKind,
    #[serde(default)]
    pub capacity: Option<usize>,
    /// State directory names, relative to `root`.
    #[serde(default = "default_states")]
    pub states: Vec<String>,
}

fn default_states() -> Vec<String> {
    vec!["upload".to_string(), "cache".to_string()]
}

impl StoreConfig {
    pub fn new(root: impl Into<PathBuf>, kind: StoreKind) -> Self {
        StoreConfig {
            root: root.into(),
            kind,
            capacity: None,
            states: default_states(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|err| StoreError::Config(format!("{}: {err}", path.display())))
    }

    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.states.is_empty() {
            errors.push("at least one state is required".to_string());
        }
        let mut seen = HashSet::new();
        for state in &self.states {
            if !is_valid_name(state) {
                errors.push(format!("invalid state name `{state}`"));
            }
            if !seen.insert(state) {
                errors.push(format!("duplicate state `{state}`"));
            }
        }
        match (self.kind, self.capacity) {
            (StoreKind::Lru, None | Some(0)) => {
                errors.push("lru store requires a capacity of at least 1".to_string())
            }
            (StoreKind::Local | StoreKind::Cas, Some(_)) => {
                tracing::warn!("capacity is ignored for {:?} stores", self.kind)
            }
            _ => {}
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(StoreError::Config(errors.join("; ")))
        }
    }

    pub fn state(&self, name: &str) -> Result<FileState> {
        if !self.states.iter().any(|s| s == name) {
            return Err(StoreError::Config(format!("unknown state `{name}`")));
        }
        Ok(FileState::new(self.root.join(name)))
    }

    pub fn file_states(&self) -> Vec<FileState> {
        self.states
            .iter()
            .map(|name| FileState::new(self.root.join(name)))
            .collect()
    }

    /// Maps a state back to its configured name.
    pub fn state_name(&self, state: &FileState) -> Option<&str> {
        self.states
            .iter()
            .find(|name| self.root.join(name) == state.dir())
            .map(String::as_str)
    }
}
