use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{StoreConfig, StoreKind};
use crate::error::Result;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// JSON config file; replaces the store flags below when given
    #[arg(short, long, env = "FILESTORE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Store root path
    #[arg(long, env = "FILESTORE_ROOT", default_value = "/var/lib/filestore")]
    pub root: PathBuf,

    /// Naming scheme and registry type
    #[arg(
        short,
        long,
        env = "FILESTORE_KIND",
        value_enum,
        default_value_t = StoreKind::Local
    )]
    pub kind: StoreKind,

    /// Maximum number of files kept by an lru store
    #[arg(long, env = "FILESTORE_CAPACITY")]
    pub capacity: Option<usize>,

    /// State directory names under the root
    #[arg(
        long = "state",
        env = "FILESTORE_STATES",
        value_delimiter = ',',
        default_values = ["upload", "cache"]
    )]
    pub states: Vec<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List every file with its state
    List,
    /// Print size, state and location of a file as JSON
    Stat {
        #[arg(value_name = "NAME")]
        name: String,
    },
    /// Copy a file into the store
    Import {
        #[arg(value_name = "PATH")]
        path: PathBuf,
        /// Defaults to the file name, or the sha256 digest for cas stores
        #[arg(long)]
        name: Option<String>,
        /// Defaults to the first configured state
        #[arg(long)]
        state: Option<String>,
    },
    /// Move a file between states
    Move {
        #[arg(value_name = "NAME")]
        name: String,
        #[arg(value_name = "FROM")]
        from: String,
        #[arg(value_name = "TO")]
        to: String,
    },
    /// Delete a file
    Delete {
        #[arg(value_name = "NAME")]
        name: String,
    },
}

impl Args {
    pub fn store_config(&self) -> Result<StoreConfig> {
        let config = match &self.config {
            Some(path) => StoreConfig::from_file(path)?,
            None => StoreConfig {
                root: self.root.clone(),
                kind: self.kind,
                capacity: self.capacity,
                states: self.states.clone(),
            },
        };
        config.validate()?;
        Ok(config)
    }
}
