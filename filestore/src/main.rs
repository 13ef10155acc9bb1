use std::fs::File;
use std::io;
use std::path::Path;

use anyhow::{Context, bail};
use chrono::{DateTime, Utc};
use clap::Parser;
use filestore::config::{StoreConfig, StoreKind};
use filestore::store::{self, FileOps};
use filestore::utils::cli::{Args, Command};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing_subscriber::EnvFilter;

#[derive(Serialize)]
struct FileReport {
    name: String,
    state: String,
    path: String,
    size: u64,
    modified: String,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let config = args.store_config()?;
    let store = store::open(&config)?;
    store
        .reload(&config.file_states())
        .with_context(|| format!("failed to reload {}", config.root.display()))?;

    match args.command {
        Command::List => {
            for name in store.list() {
                let state = store
                    .state_of(&name)
                    .map(|s| state_label(&config, &s))
                    .unwrap_or_else(|| "-".to_string());
                println!("{state}\t{name}");
            }
        }
        Command::Stat { name } => {
            let report = report(&config, store.as_ref(), &name)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Import { path, name, state } => {
            let name = match name {
                Some(name) => name,
                None => default_name(&config, &path)?,
            };
            let state = match state {
                Some(state) => config.state(&state)?,
                None => config.file_states().remove(0),
            };
            let mut src =
                File::open(&path).with_context(|| format!("failed to open {}", path.display()))?;
            let size = store.import_file(&name, &state, &mut src)?;
            println!("{name}\t{size}");
        }
        Command::Move { name, from, to } => {
            store.move_file(&name, &config.state(&from)?, &config.state(&to)?)?;
        }
        Command::Delete { name } => {
            store.delete_file(&name)?;
        }
    }
    Ok(())
}

fn state_label(config: &StoreConfig, state: &filestore::FileState) -> String {
    config
        .state_name(state)
        .map(str::to_string)
        .unwrap_or_else(|| state.to_string())
}

fn report(config: &StoreConfig, store: &dyn FileOps, name: &str) -> anyhow::Result<FileReport> {
    let info = store.stat(name)?;
    let Some(state) = store.state_of(name) else {
        bail!("{name} was removed while reading it");
    };
    let modified: DateTime<Utc> = info.modified.into();
    Ok(FileReport {
        name: name.to_string(),
        state: state_label(config, &state),
        path: store.path(name)?.display().to_string(),
        size: info.size,
        modified: modified.to_rfc3339(),
    })
}

/// CAS stores name files by the sha256 of their content, others by file name.
fn default_name(config: &StoreConfig, path: &Path) -> anyhow::Result<String> {
    if config.kind == StoreKind::Cas {
        let mut file = File::open(path)?;
        let mut hasher = Sha256::new();
        io::copy(&mut file, &mut hasher)?;
        return Ok(hex::encode(hasher.finalize()));
    }
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .with_context(|| format!("cannot derive a name from {}", path.display()))
}
