use std::fs::{self, File};
use std::io::{self, Cursor, Read};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use filestore::config::{StoreConfig, StoreKind};
use filestore::store::{self, CasFileStore, FileOps, LocalFileStore, LruFileStore};
use filestore::utils::clock::{Clock, ManualClock};
use filestore::{FileState, StoreError};
use tempfile::TempDir;

const DIGEST: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

struct Env {
    dir: TempDir,
    upload: FileState,
    cache: FileState,
}

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::default())
}

fn write_aged(path: &Path, age: Duration) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let file = File::create(path).unwrap();
    file.set_modified(SystemTime::now() - age).unwrap();
}

fn env() -> Env {
    let dir = tempfile::tempdir().unwrap();
    Env {
        upload: FileState::new(dir.path().join("upload")),
        cache: FileState::new(dir.path().join("cache")),
        dir,
    }
}

/// Fails after handing out a few bytes.
struct BrokenReader {
    sent: bool,
}

impl Read for BrokenReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.sent {
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, "peer went away"));
        }
        self.sent = true;
        buf[..4].copy_from_slice(b"half");
        Ok(4)
    }
}

fn lifecycle(store: &dyn FileOps, env: &Env, name: &str) {
    store.create_file(name, &env.upload, 16).unwrap();
    assert!(store.contains(name));
    assert_eq!(store.state_of(name), Some(env.upload.clone()));
    assert_eq!(store.stat(name).unwrap().size, 16);
    assert!(store.path(name).unwrap().starts_with(env.upload.dir()));

    let err = store.create_file(name, &env.cache, 0).unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists { .. }), "{err}");

    let err = store.move_file(name, &env.cache, &env.upload).unwrap_err();
    assert!(matches!(err, StoreError::WrongState { .. }), "{err}");
    let err = store.move_file(name, &env.upload, &env.upload).unwrap_err();
    assert!(matches!(err, StoreError::InvalidStateTransition { .. }), "{err}");

    store.move_file(name, &env.upload, &env.cache).unwrap();
    assert_eq!(store.state_of(name), Some(env.cache.clone()));
    let path = store.path(name).unwrap();
    assert!(path.starts_with(env.cache.dir()));
    assert!(path.exists());

    store.delete_file(name).unwrap();
    assert!(!store.contains(name));
    assert!(!path.exists());
    assert!(store.delete_file(name).unwrap_err().is_not_found());
    assert!(store.stat(name).unwrap_err().is_not_found());
    assert!(store.path(name).unwrap_err().is_not_found());
    let err = store.move_file(name, &env.upload, &env.cache).unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)), "{err}");
}

#[test]
fn local_store_lifecycle() {
    let env = env();
    lifecycle(&LocalFileStore::local(clock()), &env, "layer.tar");
}

#[test]
fn cas_store_lifecycle() {
    let env = env();
    let store = CasFileStore::cas(clock());
    lifecycle(&store, &env, DIGEST);

    store.create_file(DIGEST, &env.upload, 0).unwrap();
    let expected = env.upload.dir().join("2c").join("f2").join(DIGEST);
    assert_eq!(store.path(DIGEST).unwrap(), expected);
}

#[test]
fn lru_store_lifecycle() {
    let env = env();
    let store = LruFileStore::lru(8, clock());
    lifecycle(&store, &env, "layer.tar");
}

#[test]
fn rejects_invalid_names() {
    let env = env();
    let err = LocalFileStore::local(clock())
        .create_file("../escape", &env.upload, 0)
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidName(_)), "{err}");

    let err = CasFileStore::cas(clock())
        .create_file("layer.tar", &env.upload, 0)
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidName(_)), "{err}");
}

#[test]
fn import_copies_content() {
    let env = env();
    let store = LocalFileStore::local(clock());
    let size = store
        .import_file("config.json", &env.upload, &mut Cursor::new(b"{}\n".to_vec()))
        .unwrap();
    assert_eq!(size, 3);
    assert_eq!(fs::read(store.path("config.json").unwrap()).unwrap(), b"{}\n");

    let err = store
        .import_file("config.json", &env.upload, &mut Cursor::new(Vec::new()))
        .unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists { .. }), "{err}");
}

#[test]
fn failed_import_leaves_nothing_behind() {
    let env = env();
    let store = LocalFileStore::local(clock());
    let err = store
        .import_file("partial", &env.upload, &mut BrokenReader { sent: false })
        .unwrap_err();
    assert!(matches!(err, StoreError::Io(_)), "{err}");
    assert!(!store.contains("partial"));
    assert!(!env.upload.dir().join("partial").exists());

    // The name is free again.
    store.create_file("partial", &env.upload, 0).unwrap();
}

#[test]
fn delete_tolerates_missing_backing_file() {
    let env = env();
    let store = LocalFileStore::local(clock());
    store.create_file("gone", &env.cache, 0).unwrap();
    fs::remove_file(store.path("gone").unwrap()).unwrap();

    store.delete_file("gone").unwrap();
    assert!(!store.contains("gone"));
}

#[test]
fn lru_store_removes_evicted_files() {
    let env = env();
    let store = LruFileStore::lru(2, clock());
    for name in ["a", "b", "c"] {
        store.create_file(name, &env.cache, 0).unwrap();
    }
    assert_eq!(store.list(), vec!["b", "c"]);
    assert!(!env.cache.dir().join("a").exists());
}

#[test]
fn reload_registers_files_on_disk() {
    let env = env();
    {
        let store = CasFileStore::cas(clock());
        store.create_file(DIGEST, &env.cache, 4).unwrap();
        store.create_file(&DIGEST.replace('2', "3"), &env.upload, 0).unwrap();
    }
    // Stray files outside the digest layout are ignored.
    fs::write(env.cache.dir().join("README"), "").unwrap();

    let store = CasFileStore::cas(clock());
    assert!(store.list().is_empty());
    let loaded = store.reload(&[env.upload.clone(), env.cache.clone()]).unwrap();
    assert_eq!(loaded, 2);
    assert_eq!(store.state_of(DIGEST), Some(env.cache.clone()));
    assert_eq!(store.stat(DIGEST).unwrap().size, 4);
}

#[test]
fn reload_keeps_first_state_for_duplicates() {
    let env = env();
    for state in [&env.upload, &env.cache] {
        fs::create_dir_all(state.dir()).unwrap();
        fs::write(state.dir().join("dup"), "").unwrap();
    }

    let store = LocalFileStore::local(clock());
    let loaded = store.reload(&[env.cache.clone(), env.upload.clone()]).unwrap();
    assert_eq!(loaded, 1);
    assert_eq!(store.state_of("dup"), Some(env.cache.clone()));
}

#[test]
fn lru_reload_keeps_newest_files() {
    let env = env();
    write_aged(&env.cache.dir().join("z_old"), Duration::from_secs(600));
    write_aged(&env.cache.dir().join("m_mid"), Duration::from_secs(300));
    write_aged(&env.upload.dir().join("a_new"), Duration::from_secs(0));

    let store = LruFileStore::lru(2, clock());
    let loaded = store.reload(&[env.upload.clone(), env.cache.clone()]).unwrap();
    assert_eq!(loaded, 3);

    // Files register oldest first, so the oldest one is evicted.
    assert_eq!(store.list(), vec!["a_new", "m_mid"]);
    assert!(!env.cache.dir().join("z_old").exists());
    assert!(env.upload.dir().join("a_new").exists());
}

#[test]
fn local_store_tracks_last_access() {
    let env = env();
    let clock = clock();
    let store = LocalFileStore::local(clock.clone());
    let start = clock.now();
    store.create_file("layer.tar", &env.upload, 0).unwrap();
    assert_eq!(store.map().last_access("layer.tar"), Some(start));

    clock.advance(chrono::Duration::minutes(5));
    store.stat("layer.tar").unwrap();
    assert_eq!(
        store.map().last_access("layer.tar"),
        Some(start + chrono::Duration::minutes(5))
    );

    store.delete_file("layer.tar").unwrap();
    assert_eq!(store.map().last_access("layer.tar"), None);
}

#[test]
fn open_builds_store_from_config() {
    let env = env();
    let mut config = StoreConfig::new(env.dir.path(), StoreKind::Lru);
    assert!(matches!(store::open(&config), Err(StoreError::Config(_))));

    config.capacity = Some(1);
    let store = store::open(&config).unwrap();
    let cache = config.state("cache").unwrap();
    store.create_file("one", &cache, 0).unwrap();
    store.create_file("two", &cache, 0).unwrap();
    assert_eq!(store.list(), vec!["two"]);

    let store = store::open(&config).unwrap();
    assert_eq!(store.reload(&config.file_states()).unwrap(), 1);
    assert!(store.contains("two"));
}
