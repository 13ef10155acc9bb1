use std::sync::Arc;
use std::sync::mpsc;
use std::thread;

use chrono::Duration;
use filestore::map::{FileMap, LruFileMap};
use filestore::storage::driver::{LocalFileEntry, LocalFileEntryFactory};
use filestore::utils::clock::ManualClock;
use filestore::{CreateFlags, FileEntry, FileEntryFactory, FileState};
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    state: FileState,
    factory: LocalFileEntryFactory,
    clock: Arc<ManualClock>,
    map: LruFileMap<LocalFileEntry>,
}

impl Fixture {
    fn new(capacity: usize) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::default());
        Fixture {
            state: FileState::new(dir.path().join("cache")),
            _dir: dir,
            factory: LocalFileEntryFactory::new(),
            clock: clock.clone(),
            map: LruFileMap::new(
                capacity,
                clock,
                Box::new(|_: &str, entry: &mut LocalFileEntry| entry.delete()),
            ),
        }
    }

    fn store(&self, name: &str) {
        let entry = self.factory.create(name, &self.state).unwrap();
        let stored = self
            .map
            .load_or_store(name, entry, |_, entry| {
                entry.create(&self.state, CreateFlags::empty(), 0)
            })
            .unwrap();
        assert!(!stored.is_loaded());
        self.clock.advance(Duration::seconds(1));
    }

    fn on_disk(&self, name: &str) -> bool {
        self.state.dir().join(name).exists()
    }
}

#[test]
fn evicts_oldest_file_from_disk() {
    let fixture = Fixture::new(4);
    for i in 0..4 {
        fixture.store(&format!("file{i}"));
    }
    assert_eq!(fixture.map.len(), 4);

    fixture.store("file4");

    assert_eq!(fixture.map.names(), vec!["file1", "file2", "file3", "file4"]);
    assert!(!fixture.map.contains("file0"));
    assert!(!fixture.on_disk("file0"));
    for i in 1..5 {
        assert!(fixture.on_disk(&format!("file{i}")));
    }
}

#[test]
fn reads_and_writes_refresh_recency() {
    let fixture = Fixture::new(3);
    for name in ["a", "b", "c"] {
        fixture.store(name);
    }
    fixture.map.load_for_read("a", |_, entry| entry.stat().unwrap());
    fixture.clock.advance(Duration::seconds(1));
    fixture.map.load_for_write("b", |_, _| ());

    fixture.store("d");

    assert_eq!(fixture.map.names(), vec!["a", "b", "d"]);
    assert!(!fixture.on_disk("c"));
    assert!(fixture.map.last_access("b") > fixture.map.last_access("a"));
}

#[test]
fn skips_file_locked_by_writer() {
    let fixture = Fixture::new(2);
    fixture.store("a");
    fixture.store("b");

    let (locked_tx, locked_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let fixture = &fixture;
    thread::scope(|s| {
        s.spawn(move || {
            fixture.map.load_for_write("a", |_, _| {
                locked_tx.send(()).unwrap();
                release_rx.recv().unwrap();
            });
        });
        locked_rx.recv().unwrap();
        fixture.clock.advance(Duration::seconds(1));
        assert!(fixture.map.load_for_read("b", |_, _| ()).is_some());
        fixture.store("c");
        release_tx.send(()).unwrap();
    });

    // `a` was the oldest but busy, so `b` went instead.
    assert_eq!(fixture.map.names(), vec!["a", "c"]);
    assert!(fixture.on_disk("a"));
    assert!(!fixture.on_disk("b"));
}

#[test]
fn parallel_inserts_keep_map_and_disk_in_sync() {
    const CAPACITY: usize = 10;
    const FILES: usize = 100;

    let fixture = Fixture::new(CAPACITY);
    thread::scope(|s| {
        for i in 0..FILES {
            let fixture = &fixture;
            s.spawn(move || fixture.store(&format!("file{i}")));
        }
    });

    // Nothing held a lock once the inserts were done, but a busy candidate
    // may have been skipped while they ran.
    assert!(fixture.map.len() >= CAPACITY);
    for i in 0..FILES {
        let name = format!("file{i}");
        assert_eq!(fixture.map.contains(&name), fixture.on_disk(&name), "{name}");
    }
}
