use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use portscope_collect::{
    CollectError, FileSnapshotStore, InventorySource, MemorySnapshotStore, RefreshOptions,
    Refresher, Result, SnapshotStore,
};
use portscope_core::{ClassifyOptions, format_title};

fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("core")
        .join("tests")
        .join("fixtures")
        .join(name);
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()))
}

/// Source replaying the recorded dev-machine fixtures.
struct FixtureSource {
    listing_fails: AtomicBool,
    args_fails: bool,
}

impl FixtureSource {
    fn new() -> Self {
        Self {
            listing_fails: AtomicBool::new(false),
            args_fails: false,
        }
    }
}

impl InventorySource for FixtureSource {
    fn list_sockets(&self) -> Result<String> {
        if self.listing_fails.load(Ordering::SeqCst) {
            return Err(CollectError::SourceUnavailable("lsof not found".into()));
        }
        Ok(fixture("lsof-dev-machine.txt"))
    }

    fn lookup_args(&self, _pids: &[u32]) -> Result<String> {
        if self.args_fails {
            return Err(CollectError::LookupFailed("ps timed out".into()));
        }
        Ok(fixture("ps-dev-machine.txt"))
    }

    fn lookup_cwd(&self, pid: u32) -> Result<String> {
        match pid {
            412 => Ok("p412\nfcwd\nn/Users/dev/projects/web\n".into()),
            418 => Ok("p418\nfcwd\nn/Users/dev/projects/ui\n".into()),
            901 => Err(CollectError::LookupFailed("timed out".into())),
            _ => Ok(String::new()),
        }
    }
}

#[test]
fn test_refresh_builds_enriched_snapshot() {
    let refresher = Refresher::new(FixtureSource::new(), RefreshOptions::default());
    let snapshot = refresher.refresh().unwrap();

    assert_eq!(snapshot.pids(), vec![412, 418, 733, 901, 1022, 1500]);
    assert_eq!(snapshot.connection_count(), 9);
    assert!(snapshot.warnings.is_empty());
    assert_eq!(
        snapshot.find(412).unwrap().args.as_deref(),
        Some("node /Users/dev/projects/web/node_modules/.bin/next dev")
    );
    // Exited before the lookup: no args, still listed.
    assert_eq!(snapshot.find(1500).unwrap().args, None);
    // cwd is opt-in.
    assert!(snapshot.processes.iter().all(|p| p.cwd.is_none()));

    assert_eq!(
        format_title(&snapshot.processes, &ClassifyOptions::default()),
        "3000 · 5173"
    );
}

#[test]
fn test_failed_listing_keeps_previous_snapshot() {
    let store = MemorySnapshotStore::new();
    let refresher = Refresher::new(FixtureSource::new(), RefreshOptions::default());

    let first = refresher.refresh_into(&store).unwrap();
    refresher.source().listing_fails.store(true, Ordering::SeqCst);

    let err = refresher.refresh_into(&store).unwrap_err();
    assert!(matches!(err, CollectError::SourceUnavailable(_)));
    assert_eq!(store.get().unwrap(), first);
}

#[test]
fn test_failed_args_lookup_still_publishes() {
    let source = FixtureSource {
        args_fails: true,
        ..FixtureSource::new()
    };
    let snapshot = Refresher::new(source, RefreshOptions::default())
        .refresh()
        .unwrap();

    assert_eq!(snapshot.processes.len(), 6);
    assert!(snapshot.processes.iter().all(|p| p.args.is_none()));
    assert_eq!(snapshot.warnings.len(), 1);
    assert!(snapshot.warnings[0].contains("ps timed out"));
}

#[test]
fn test_cwd_lookups_fill_what_resolves() {
    let options = RefreshOptions {
        resolve_cwd: true,
        cwd_jobs: Some(3),
    };
    let snapshot = Refresher::new(FixtureSource::new(), options)
        .refresh()
        .unwrap();

    assert_eq!(
        snapshot.find(412).unwrap().cwd.as_deref(),
        Some("/Users/dev/projects/web")
    );
    assert_eq!(
        snapshot.find(418).unwrap().cwd.as_deref(),
        Some("/Users/dev/projects/ui")
    );
    assert_eq!(snapshot.find(901).unwrap().cwd, None);
    assert_eq!(snapshot.find(733).unwrap().cwd, None);
}

#[test]
fn test_malformed_records_become_warnings() {
    struct Malformed;

    impl InventorySource for Malformed {
        fn list_sockets(&self) -> Result<String> {
            Ok(fixture("lsof-malformed.txt"))
        }
        fn lookup_args(&self, _pids: &[u32]) -> Result<String> {
            Ok(String::new())
        }
        fn lookup_cwd(&self, _pid: u32) -> Result<String> {
            Ok(String::new())
        }
    }

    let snapshot = Refresher::new(Malformed, RefreshOptions::default())
        .refresh()
        .unwrap();
    assert_eq!(snapshot.pids(), vec![200, 202]);
    assert_eq!(snapshot.warnings.len(), 4);
}

/// Source whose listing call blocks until released.
struct BlockingSource {
    entered: Mutex<mpsc::Sender<()>>,
    release: Mutex<mpsc::Receiver<()>>,
}

impl InventorySource for BlockingSource {
    fn list_sockets(&self) -> Result<String> {
        self.entered.lock().unwrap().send(()).unwrap();
        self.release.lock().unwrap().recv().unwrap();
        Ok(String::new())
    }

    fn lookup_args(&self, _pids: &[u32]) -> Result<String> {
        Ok(String::new())
    }

    fn lookup_cwd(&self, _pid: u32) -> Result<String> {
        Ok(String::new())
    }
}

#[test]
fn test_concurrent_refresh_is_rejected() {
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let refresher = Arc::new(Refresher::new(
        BlockingSource {
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        },
        RefreshOptions::default(),
    ));

    let background = {
        let refresher = Arc::clone(&refresher);
        std::thread::spawn(move || refresher.refresh())
    };
    entered_rx.recv().unwrap();

    assert!(matches!(
        refresher.refresh(),
        Err(CollectError::RefreshInProgress)
    ));

    release_tx.send(()).unwrap();
    assert!(background.join().unwrap().is_ok());

    // Released: the next cycle runs normally.
    release_tx.send(()).unwrap();
    assert!(refresher.refresh().is_ok());
}

#[test]
fn test_file_store_shares_snapshot_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    let writer = FileSnapshotStore::new(dir.path().to_path_buf());
    let refresher = Refresher::new(FixtureSource::new(), RefreshOptions::default());
    let published = refresher.refresh_into(&writer).unwrap();

    let reader = FileSnapshotStore::new(dir.path().to_path_buf());
    assert_eq!(reader.get().unwrap(), published);

    reader.invalidate().unwrap();
    assert!(writer.get().is_none());
}
