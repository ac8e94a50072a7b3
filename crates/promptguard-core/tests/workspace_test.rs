//! Workspace tests: state store, project lock, and backup manager.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use promptguard_core::config::WorkspaceConfig;
use promptguard_core::hashing::checksum;
use promptguard_core::workspace::{
    BackupManager, BackupOutcome, FileStatus, ProjectLock, ProjectState, StateStore,
    WorkspaceError, WorkspaceLayout,
};
use promptguard_core::{ApiKey, PromptGuardErrorCode, Provider};

fn layout(root: &Path) -> WorkspaceLayout {
    WorkspaceLayout::new(root, &WorkspaceConfig::default())
}

fn fresh_state() -> ProjectState {
    ProjectState::new(
        ApiKey::parse("pg_sk_test_0123456789abcdef").unwrap(),
        "https://api.promptguard.co/api/v1/proxy",
        "PROMPTGUARD_API_KEY",
        BTreeSet::from([Provider::OpenAI]),
    )
}

// ---- State store ----

#[test]
fn load_returns_none_when_uninitialized() {
    let dir = tempfile::tempdir().unwrap();
    let store = StateStore::new(layout(dir.path()));
    assert!(store.load().unwrap().is_none());
    assert!(matches!(
        store.load_required(),
        Err(WorkspaceError::NotInitialized)
    ));
}

#[test]
fn save_then_update_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let store = StateStore::new(layout(dir.path()));
    let mut lock = store.open_lock().unwrap();
    let guard = lock.write().unwrap();

    store.save(&guard, &fresh_state()).unwrap();
    store
        .update(&guard, |s| {
            s.upsert_file("src/app.ts", [Provider::OpenAI], FileStatus::Applied);
            Ok(())
        })
        .unwrap();

    let loaded = store.load_required().unwrap();
    assert_eq!(loaded.status_of("src/app.ts"), Some(FileStatus::Applied));
    assert!(loaded.enabled);
}

#[test]
fn failed_mutation_persists_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let store = StateStore::new(layout(dir.path()));
    let mut lock = store.open_lock().unwrap();
    let guard = lock.write().unwrap();
    store.save(&guard, &fresh_state()).unwrap();

    let result: Result<(), _> = store.update(&guard, |s| {
        s.enabled = false;
        Err(WorkspaceError::NotInitialized)
    });
    assert!(result.is_err());
    assert!(store.load_required().unwrap().enabled);
}

#[test]
fn corrupt_state_is_reported_not_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let l = layout(dir.path());
    fs::create_dir_all(l.state_dir()).unwrap();
    fs::write(l.state_file(), "{ \"version\": 1, \"api_key\": ").unwrap();

    let store = StateStore::new(l.clone());
    let err = store.load().unwrap_err();
    assert_eq!(err.error_code(), "STATE_STORE_CORRUPT");
    assert_eq!(
        fs::read_to_string(l.state_file()).unwrap(),
        "{ \"version\": 1, \"api_key\": "
    );
}

#[test]
fn delete_returns_to_uninitialized() {
    let dir = tempfile::tempdir().unwrap();
    let store = StateStore::new(layout(dir.path()));
    let mut lock = store.open_lock().unwrap();
    let guard = lock.write().unwrap();
    store.save(&guard, &fresh_state()).unwrap();
    store.delete(&guard).unwrap();
    assert!(!store.exists());
    store.delete(&guard).unwrap();
}

// ---- Lock ----

#[test]
fn second_writer_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = layout(dir.path()).lock_file();
    let mut first = ProjectLock::open(&path).unwrap();
    let _held = first.write().unwrap();

    let mut second = ProjectLock::open(&path).unwrap();
    let err = second.write().unwrap_err();
    assert_eq!(err.error_code(), "WORKSPACE_LOCKED");
}

// ---- Backups ----

#[test]
fn backup_is_created_once_and_never_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let l = layout(dir.path());
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::write(dir.path().join("src/app.py"), "original\n").unwrap();

    let store = StateStore::new(l.clone());
    let backups = BackupManager::new(l.clone());
    let mut lock = store.open_lock().unwrap();
    let guard = lock.write().unwrap();

    let first = backups.backup(&guard, "src/app.py").unwrap();
    assert!(matches!(first, BackupOutcome::Created(_)));
    assert_eq!(first.record().checksum, checksum(b"original\n"));
    assert!(l.backup_dir().join("src/app.py").is_file());

    fs::write(dir.path().join("src/app.py"), "modified\n").unwrap();
    let second = backups.backup(&guard, "src/app.py").unwrap();
    assert!(matches!(second, BackupOutcome::Existing(_)));
    assert_eq!(
        fs::read_to_string(l.backup_dir().join("src/app.py")).unwrap(),
        "original\n"
    );
}

#[test]
fn restore_brings_back_original_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let l = layout(dir.path());
    fs::write(dir.path().join("main.ts"), "const a = 1;\r\n// keep\r\n").unwrap();

    let store = StateStore::new(l.clone());
    let backups = BackupManager::new(l.clone());
    let mut lock = store.open_lock().unwrap();
    let guard = lock.write().unwrap();

    backups.backup(&guard, "main.ts").unwrap();
    fs::write(dir.path().join("main.ts"), "changed").unwrap();
    backups.restore(&guard, "main.ts").unwrap();

    assert_eq!(
        fs::read(dir.path().join("main.ts")).unwrap(),
        b"const a = 1;\r\n// keep\r\n"
    );
}

#[test]
fn tampered_blob_aborts_restore_and_leaves_working_file() {
    let dir = tempfile::tempdir().unwrap();
    let l = layout(dir.path());
    fs::write(dir.path().join("main.ts"), "original").unwrap();

    let store = StateStore::new(l.clone());
    let backups = BackupManager::new(l.clone());
    let mut lock = store.open_lock().unwrap();
    let guard = lock.write().unwrap();

    backups.backup(&guard, "main.ts").unwrap();
    fs::write(dir.path().join("main.ts"), "working").unwrap();
    fs::write(l.backup_dir().join("main.ts"), "tampered").unwrap();

    let err = backups.restore(&guard, "main.ts").unwrap_err();
    assert_eq!(err.error_code(), "CHECKSUM_MISMATCH_ON_REVERT");
    assert_eq!(fs::read_to_string(dir.path().join("main.ts")).unwrap(), "working");
    assert!(backups.verify("main.ts").is_err());
}

#[test]
fn restore_without_backup_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let l = layout(dir.path());
    let store = StateStore::new(l.clone());
    let backups = BackupManager::new(l);
    let mut lock = store.open_lock().unwrap();
    let guard = lock.write().unwrap();
    assert!(matches!(
        backups.restore(&guard, "nope.py"),
        Err(WorkspaceError::BackupNotFound(_))
    ));
}

#[test]
fn backup_of_missing_file_is_a_backup_failure() {
    let dir = tempfile::tempdir().unwrap();
    let l = layout(dir.path());
    let store = StateStore::new(l.clone());
    let backups = BackupManager::new(l);
    let mut lock = store.open_lock().unwrap();
    let guard = lock.write().unwrap();
    let err = backups.backup(&guard, "missing.ts").unwrap_err();
    assert_eq!(err.error_code(), "BACKUP_FAILURE");
}

#[test]
fn prune_removes_all_backups() {
    let dir = tempfile::tempdir().unwrap();
    let l = layout(dir.path());
    fs::write(dir.path().join("a.js"), "a").unwrap();
    fs::write(dir.path().join("b.js"), "b").unwrap();

    let store = StateStore::new(l.clone());
    let backups = BackupManager::new(l.clone());
    let mut lock = store.open_lock().unwrap();
    let guard = lock.write().unwrap();
    backups.backup(&guard, "a.js").unwrap();
    backups.backup(&guard, "b.js").unwrap();

    assert_eq!(backups.prune(&guard).unwrap(), 2);
    assert!(backups.records().unwrap().is_empty());
    assert!(!l.backup_dir().exists());
}

#[test]
fn backup_rejects_paths_outside_project() {
    let dir = tempfile::tempdir().unwrap();
    let l = layout(dir.path());
    let store = StateStore::new(l.clone());
    let backups = BackupManager::new(l);
    let mut lock = store.open_lock().unwrap();
    let guard = lock.write().unwrap();
    assert!(matches!(
        backups.backup(&guard, "../outside.ts"),
        Err(WorkspaceError::InvalidPath(_))
    ));
}
