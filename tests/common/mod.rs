#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use budgetwise_core::{
    config::{Config, ConfigManager},
    core::ledger_manager::LedgerManager,
    ledger::ParticipantId,
    storage::{JsonStorage, MemoryStorage},
};
use once_cell::sync::Lazy;
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

pub fn me() -> ParticipantId {
    ParticipantId::acting_default()
}

/// Unique directory that outlives the calling test.
pub fn temp_base() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    base
}

/// Manager over shared in-memory storage; the handle allows failure injection.
pub fn memory_manager() -> (LedgerManager, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let manager = LedgerManager::load(Box::new(Arc::clone(&storage)), Config::default())
        .expect("load manager over memory storage");
    (manager, storage)
}

/// Creates isolated managers backed by unique directories for each test.
pub fn setup_test_env() -> (LedgerManager, ConfigManager, PathBuf) {
    let base = temp_base();
    let config_manager =
        ConfigManager::with_base_dir(base.clone()).expect("create config manager for temp dir");
    let manager = open_json(&base, config_manager.load().expect("load config"));
    (manager, config_manager, base)
}

pub fn open_json(base: &Path, config: Config) -> LedgerManager {
    let storage = JsonStorage::new(Some(base.to_path_buf())).expect("create json storage backend");
    LedgerManager::load(Box::new(storage), config).expect("load manager over json storage")
}
