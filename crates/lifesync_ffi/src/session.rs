//! Process-wide engine session behind the FFI surface.
//!
//! # Responsibility
//! - Open the engine once per process from `EngineConfig::from_env()`.
//! - Serialize every FFI call through one mutex.
//!
//! # Invariants
//! - Opening never fails: an unusable database degrades to a volatile
//!   in-memory slot, logged as a warning.
//! - A poisoned lock is recovered; the engine state stays consistent because
//!   every mutation completes before the guard is released.

use lifesync_core::{
    EngineConfig, LifeService, MemorySlot, PersistenceGateway, SlotResult, SqliteSlot,
    StorageSlot,
};
use log::{info, warn};
use std::sync::{Mutex, OnceLock, PoisonError};

static SESSION: OnceLock<Mutex<LifeService<SessionSlot>>> = OnceLock::new();

/// Storage backing the FFI session.
pub(crate) enum SessionSlot {
    Sqlite(SqliteSlot),
    Volatile(MemorySlot),
}

impl StorageSlot for SessionSlot {
    fn read(&self, key: &str) -> SlotResult<Option<String>> {
        match self {
            Self::Sqlite(slot) => slot.read(key),
            Self::Volatile(slot) => slot.read(key),
        }
    }

    fn write(&mut self, key: &str, value: &str) -> SlotResult<()> {
        match self {
            Self::Sqlite(slot) => slot.write(key, value),
            Self::Volatile(slot) => slot.write(key, value),
        }
    }

    fn remove(&mut self, key: &str) -> SlotResult<()> {
        match self {
            Self::Sqlite(slot) => slot.remove(key),
            Self::Volatile(slot) => slot.remove(key),
        }
    }

    fn quarantine(&mut self, key: &str, raw: &str, reason: &str) -> SlotResult<()> {
        match self {
            Self::Sqlite(slot) => slot.quarantine(key, raw, reason),
            Self::Volatile(slot) => slot.quarantine(key, raw, reason),
        }
    }
}

/// Runs `f` against the session, opening it on first use.
pub(crate) fn with_session<T>(f: impl FnOnce(&mut LifeService<SessionSlot>) -> T) -> T {
    let session = SESSION.get_or_init(|| Mutex::new(open_session(&EngineConfig::from_env())));
    let mut guard = session.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut guard)
}

fn open_session(config: &EngineConfig) -> LifeService<SessionSlot> {
    let slot = match SqliteSlot::open(&config.db_path) {
        Ok(slot) => {
            info!(
                "event=session_open module=ffi status=ok backend=sqlite db_path={}",
                config.db_path.display()
            );
            SessionSlot::Sqlite(slot)
        }
        Err(err) => {
            warn!(
                "event=session_open module=ffi status=degraded backend=memory db_path={} error={}",
                config.db_path.display(),
                err
            );
            SessionSlot::Volatile(MemorySlot::new())
        }
    };
    LifeService::open(PersistenceGateway::new(slot, config.storage_key.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unusable_database_path_degrades_to_memory() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, "file").unwrap();
        let config = EngineConfig {
            db_path: blocker.join("lifesync.db"),
            ..EngineConfig::default()
        };

        let service = open_session(&config);
        assert!(matches!(service.gateway().slot(), SessionSlot::Volatile(_)));
        assert!(service.state().is_empty());
    }
}
