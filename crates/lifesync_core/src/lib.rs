//! Core engine for LifeSync.
//! This crate is the single source of truth for state and persistence
//! invariants of tasks, transactions and notes.

pub mod clock;
pub mod codec;
pub mod config;
pub mod db;
pub mod id;
pub mod logging;
pub mod model;
pub mod persistence;
pub mod query;
pub mod recurrence;
pub mod schema;
pub mod service;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{export_snapshot, import_snapshot, CodecError, ImportedSnapshot};
pub use config::{ConfigError, EngineConfig};
pub use id::{FallbackIds, IdGenerator, RandomUuidIds, SequentialIds, TimestampIds};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::note::{Note, NoteDraft, NotePatch};
pub use model::state::AppState;
pub use model::task::{
    CompletionState, Priority, Recurrence, Task, TaskDraft, TaskPatch, WeekdaySet,
};
pub use model::transaction::{Transaction, TransactionDraft, TransactionType, DEFAULT_CATEGORY};
pub use model::{EntityId, ExtraFields};
pub use persistence::{
    LoadOutcome, LoadSource, MemorySlot, PersistError, PersistenceGateway, SlotError,
    SlotResult, SqliteSlot, StorageSlot, DEFAULT_STORAGE_KEY,
};
pub use query::{DayProgress, FinanceSummary, WEEK_SPAN_DAYS};
pub use schema::RepairReport;
pub use service::life_service::{LifeService, LoadOutcomeSummary};
pub use store::{EntityKind, EntityStore, StoreError, StoreResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
