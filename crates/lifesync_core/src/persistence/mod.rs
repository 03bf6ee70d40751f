//! Durable storage for the application state.
//!
//! # Responsibility
//! - Define the storage slot contract and its backends.
//! - Own the load/repair and save cycle of the state document.
//!
//! # Invariants
//! - Storage failures never crash the in-memory session.

pub mod gateway;
pub mod memory;
pub mod slot;
pub mod sqlite;

pub use gateway::{LoadOutcome, LoadSource, PersistError, PersistenceGateway, DEFAULT_STORAGE_KEY};
pub use memory::MemorySlot;
pub use slot::{SlotError, SlotResult, StorageSlot};
pub use sqlite::SqliteSlot;
