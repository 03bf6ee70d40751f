//! Durable string-keyed storage slot contract.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SlotResult<T> = Result<T, SlotError>;

/// Storage backend failures.
#[derive(Debug)]
pub enum SlotError {
    /// Write rejected because it would exceed the backend's capacity.
    QuotaExceeded { limit: usize, required: usize },
    /// SQLite transport or schema failure.
    Db(DbError),
}

impl Display for SlotError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QuotaExceeded { limit, required } => write!(
                f,
                "storage quota exceeded: {required} bytes required, {limit} bytes allowed"
            ),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SlotError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for SlotError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for SlotError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// One key/value store holding whole serialized documents.
pub trait StorageSlot {
    /// Reads the raw document stored under `key`, if any.
    fn read(&self, key: &str) -> SlotResult<Option<String>>;

    /// Replaces the document stored under `key`.
    fn write(&mut self, key: &str, value: &str) -> SlotResult<()>;

    /// Removes `key`. Absent keys are not an error.
    fn remove(&mut self, key: &str) -> SlotResult<()>;

    /// Keeps a copy of a raw document that is about to be superseded
    /// (unreadable on load, replaced by an import).
    fn quarantine(&mut self, key: &str, raw: &str, reason: &str) -> SlotResult<()>;
}
