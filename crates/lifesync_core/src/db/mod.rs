//! SQLite file behind `SqliteSlot`.
//!
//! # Responsibility
//! - Open the slot database and keep its two tables (`storage_slots`,
//!   `slot_backups`) at the schema this build understands.
//!
//! # Invariants
//! - The slot schema version lives in `PRAGMA user_version`.
//! - `SqliteSlot` never sees a connection whose migrations did not finish.
//! - A slot file written by a newer build is refused, never downgraded.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Failures while opening or migrating the slot database.
#[derive(Debug)]
pub enum DbError {
    /// The directory meant to hold the slot file could not be created.
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A slot-store migration step failed and was rolled back.
    Migration {
        version: u32,
        name: &'static str,
        source: rusqlite::Error,
    },
    /// The slot file was written by a build with a newer slot schema.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    Sqlite(rusqlite::Error),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CreateDir { path, source } => write!(
                f,
                "cannot create slot directory `{}`: {source}",
                path.display()
            ),
            Self::Migration {
                version,
                name,
                source,
            } => write!(f, "slot store migration {version} ({name}) failed: {source}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "slot store schema version {db_version} comes from a newer build; this build reads up to {latest_supported}"
            ),
            Self::Sqlite(err) => write!(f, "slot store: {err}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateDir { source, .. } => Some(source),
            Self::Migration { source, .. } => Some(source),
            Self::UnsupportedSchemaVersion { .. } => None,
            Self::Sqlite(err) => Some(err),
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
