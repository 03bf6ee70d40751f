//! SQLite-backed storage slot.
//!
//! # Responsibility
//! - Persist slot documents in `storage_slots` with upsert semantics.
//! - Keep superseded documents in `slot_backups` for manual recovery.
//!
//! # Invariants
//! - Connections are obtained through `db::open_db*`, so migrations have run.
//! - One row per key in `storage_slots`.

use super::slot::{SlotResult, StorageSlot};
use crate::db::{open_db, open_db_in_memory};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Maximum number of quarantined copies kept per key.
const MAX_BACKUPS_PER_KEY: i64 = 5;

/// Slot store over a migrated SQLite connection.
pub struct SqliteSlot {
    conn: Connection,
}

impl SqliteSlot {
    /// Opens (or creates) a file-backed slot database.
    pub fn open(path: impl AsRef<Path>) -> SlotResult<Self> {
        Ok(Self {
            conn: open_db(path)?,
        })
    }

    /// Opens a private in-memory slot database.
    pub fn open_in_memory() -> SlotResult<Self> {
        Ok(Self {
            conn: open_db_in_memory()?,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Number of quarantined copies for `key`.
    pub fn backup_count(&self, key: &str) -> SlotResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM slot_backups WHERE key = ?1;",
            [key],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Latest quarantined raw document for `key`.
    pub fn latest_backup(&self, key: &str) -> SlotResult<Option<(String, String)>> {
        let backup = self
            .conn
            .query_row(
                "SELECT value, reason FROM slot_backups
                 WHERE key = ?1
                 ORDER BY created_at DESC, id DESC
                 LIMIT 1;",
                [key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(backup)
    }
}

impl StorageSlot for SqliteSlot {
    fn read(&self, key: &str) -> SlotResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM storage_slots WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn write(&mut self, key: &str, value: &str) -> SlotResult<()> {
        self.conn.execute(
            "INSERT INTO storage_slots (key, value, updated_at)
             VALUES (?1, ?2, strftime('%s', 'now') * 1000)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> SlotResult<()> {
        self.conn
            .execute("DELETE FROM storage_slots WHERE key = ?1;", [key])?;
        Ok(())
    }

    fn quarantine(&mut self, key: &str, raw: &str, reason: &str) -> SlotResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO slot_backups (key, value, reason) VALUES (?1, ?2, ?3);",
            params![key, raw, reason],
        )?;
        tx.execute(
            "DELETE FROM slot_backups
             WHERE key = ?1
               AND id NOT IN (
                   SELECT id FROM slot_backups
                   WHERE key = ?1
                   ORDER BY created_at DESC, id DESC
                   LIMIT ?2
               );",
            params![key, MAX_BACKUPS_PER_KEY],
        )?;
        tx.commit()?;
        Ok(())
    }
}
