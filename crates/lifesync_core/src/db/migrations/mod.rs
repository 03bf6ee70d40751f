//! Slot-store schema steps.
//!
//! # Responsibility
//! - List the `storage_slots` / `slot_backups` schema steps in order.
//! - Bring an older slot file up to date in one transaction.
//!
//! # Invariants
//! - Step versions start at 1 and increase by exactly one.
//! - `PRAGMA user_version` always names the last applied step.
//! - A failed step leaves the slot file at its previous version.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct SlotMigration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const SLOT_MIGRATIONS: &[SlotMigration] = &[
    SlotMigration {
        version: 1,
        name: "storage_slots",
        sql: include_str!("0001_storage_slots.sql"),
    },
    SlotMigration {
        version: 2,
        name: "slot_backups",
        sql: include_str!("0002_slot_backups.sql"),
    },
];

/// Slot schema version this build writes.
pub fn latest_version() -> u32 {
    SLOT_MIGRATIONS.last().map_or(0, |step| step.version)
}

/// Upgrades the slot file behind `conn` to [`latest_version`].
///
/// # Errors
/// - `DbError::UnsupportedSchemaVersion` when the file is newer than this build.
/// - `DbError::Migration` naming the step that failed.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from_version = slot_schema_version(conn)?;
    let latest = latest_version();

    if from_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from_version,
            latest_supported: latest,
        });
    }
    if from_version == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for step in SLOT_MIGRATIONS
        .iter()
        .filter(|step| step.version > from_version)
    {
        tx.execute_batch(step.sql)
            .and_then(|()| tx.pragma_update(None, "user_version", step.version))
            .map_err(|source| DbError::Migration {
                version: step.version,
                name: step.name,
                source,
            })?;
        info!(
            "event=slot_migrate_step module=db status=ok version={} name={}",
            step.version, step.name
        );
    }
    tx.commit()?;

    info!(
        "event=slot_migrate module=db status=ok from_version={} to_version={}",
        from_version, latest
    );
    Ok(())
}

fn slot_schema_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_migration_versions_are_contiguous() {
        for (index, step) in SLOT_MIGRATIONS.iter().enumerate() {
            assert_eq!(step.version as usize, index + 1, "step {}", step.name);
        }
    }

    #[test]
    fn failed_step_names_version_and_keeps_previous_schema() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(include_str!("0001_storage_slots.sql"))
            .unwrap();
        conn.execute_batch("CREATE TABLE slot_backups (id INTEGER); PRAGMA user_version = 1;")
            .unwrap();

        let err = apply_migrations(&mut conn).unwrap_err();
        match err {
            DbError::Migration { version, name, .. } => {
                assert_eq!(version, 2);
                assert_eq!(name, "slot_backups");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(slot_schema_version(&conn).unwrap(), 1);
    }
}
