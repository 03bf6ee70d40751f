//! Domain model for tasks, ledger transactions and notes.
//!
//! # Responsibility
//! - Define canonical data structures owned by the entity store.
//! - Keep the wire shape (camelCase JSON) stable across storage and backups.
//!
//! # Invariants
//! - Every entity is identified by an opaque, unique `EntityId`.
//! - Deletion is a hard removal; there are no tombstones.
//! - Unrecognized fields are carried in `extra` and written back unchanged.

pub mod note;
pub mod state;
pub mod task;
pub mod transaction;

/// Opaque identifier shared by every entity kind.
pub type EntityId = String;

/// Unrecognized JSON fields preserved through save/load cycles.
pub type ExtraFields = serde_json::Map<String, serde_json::Value>;

/// Serde helper for optional calendar dates where `""` means absent.
pub(crate) mod optional_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(date) => serializer.serialize_str(&date.format("%Y-%m-%d").to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}
