//! In-memory storage slot with an optional byte quota.

use super::slot::{SlotError, SlotResult, StorageSlot};
use std::collections::BTreeMap;

/// Volatile slot store for tests and ephemeral sessions.
///
/// The quota applies to the sum of key and value lengths across all entries,
/// mirroring browser-style storage limits.
#[derive(Debug, Clone, Default)]
pub struct MemorySlot {
    entries: BTreeMap<String, String>,
    quarantined: Vec<QuarantinedDocument>,
    quota_bytes: Option<usize>,
}

/// A raw document set aside by [`StorageSlot::quarantine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuarantinedDocument {
    pub key: String,
    pub raw: String,
    pub reason: String,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot store pre-populated with one document.
    pub fn with_document(key: impl Into<String>, raw: impl Into<String>) -> Self {
        let mut slot = Self::new();
        slot.entries.insert(key.into(), raw.into());
        slot
    }

    pub fn with_quota(mut self, quota_bytes: usize) -> Self {
        self.quota_bytes = Some(quota_bytes);
        self
    }

    /// Raw stored document, bypassing any parsing.
    pub fn raw(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn quarantined(&self) -> &[QuarantinedDocument] {
        &self.quarantined
    }

    fn used_bytes_without(&self, key: &str) -> usize {
        self.entries
            .iter()
            .filter(|(existing, _)| existing.as_str() != key)
            .map(|(existing, value)| existing.len() + value.len())
            .sum()
    }
}

impl StorageSlot for MemorySlot {
    fn read(&self, key: &str) -> SlotResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> SlotResult<()> {
        if let Some(limit) = self.quota_bytes {
            let required = self.used_bytes_without(key) + key.len() + value.len();
            if required > limit {
                return Err(SlotError::QuotaExceeded { limit, required });
            }
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> SlotResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn quarantine(&mut self, key: &str, raw: &str, reason: &str) -> SlotResult<()> {
        self.quarantined.push(QuarantinedDocument {
            key: key.to_string(),
            raw: raw.to_string(),
            reason: reason.to_string(),
        });
        Ok(())
    }
}
