//! Persistence gateway between the entity store and a storage slot.
//!
//! # Responsibility
//! - Load the full state once at startup, repairing its shape every time.
//! - Write the full state back after every mutation.
//!
//! # Invariants
//! - Loading never fails: absent, unreadable or unparseable documents yield an
//!   empty state.
//! - Unparseable documents are quarantined before they can be overwritten.
//! - A repair that drops records quarantines the original document first.
//! - After a failed read, nothing is written until the stored document has
//!   been read and quarantined.
//! - Save failures are reported to the caller but never alter the state.
//! - The gateway only reads the state it is given.

use super::slot::{SlotError, StorageSlot};
use crate::id::IdGenerator;
use crate::model::state::AppState;
use crate::schema::{repair_document, RepairReport};
use log::{debug, error, info, warn};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Slot key used by default for the state document.
pub const DEFAULT_STORAGE_KEY: &str = "lifesync_data_v1";

/// Where the loaded state came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadSource {
    /// No document was stored yet.
    Missing,
    /// A stored document was parsed (and possibly repaired).
    Stored,
    /// The slot could not be read; started empty.
    Unreadable(String),
    /// The stored document was not valid JSON; started empty.
    Corrupted(String),
}

/// Result of [`PersistenceGateway::load`].
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOutcome {
    pub state: AppState,
    pub source: LoadSource,
    pub report: RepairReport,
}

/// Non-fatal failure to persist the current state.
#[derive(Debug)]
pub enum PersistError {
    Serialize(serde_json::Error),
    Write(SlotError),
    /// The slot was unreadable at load and still cannot be backed up.
    UnverifiedSlot(SlotError),
}

impl Display for PersistError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Serialize(err) => write!(f, "failed to serialize state: {err}"),
            Self::Write(err) => write!(f, "failed to write state: {err}"),
            Self::UnverifiedSlot(err) => write!(
                f,
                "refusing to overwrite a document that could not be read: {err}"
            ),
        }
    }
}

impl Error for PersistError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Serialize(err) => Some(err),
            Self::Write(err) => Some(err),
            Self::UnverifiedSlot(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for PersistError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialize(value)
    }
}

impl From<SlotError> for PersistError {
    fn from(value: SlotError) -> Self {
        Self::Write(value)
    }
}

/// Loads and saves the state document under one stable key.
pub struct PersistenceGateway<S: StorageSlot> {
    slot: S,
    key: String,
    unverified: bool,
}

impl<S: StorageSlot> PersistenceGateway<S> {
    pub fn new(slot: S, key: impl Into<String>) -> Self {
        Self {
            slot,
            key: key.into(),
            unverified: false,
        }
    }

    /// Gateway on the default storage key.
    pub fn with_default_key(slot: S) -> Self {
        Self::new(slot, DEFAULT_STORAGE_KEY)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn slot(&self) -> &S {
        &self.slot
    }

    /// Whether saves are held back because the slot was unreadable at load.
    pub fn is_unverified(&self) -> bool {
        self.unverified
    }

    /// Reads and repairs the stored state.
    pub fn load(&mut self, ids: &dyn IdGenerator) -> LoadOutcome {
        let started_at = Instant::now();
        let raw = match self.slot.read(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                info!(
                    "event=state_load module=persistence status=ok source=missing key={}",
                    self.key
                );
                return LoadOutcome {
                    state: AppState::default(),
                    source: LoadSource::Missing,
                    report: RepairReport::default(),
                };
            }
            Err(err) => {
                error!(
                    "event=state_load module=persistence status=error error_code=slot_read_failed key={} error={}",
                    self.key, err
                );
                self.unverified = true;
                return LoadOutcome {
                    state: AppState::default(),
                    source: LoadSource::Unreadable(err.to_string()),
                    report: RepairReport::default(),
                };
            }
        };

        let document: Value = match serde_json::from_str(&raw) {
            Ok(document) => document,
            Err(err) => {
                error!(
                    "event=state_load module=persistence status=error error_code=parse_failed key={} bytes={} error={}",
                    self.key,
                    raw.len(),
                    err
                );
                self.quarantine_raw(&raw, "unparseable");
                return LoadOutcome {
                    state: AppState::default(),
                    source: LoadSource::Corrupted(err.to_string()),
                    report: RepairReport::default(),
                };
            }
        };

        let (state, report) = repair_document(document, ids);
        if report.dropped_records > 0 {
            self.quarantine_raw(&raw, "lossy_repair");
        }
        if report.is_clean() {
            info!(
                "event=state_load module=persistence status=ok source=stored key={} entities={} duration_ms={}",
                self.key,
                state.len(),
                started_at.elapsed().as_millis()
            );
        } else {
            warn!(
                "event=state_load module=persistence status=repaired source=stored key={} entities={} coerced_collections={:?} dropped_records={} corrected_weekly={} regenerated_ids={} defaulted_fields={}",
                self.key,
                state.len(),
                report.coerced_collections,
                report.dropped_records,
                report.corrected_weekly_completions,
                report.regenerated_ids,
                report.defaulted_fields
            );
        }

        LoadOutcome {
            state,
            source: LoadSource::Stored,
            report,
        }
    }

    /// Serializes `state` and writes it under the gateway key.
    ///
    /// # Errors
    /// - `PersistError::Write` when the slot rejects the write (quota, I/O).
    /// - `PersistError::UnverifiedSlot` when the slot was unreadable at load
    ///   and the stored document still cannot be read and backed up.
    pub fn save(&mut self, state: &AppState) -> Result<(), PersistError> {
        if self.unverified {
            self.verify_before_first_write()?;
        }
        let result = serde_json::to_string(state)
            .map_err(PersistError::from)
            .and_then(|document| {
                self.slot
                    .write(&self.key, &document)
                    .map(|()| document.len())
                    .map_err(PersistError::from)
            });

        match result {
            Ok(bytes) => {
                debug!(
                    "event=state_save module=persistence status=ok key={} bytes={}",
                    self.key, bytes
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=state_save module=persistence status=error error_code=save_failed key={} error={}",
                    self.key, err
                );
                Err(err)
            }
        }
    }

    /// Quarantines the currently stored document, if any.
    pub fn backup_current(&mut self, reason: &str) -> Result<(), PersistError> {
        if let Some(raw) = self.slot.read(&self.key)? {
            self.slot.quarantine(&self.key, &raw, reason)?;
        }
        Ok(())
    }

    fn verify_before_first_write(&mut self) -> Result<(), PersistError> {
        let backed_up = self.slot.read(&self.key).and_then(|stored| match stored {
            Some(raw) => self.slot.quarantine(&self.key, &raw, "unread_at_load"),
            None => Ok(()),
        });
        match backed_up {
            Ok(()) => {
                info!(
                    "event=state_verify module=persistence status=ok key={}",
                    self.key
                );
                self.unverified = false;
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=state_verify module=persistence status=error error_code=slot_still_unreadable key={} error={}",
                    self.key, err
                );
                Err(PersistError::UnverifiedSlot(err))
            }
        }
    }

    fn quarantine_raw(&mut self, raw: &str, reason: &str) {
        match self.slot.quarantine(&self.key, raw, reason) {
            Ok(()) => info!(
                "event=state_quarantine module=persistence status=ok key={} reason={} bytes={}",
                self.key,
                reason,
                raw.len()
            ),
            Err(err) => warn!(
                "event=state_quarantine module=persistence status=error key={} reason={} error={}",
                self.key, reason, err
            ),
        }
    }
}
