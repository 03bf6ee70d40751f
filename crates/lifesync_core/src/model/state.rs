//! Whole-application state document.

use super::note::Note;
use super::task::Task;
use super::transaction::Transaction;
use super::ExtraFields;
use serde::{Deserialize, Serialize};

/// The three entity collections plus any unrecognized top-level fields.
///
/// This is both the durable slot document and the backup file shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl AppState {
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.transactions.is_empty() && self.notes.is_empty()
    }

    /// Total number of entities across collections.
    pub fn len(&self) -> usize {
        self.tasks.len() + self.transactions.len() + self.notes.len()
    }
}
