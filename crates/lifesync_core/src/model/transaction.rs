//! Ledger transaction model.

use super::{EntityId, ExtraFields};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Category used when a transaction is created without one.
pub const DEFAULT_CATEGORY: &str = "General";

/// Direction of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "income" => Some(Self::Income),
            "expense" => Some(Self::Expense),
            _ => None,
        }
    }
}

/// Input for recording a transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionDraft {
    pub kind: TransactionType,
    /// Currency-agnostic amount. Stored as its magnitude.
    pub value: f64,
    /// Blank or missing falls back to [`DEFAULT_CATEGORY`].
    pub category: Option<String>,
    pub date: NaiveDate,
    pub note: Option<String>,
}

impl TransactionDraft {
    pub fn new(kind: TransactionType, value: f64, date: NaiveDate) -> Self {
        Self {
            kind,
            value,
            category: None,
            date,
            note: None,
        }
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Canonical ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: EntityId,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub value: f64,
    pub category: String,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Unix epoch milliseconds.
    #[serde(default)]
    pub created_at: i64,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// Normalizes a category label; blank input yields the default bucket.
pub fn normalize_category(category: Option<&str>) -> String {
    match category.map(str::trim) {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => DEFAULT_CATEGORY.to_string(),
    }
}
