//! Portable JSON snapshot export and import.
//!
//! # Responsibility
//! - Produce the backup document for the full state.
//! - Parse backup documents with the same repair rules as startup load.
//!
//! # Invariants
//! - Export output is pretty-printed and sufficient to rebuild the state.
//! - Import only rejects input that is not a JSON object; everything else is
//!   repaired, never rejected.
//! - The codec never touches the live store; callers decide whether to apply.

use crate::id::IdGenerator;
use crate::model::state::AppState;
use crate::schema::{repair_document, RepairReport};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Snapshot encode/decode failures.
#[derive(Debug)]
pub enum CodecError {
    /// Input is not a JSON object.
    InvalidFormat(String),
    /// State could not be serialized.
    Serialize(serde_json::Error),
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidFormat(details) => write!(f, "invalid snapshot format: {details}"),
            Self::Serialize(err) => write!(f, "failed to serialize snapshot: {err}"),
        }
    }
}

impl Error for CodecError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Serialize(err) => Some(err),
            Self::InvalidFormat(_) => None,
        }
    }
}

/// Decoded backup ready to replace the live state.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedSnapshot {
    pub state: AppState,
    pub report: RepairReport,
}

/// Serializes the full state as a pretty-printed JSON document.
pub fn export_snapshot(state: &AppState) -> Result<String, CodecError> {
    serde_json::to_string_pretty(state).map_err(CodecError::Serialize)
}

/// Parses and repairs a backup document.
///
/// # Errors
/// - `CodecError::InvalidFormat` when `text` is not JSON or not an object.
pub fn import_snapshot(text: &str, ids: &dyn IdGenerator) -> Result<ImportedSnapshot, CodecError> {
    let document: Value = serde_json::from_str(text.trim_start_matches('\u{feff}'))
        .map_err(|err| CodecError::InvalidFormat(err.to_string()))?;
    if !document.is_object() {
        return Err(CodecError::InvalidFormat(format!(
            "expected a JSON object, got {}",
            json_kind(&document)
        )));
    }

    let (state, report) = repair_document(document, ids);
    Ok(ImportedSnapshot { state, report })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::SequentialIds;

    #[test]
    fn rejects_malformed_and_non_object_input() {
        let ids = SequentialIds::new("id");
        for input in ["{not json", "[]", "42", "\"tasks\"", "null", ""] {
            let err = import_snapshot(input, &ids).unwrap_err();
            assert!(matches!(err, CodecError::InvalidFormat(_)), "{input}");
        }
    }

    #[test]
    fn accepts_empty_object_as_empty_state() {
        let imported = import_snapshot("{}", &SequentialIds::new("id")).unwrap();
        assert!(imported.state.is_empty());
        assert_eq!(imported.report.coerced_collections.len(), 3);
    }

    #[test]
    fn accepts_utf8_bom_prefix() {
        let imported = import_snapshot(
            "\u{feff}{\"tasks\":[],\"transactions\":[],\"notes\":[]}",
            &SequentialIds::new("id"),
        )
        .unwrap();
        assert!(imported.report.is_clean());
    }

    #[test]
    fn export_is_pretty_printed_with_all_collections() {
        let text = export_snapshot(&AppState::default()).unwrap();
        assert!(text.contains('\n'));
        let value: Value = serde_json::from_str(&text).unwrap();
        for key in ["tasks", "transactions", "notes"] {
            assert_eq!(value[key], serde_json::json!([]));
        }
    }
}
