//! Free-form note model.

use super::{EntityId, ExtraFields};
use serde::{Deserialize, Serialize};

/// Input for creating a note.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
    pub is_pinned: bool,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            is_pinned: false,
        }
    }

    pub fn pinned(mut self, is_pinned: bool) -> Self {
        self.is_pinned = is_pinned;
        self
    }
}

/// Partial update for a note. `updatedAt` is refreshed even when empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub is_pinned: Option<bool>,
}

/// Canonical note record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: EntityId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub is_pinned: bool,
    /// Unix epoch milliseconds of the latest mutation.
    #[serde(default)]
    pub updated_at: i64,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl Note {
    pub fn new(id: EntityId, draft: NoteDraft, updated_at: i64) -> Self {
        Self {
            id,
            title: draft.title,
            content: draft.content,
            is_pinned: draft.is_pinned,
            updated_at,
            extra: ExtraFields::new(),
        }
    }

    /// Merges the patch and stamps `updated_at` unconditionally.
    pub fn apply_patch(&mut self, patch: NotePatch, updated_at: i64) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(is_pinned) = patch.is_pinned {
            self.is_pinned = is_pinned;
        }
        self.updated_at = updated_at;
    }
}
