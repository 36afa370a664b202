//! Note domain model.
//!
//! # Responsibility
//! - Define the flat record stored under each note key.
//! - Derive ledger keys from note ids and reserve the counter key.
//!
//! # Invariants
//! - `id` and `owner` are immutable after creation; only `title` and
//!   `content` change through `Note::revise`.
//! - Note keys are the decimal form of a positive id.
//! - `NOTE_COUNTER_KEY` contains non-digit characters, so it can never equal
//!   a note key.

use serde::{Deserialize, Serialize};

/// Allocator-assigned note identifier. Zero is never allocated.
pub type NoteId = u64;

/// Reserved ledger key holding the id of the most recently allocated note.
pub const NOTE_COUNTER_KEY: &str = "note_counter";

/// Canonical note record.
///
/// Serialized as a flat object with fields `id`, `owner`, `title`, `content`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Allocator-assigned id, never client-supplied.
    pub id: NoteId,
    /// Opaque identity of the creating caller.
    pub owner: String,
    pub title: String,
    pub content: String,
}

impl Note {
    /// Creates a note owned by `owner`.
    pub fn new(
        id: NoteId,
        owner: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id,
            owner: owner.into(),
            title: title.into(),
            content: content.into(),
        }
    }

    /// Replaces mutable fields. `id` and `owner` are left untouched.
    pub fn revise(&mut self, title: impl Into<String>, content: impl Into<String>) {
        self.title = title.into();
        self.content = content.into();
    }

    /// Returns whether `identity` owns this note.
    ///
    /// Comparison is exact and case-sensitive; identities are opaque tokens.
    pub fn is_owned_by(&self, identity: &str) -> bool {
        self.owner == identity
    }
}

/// Derives the ledger key for a note id.
pub fn note_key(id: NoteId) -> String {
    id.to_string()
}

/// Returns whether `key` is the reserved counter key.
pub fn is_counter_key(key: &str) -> bool {
    key == NOTE_COUNTER_KEY
}
