//! Access-controlled note store.
//!
//! # Responsibility
//! - Provide create/read/update/delete/list operations over ledger notes.
//! - Enforce that only a note's owner can read, modify or delete it.
//! - Expose counter inspection and reset.
//!
//! # Invariants
//! - No state is cached between calls; every operation re-reads the ledger.
//! - Ownership is checked before any note is returned or mutated.
//! - `owner` and `id` never change after creation.
//! - Each operation performs at most one note write, so there is nothing to
//!   roll back on failure.
//!
//! # Known limitations
//! - `get_all_notes` scans the whole ledger.
//! - `reset_note_counter` is not scoped to a caller, and ids handed out after
//!   a reset can overwrite notes that survived it.

use crate::identity::{IdentityError, IdentityResolver};
use crate::ledger::{Ledger, LedgerError};
use crate::model::note::{Note, NoteId};
use crate::repo::counter_repo::CounterRepository;
use crate::repo::note_repo::NoteRepository;
use crate::repo::RepoError;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type NoteStoreResult<T> = Result<T, NoteStoreError>;

/// Error returned by note store operations.
#[derive(Debug)]
pub enum NoteStoreError {
    /// The caller identity could not be resolved.
    IdentityUnavailable(IdentityError),
    /// No note is stored under the id.
    NotFound(NoteId),
    /// The caller does not own the note.
    AccessDenied(NoteId),
    /// Encoding a note or counter failed.
    Serialization {
        key: String,
        source: serde_json::Error,
    },
    /// Stored bytes could not be decoded.
    Deserialization {
        key: String,
        source: serde_json::Error,
    },
    /// The counter changed concurrently; the operation may be retried.
    Conflict { key: String },
    /// No further note id can be allocated.
    CounterExhausted,
    /// Ledger adapter failure.
    Ledger(LedgerError),
}

impl NoteStoreError {
    /// Returns whether retrying the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Stable code used in log events and CLI output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::IdentityUnavailable(_) => "identity_unavailable",
            Self::NotFound(_) => "not_found",
            Self::AccessDenied(_) => "access_denied",
            Self::Serialization { .. } => "serialization_error",
            Self::Deserialization { .. } => "deserialization_error",
            Self::Conflict { .. } => "conflict",
            Self::CounterExhausted => "counter_exhausted",
            Self::Ledger(_) => "ledger_error",
        }
    }
}

impl Display for NoteStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IdentityUnavailable(err) => write!(f, "failed to get client identity: {err}"),
            Self::NotFound(id) => write!(f, "note with ID {id} does not exist"),
            Self::AccessDenied(id) => {
                write!(f, "access denied: you are not the owner of note {id}")
            }
            Self::Serialization { key, source } => {
                write!(f, "failed to serialize value for `{key}`: {source}")
            }
            Self::Deserialization { key, source } => {
                write!(f, "failed to deserialize value stored under `{key}`: {source}")
            }
            Self::Conflict { key } => {
                write!(f, "concurrent update of `{key}`; retry the operation")
            }
            Self::CounterExhausted => write!(f, "note counter exhausted"),
            Self::Ledger(err) => write!(f, "{err}"),
        }
    }
}

impl Error for NoteStoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::IdentityUnavailable(err) => Some(err),
            Self::Serialization { source, .. } | Self::Deserialization { source, .. } => {
                Some(source)
            }
            Self::Ledger(err) => Some(err),
            Self::NotFound(_)
            | Self::AccessDenied(_)
            | Self::Conflict { .. }
            | Self::CounterExhausted => None,
        }
    }
}

impl From<IdentityError> for NoteStoreError {
    fn from(value: IdentityError) -> Self {
        Self::IdentityUnavailable(value)
    }
}

impl From<RepoError> for NoteStoreError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Ledger(err) => Self::Ledger(err),
            RepoError::Encode { key, source } => Self::Serialization { key, source },
            RepoError::Decode { key, source } => Self::Deserialization { key, source },
            RepoError::Conflict { key } => Self::Conflict { key },
            RepoError::CounterExhausted => Self::CounterExhausted,
        }
    }
}

impl From<LedgerError> for NoteStoreError {
    fn from(value: LedgerError) -> Self {
        Self::Ledger(value)
    }
}

/// Note store over a ledger and a caller identity source.
pub struct NoteStore<L: Ledger, I: IdentityResolver> {
    ledger: L,
    identity: I,
}

impl<L: Ledger, I: IdentityResolver> NoteStore<L, I> {
    /// Creates a store acting on behalf of the caller `identity` resolves.
    pub fn new(ledger: L, identity: I) -> Self {
        Self { ledger, identity }
    }

    /// Creates a note owned by the caller and returns its allocated id.
    ///
    /// Identity is resolved first, so a caller without identity never
    /// consumes an id.
    pub fn create_note(
        &self,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> NoteStoreResult<NoteId> {
        let result = self.create_note_inner(title.into(), content.into());
        log_outcome("note_create", result.as_ref().ok().copied(), &result);
        result
    }

    /// Returns the note if the caller owns it.
    pub fn read_note(&self, id: NoteId) -> NoteStoreResult<Note> {
        let result = self.fetch_authorized(id);
        log_outcome("note_read", Some(id), &result);
        result
    }

    /// Replaces title and content of a note the caller owns.
    pub fn update_note(
        &self,
        id: NoteId,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> NoteStoreResult<()> {
        let result = self.fetch_authorized(id).and_then(|mut note| {
            note.revise(title, content);
            self.notes().put_note(id, &note)?;
            Ok(())
        });
        log_outcome("note_update", Some(id), &result);
        result
    }

    /// Deletes a note the caller owns.
    pub fn delete_note(&self, id: NoteId) -> NoteStoreResult<()> {
        let result = self.fetch_authorized(id).and_then(|_| {
            self.notes().delete_note(id)?;
            Ok(())
        });
        log_outcome("note_delete", Some(id), &result);
        result
    }

    /// Lists every note owned by the caller, in ledger scan order.
    pub fn get_all_notes(&self) -> NoteStoreResult<Vec<Note>> {
        let result = self.get_all_notes_inner();
        if let Ok(notes) = &result {
            info!(
                "event=note_list module=note_store status=ok count={}",
                notes.len()
            );
        } else {
            log_outcome("note_list", None, &result);
        }
        result
    }

    /// Sets the counter back to 0. Not scoped to any caller.
    pub fn reset_note_counter(&self) -> NoteStoreResult<()> {
        let result = self.counter().reset().map_err(NoteStoreError::from);
        log_outcome("counter_reset", None, &result);
        result
    }

    /// Returns the id of the most recently allocated note, 0 when none.
    pub fn get_note_counter(&self) -> NoteStoreResult<NoteId> {
        Ok(self.counter().current()?)
    }

    fn create_note_inner(&self, title: String, content: String) -> NoteStoreResult<NoteId> {
        let owner = self.identity.resolve()?;
        let id = self.counter().allocate()?;
        let note = Note::new(id, owner, title, content);
        self.notes().put_note(id, &note)?;
        Ok(id)
    }

    fn get_all_notes_inner(&self) -> NoteStoreResult<Vec<Note>> {
        let identity = self.identity.resolve()?;
        Ok(self.notes().scan_notes(|note| note.is_owned_by(&identity))?)
    }

    fn fetch_authorized(&self, id: NoteId) -> NoteStoreResult<Note> {
        let note = self
            .notes()
            .get_note(id)?
            .ok_or(NoteStoreError::NotFound(id))?;
        let identity = self.identity.resolve()?;
        if !note.is_owned_by(&identity) {
            return Err(NoteStoreError::AccessDenied(id));
        }
        Ok(note)
    }

    fn notes(&self) -> NoteRepository<&L> {
        NoteRepository::new(&self.ledger)
    }

    fn counter(&self) -> CounterRepository<&L> {
        CounterRepository::new(&self.ledger)
    }
}

fn log_outcome<T>(event: &str, note_id: Option<NoteId>, result: &NoteStoreResult<T>) {
    let note_id = note_id.map_or_else(|| "none".to_string(), |id| id.to_string());
    match result {
        Ok(_) => info!("event={event} module=note_store status=ok note_id={note_id}"),
        Err(err) => warn!(
            "event={event} module=note_store status=error note_id={note_id} error_code={} retryable={}",
            err.code(),
            err.is_retryable()
        ),
    }
}
