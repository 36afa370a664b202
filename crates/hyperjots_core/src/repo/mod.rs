//! Repository layer over the key-value ledger.
//!
//! # Responsibility
//! - Own key derivation and JSON encoding of ledger values.
//! - Implement the counter allocation protocol.
//! - Keep ownership policy out of persistence code.
//!
//! # Invariants
//! - Note records live under decimal id keys; the counter lives under
//!   `NOTE_COUNTER_KEY`.
//! - Decoding failures are reported, never masked.

use crate::ledger::LedgerError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod counter_repo;
pub mod note_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for ledger-backed records.
#[derive(Debug)]
pub enum RepoError {
    /// Ledger adapter failure.
    Ledger(LedgerError),
    /// A value could not be encoded for `key`.
    Encode {
        key: String,
        source: serde_json::Error,
    },
    /// The value stored under `key` could not be decoded.
    Decode {
        key: String,
        source: serde_json::Error,
    },
    /// The counter under `key` changed between read and write.
    Conflict { key: String },
    /// The counter reached `u64::MAX`; no further id can be allocated.
    CounterExhausted,
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ledger(err) => write!(f, "{err}"),
            Self::Encode { key, source } => write!(f, "failed to encode value for `{key}`: {source}"),
            Self::Decode { key, source } => {
                write!(f, "failed to decode value stored under `{key}`: {source}")
            }
            Self::Conflict { key } => write!(f, "concurrent write detected on `{key}`"),
            Self::CounterExhausted => write!(f, "note counter exhausted"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Ledger(err) => Some(err),
            Self::Encode { source, .. } | Self::Decode { source, .. } => Some(source),
            Self::Conflict { .. } | Self::CounterExhausted => None,
        }
    }
}

impl From<LedgerError> for RepoError {
    fn from(value: LedgerError) -> Self {
        Self::Ledger(value)
    }
}
