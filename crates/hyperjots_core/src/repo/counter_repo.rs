//! Note id allocation on the ledger.
//!
//! # Responsibility
//! - Read, reset and advance the counter stored under `NOTE_COUNTER_KEY`.
//!
//! # Invariants
//! - The stored value is the id of the most recently allocated note, or
//!   0/absent when nothing has been allocated since the last reset.
//! - `allocate` advances the counter by exactly one with a compare-and-swap
//!   on the version it read; a concurrent writer yields `Conflict` and
//!   nothing is written.

use crate::ledger::Ledger;
use crate::model::note::{NoteId, NOTE_COUNTER_KEY};
use crate::repo::{RepoError, RepoResult};

/// Ledger-backed note id allocator.
pub struct CounterRepository<L: Ledger> {
    ledger: L,
}

impl<L: Ledger> CounterRepository<L> {
    pub fn new(ledger: L) -> Self {
        Self { ledger }
    }

    /// Returns the current counter value, 0 when unset.
    pub fn current(&self) -> RepoResult<NoteId> {
        match self.ledger.get(NOTE_COUNTER_KEY)? {
            Some(bytes) => decode_counter(&bytes),
            None => Ok(0),
        }
    }

    /// Allocates and persists the next note id.
    pub fn allocate(&self) -> RepoResult<NoteId> {
        let stored = self.ledger.get_versioned(NOTE_COUNTER_KEY)?;
        let (next, expected_version) = match stored {
            Some(stored) => {
                let current = decode_counter(&stored.value)?;
                let next = current
                    .checked_add(1)
                    .ok_or(RepoError::CounterExhausted)?;
                (next, Some(stored.version))
            }
            None => (1, None),
        };

        let bytes = encode_counter(next)?;
        if !self
            .ledger
            .compare_and_put(NOTE_COUNTER_KEY, expected_version, &bytes)?
        {
            return Err(RepoError::Conflict {
                key: NOTE_COUNTER_KEY.to_string(),
            });
        }
        Ok(next)
    }

    /// Unconditionally stores 0 as the counter value.
    pub fn reset(&self) -> RepoResult<()> {
        let bytes = encode_counter(0)?;
        self.ledger.put(NOTE_COUNTER_KEY, &bytes)?;
        Ok(())
    }
}

fn encode_counter(value: NoteId) -> RepoResult<Vec<u8>> {
    serde_json::to_vec(&value).map_err(|source| RepoError::Encode {
        key: NOTE_COUNTER_KEY.to_string(),
        source,
    })
}

fn decode_counter(bytes: &[u8]) -> RepoResult<NoteId> {
    serde_json::from_slice(bytes).map_err(|source| RepoError::Decode {
        key: NOTE_COUNTER_KEY.to_string(),
        source,
    })
}
