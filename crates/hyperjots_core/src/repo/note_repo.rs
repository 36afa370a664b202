//! Note record persistence on the ledger.
//!
//! # Responsibility
//! - Read, write, delete and scan note records.
//! - Skip the reserved counter key during scans.
//!
//! # Invariants
//! - Writes and deletes address the key of the requested id.
//! - Any non-counter entry that does not decode as a note fails the scan.

use crate::ledger::Ledger;
use crate::model::note::{is_counter_key, note_key, Note, NoteId};
use crate::repo::{RepoError, RepoResult};

/// Ledger-backed note repository.
pub struct NoteRepository<L: Ledger> {
    ledger: L,
}

impl<L: Ledger> NoteRepository<L> {
    pub fn new(ledger: L) -> Self {
        Self { ledger }
    }

    /// Gets one note by id, `None` when the key is absent.
    pub fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>> {
        let key = note_key(id);
        match self.ledger.get(&key)? {
            Some(bytes) => decode_note(&key, &bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Writes `note` under the key of `id`, replacing any previous value.
    ///
    /// The key comes from `id`, never from `note.id`, so a write always lands
    /// on the entry that was read and authorized.
    pub fn put_note(&self, id: NoteId, note: &Note) -> RepoResult<()> {
        let key = note_key(id);
        let bytes = serde_json::to_vec(note).map_err(|source| RepoError::Encode {
            key: key.clone(),
            source,
        })?;
        self.ledger.put(&key, &bytes)?;
        Ok(())
    }

    /// Removes the note stored under `id`.
    pub fn delete_note(&self, id: NoteId) -> RepoResult<()> {
        self.ledger.delete(&note_key(id))?;
        Ok(())
    }

    /// Scans the whole ledger and returns notes accepted by `keep`, in scan
    /// order.
    pub fn scan_notes(&self, mut keep: impl FnMut(&Note) -> bool) -> RepoResult<Vec<Note>> {
        let mut notes = Vec::new();
        for entry in self.ledger.scan_all()? {
            let entry = entry?;
            if is_counter_key(&entry.key) {
                continue;
            }
            let note = decode_note(&entry.key, &entry.value)?;
            if keep(&note) {
                notes.push(note);
            }
        }
        Ok(notes)
    }
}

fn decode_note(key: &str, bytes: &[u8]) -> RepoResult<Note> {
    serde_json::from_slice(bytes).map_err(|source| RepoError::Decode {
        key: key.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::NoteRepository;
    use crate::ledger::{Ledger, MemoryLedger};
    use crate::model::note::{Note, NOTE_COUNTER_KEY};
    use crate::repo::RepoError;

    #[test]
    fn put_then_get_returns_same_note() {
        let ledger = MemoryLedger::new();
        let repo = NoteRepository::new(&ledger);
        let note = Note::new(4, "alice", "Groceries", "milk,eggs");
        repo.put_note(4, &note).unwrap();

        assert_eq!(repo.get_note(4).unwrap(), Some(note));
        assert!(ledger.get("4").unwrap().is_some());
        assert!(repo.get_note(5).unwrap().is_none());
    }

    #[test]
    fn scan_skips_counter_key() {
        let ledger = MemoryLedger::new();
        ledger.put(NOTE_COUNTER_KEY, b"2").unwrap();
        let repo = NoteRepository::new(&ledger);
        repo.put_note(1, &Note::new(1, "a", "t", "c")).unwrap();
        repo.put_note(2, &Note::new(2, "b", "t", "c")).unwrap();

        let all = repo.scan_notes(|_| true).unwrap();
        assert_eq!(all.len(), 2);
        let only_b = repo.scan_notes(|note| note.owner == "b").unwrap();
        assert_eq!(only_b.len(), 1);
        assert_eq!(only_b[0].id, 2);
    }

    #[test]
    fn scan_fails_on_foreign_undecodable_entry() {
        let ledger = MemoryLedger::new();
        ledger.put("settings", b"{\"theme\":\"dark\"}").unwrap();
        let repo = NoteRepository::new(&ledger);

        let err = repo.scan_notes(|_| true).unwrap_err();
        assert!(matches!(err, RepoError::Decode { ref key, .. } if key == "settings"));
    }
}
