//! In-memory ledger adapter.
//!
//! Backed by an ordered map behind a mutex. Used as the test fake and for
//! embedding the note store without durable storage. Scans walk the map by
//! key cursor, so writes made during a scan are visible to it.

use super::{Ledger, LedgerEntry, LedgerResult, LedgerScan, Versioned};
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct MemoryState {
    entries: BTreeMap<String, Versioned>,
    revision: u64,
}

impl MemoryState {
    fn write(&mut self, key: &str, value: &[u8]) {
        self.revision += 1;
        self.entries.insert(
            key.to_string(),
            Versioned {
                value: value.to_vec(),
                version: self.revision,
            },
        );
    }
}

/// Ordered in-memory ledger.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    state: Mutex<MemoryState>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A panicking writer cannot leave the map half-updated; every
        // mutation is a single insert or remove.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Ledger for MemoryLedger {
    fn get_versioned(&self, key: &str) -> LedgerResult<Option<Versioned>> {
        Ok(self.lock().entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> LedgerResult<()> {
        self.lock().write(key, value);
        Ok(())
    }

    fn compare_and_put(
        &self,
        key: &str,
        expected_version: Option<u64>,
        value: &[u8],
    ) -> LedgerResult<bool> {
        let mut state = self.lock();
        let current = state.entries.get(key).map(|stored| stored.version);
        if current != expected_version {
            return Ok(false);
        }
        state.write(key, value);
        Ok(true)
    }

    fn delete(&self, key: &str) -> LedgerResult<()> {
        self.lock().entries.remove(key);
        Ok(())
    }

    fn scan_all(&self) -> LedgerResult<LedgerScan<'_>> {
        Ok(Box::new(MemoryScan {
            ledger: self,
            cursor: None,
        }))
    }
}

/// Key cursor over the map; the lock is held only while one entry is read.
struct MemoryScan<'a> {
    ledger: &'a MemoryLedger,
    cursor: Option<String>,
}

impl Iterator for MemoryScan<'_> {
    type Item = LedgerResult<LedgerEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        let state = self.ledger.lock();
        let entry = match self.cursor.as_deref() {
            Some(last) => state
                .entries
                .range::<str, _>((Bound::Excluded(last), Bound::Unbounded))
                .next(),
            None => state.entries.iter().next(),
        }
        .map(|(key, stored)| LedgerEntry {
            key: key.clone(),
            value: stored.value.clone(),
        })?;
        drop(state);

        self.cursor = Some(entry.key.clone());
        Some(Ok(entry))
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryLedger;
    use crate::ledger::Ledger;

    #[test]
    fn put_get_delete_roundtrip() {
        let ledger = MemoryLedger::new();
        assert!(ledger.get("a").unwrap().is_none());

        ledger.put("a", b"1").unwrap();
        assert_eq!(ledger.get("a").unwrap().as_deref(), Some(&b"1"[..]));

        ledger.delete("a").unwrap();
        ledger.delete("a").unwrap();
        assert!(ledger.get("a").unwrap().is_none());
        assert!(ledger.is_empty());
    }

    #[test]
    fn compare_and_put_rejects_stale_version() {
        let ledger = MemoryLedger::new();
        assert!(ledger.compare_and_put("k", None, b"1").unwrap());
        assert!(!ledger.compare_and_put("k", None, b"2").unwrap());

        let seen = ledger.get_versioned("k").unwrap().unwrap();
        ledger.put("k", b"3").unwrap();
        assert!(!ledger.compare_and_put("k", Some(seen.version), b"4").unwrap());
        assert_eq!(ledger.get("k").unwrap().as_deref(), Some(&b"3"[..]));
    }

    #[test]
    fn recreated_key_never_reuses_a_version() {
        let ledger = MemoryLedger::new();
        ledger.put("k", b"1").unwrap();
        let first = ledger.get_versioned("k").unwrap().unwrap().version;
        ledger.delete("k").unwrap();
        ledger.put("k", b"1").unwrap();
        let second = ledger.get_versioned("k").unwrap().unwrap().version;
        assert!(second > first);
    }

    #[test]
    fn scan_yields_keys_in_ascending_order() {
        let ledger = MemoryLedger::new();
        for key in ["2", "note_counter", "10", "1"] {
            ledger.put(key, b"x").unwrap();
        }
        let keys: Vec<String> = ledger
            .scan_all()
            .unwrap()
            .map(|entry| entry.unwrap().key)
            .collect();
        assert_eq!(keys, vec!["1", "10", "2", "note_counter"]);
    }

    #[test]
    fn scan_sees_writes_ahead_of_its_cursor() {
        let ledger = MemoryLedger::new();
        ledger.put("1", b"x").unwrap();
        ledger.put("3", b"x").unwrap();

        let mut scan = ledger.scan_all().unwrap();
        assert_eq!(scan.next().unwrap().unwrap().key, "1");
        ledger.put("2", b"x").unwrap();
        ledger.put("0", b"x").unwrap();
        ledger.delete("3").unwrap();

        let rest: Vec<String> = scan.map(|entry| entry.unwrap().key).collect();
        assert_eq!(rest, vec!["2"]);
    }
}
