//! Key-value ledger contract and local adapters.
//!
//! # Responsibility
//! - Define the ordered key-value interface the note store runs on.
//! - Provide an in-memory adapter and a SQLite-backed adapter.
//!
//! # Invariants
//! - Every write stamps the key with a ledger-wide revision that is strictly
//!   greater than any revision issued before, so a key that is deleted and
//!   written again never reuses an old version.
//! - `compare_and_put` writes only when the stored version still equals the
//!   expected one (`None` means "key must be absent").
//! - `scan_all` is lazy: it walks keys in ascending order, reading entries as
//!   the caller advances, and yields every entry that stays live for the
//!   whole walk exactly once. It is not a point-in-time snapshot.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod memory;
mod sqlite;

pub use memory::MemoryLedger;
pub use sqlite::SqliteLedger;

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Single-pass sequence of ledger entries produced by `Ledger::scan_all`.
pub type LedgerScan<'a> = Box<dyn Iterator<Item = LedgerResult<LedgerEntry>> + 'a>;

/// Transport/storage failure raised by a ledger adapter.
#[derive(Debug)]
pub enum LedgerError {
    /// SQLite driver failure.
    Sqlite(rusqlite::Error),
    /// The ledger file was written by a newer schema.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// Storage is missing a table the adapter needs.
    MissingRequiredTable(&'static str),
    /// The revision row is absent, so no write could be versioned.
    MissingRevisionSeed,
    InvalidData(String),
}

impl Display for LedgerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "ledger schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "ledger storage is missing required table `{table}`")
            }
            Self::MissingRevisionSeed => write!(f, "ledger revision row is missing"),
            Self::InvalidData(message) => write!(f, "invalid ledger data: {message}"),
        }
    }
}

impl Error for LedgerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. }
            | Self::MissingRequiredTable(_)
            | Self::MissingRevisionSeed
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<rusqlite::Error> for LedgerError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Stored value together with the revision of its last write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned {
    pub value: Vec<u8>,
    pub version: u64,
}

/// One `(key, value)` pair produced by a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub key: String,
    pub value: Vec<u8>,
}

/// Ordered key-value ledger consumed by the note store.
pub trait Ledger {
    /// Reads the value and version stored under `key`.
    fn get_versioned(&self, key: &str) -> LedgerResult<Option<Versioned>>;

    /// Writes `value` under `key` unconditionally.
    fn put(&self, key: &str, value: &[u8]) -> LedgerResult<()>;

    /// Writes `value` only if the stored version equals `expected_version`.
    ///
    /// Returns `Ok(false)` without writing on mismatch.
    fn compare_and_put(
        &self,
        key: &str,
        expected_version: Option<u64>,
        value: &[u8],
    ) -> LedgerResult<bool>;

    /// Removes `key`. Removing an absent key is a no-op.
    fn delete(&self, key: &str) -> LedgerResult<()>;

    /// Iterates over every entry in the ledger.
    fn scan_all(&self) -> LedgerResult<LedgerScan<'_>>;

    /// Reads the value stored under `key`.
    fn get(&self, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        Ok(self.get_versioned(key)?.map(|stored| stored.value))
    }
}

impl<T: Ledger + ?Sized> Ledger for &T {
    fn get_versioned(&self, key: &str) -> LedgerResult<Option<Versioned>> {
        (**self).get_versioned(key)
    }

    fn put(&self, key: &str, value: &[u8]) -> LedgerResult<()> {
        (**self).put(key, value)
    }

    fn compare_and_put(
        &self,
        key: &str,
        expected_version: Option<u64>,
        value: &[u8],
    ) -> LedgerResult<bool> {
        (**self).compare_and_put(key, expected_version, value)
    }

    fn delete(&self, key: &str) -> LedgerResult<()> {
        (**self).delete(key)
    }

    fn scan_all(&self) -> LedgerResult<LedgerScan<'_>> {
        (**self).scan_all()
    }

    fn get(&self, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        (**self).get(key)
    }
}
