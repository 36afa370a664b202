//! SQLite bootstrap for `SqliteLedger`.
//!
//! Opens connections, applies the ledger schema and verifies the revision
//! bookkeeping before any entry is read or written. Failures are reported as
//! `LedgerError`.

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};
