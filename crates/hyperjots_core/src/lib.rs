//! Core domain logic for HyperJots.
//! Access-controlled notes stored in an ordered key-value ledger.

pub mod db;
pub mod identity;
pub mod ledger;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use identity::{EnvIdentity, IdentityError, IdentityResolver, StaticIdentity};
pub use ledger::{Ledger, LedgerError, LedgerResult, MemoryLedger, SqliteLedger, Versioned};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::note::{note_key, Note, NoteId, NOTE_COUNTER_KEY};
pub use repo::{RepoError, RepoResult};
pub use service::note_store::{NoteStore, NoteStoreError, NoteStoreResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
