//! Domain model for ledger-backed notes.
//!
//! # Responsibility
//! - Define the canonical note record persisted in the ledger.
//! - Own the mapping between note ids and ledger keys.
//!
//! # Invariants
//! - Every note is identified by a positive, allocator-assigned `NoteId`.
//! - `owner` is fixed at creation and never rewritten.

pub mod note;
