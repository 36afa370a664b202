//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate identity resolution and repository calls into the public
//!   note operations.
//! - Keep CLI/transport layers decoupled from ledger details.

pub mod note_store;
