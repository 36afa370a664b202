//! Ledger schema steps and post-migration checks.
//!
//! # Invariants
//! - Steps are ordered by `version`; the applied version is mirrored to
//!   `PRAGMA user_version`.
//! - After bootstrap, `ledger_revision` holds exactly its seed row and the
//!   stored revision is at least the highest entry version, so the next
//!   write is stamped above every existing version.

use crate::ledger::{LedgerError, LedgerResult};
use log::info;
use rusqlite::Connection;

struct SchemaStep {
    version: u32,
    sql: &'static str,
}

const SCHEMA_STEPS: &[SchemaStep] = &[SchemaStep {
    version: 1,
    sql: include_str!("0001_ledger.sql"),
}];

/// Latest ledger schema version known by this binary.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |step| step.version)
}

/// Brings the ledger schema up to date and checks revision bookkeeping.
pub fn apply_migrations(conn: &mut Connection) -> LedgerResult<()> {
    let db_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    let latest_supported = latest_version();
    if db_version > latest_supported {
        return Err(LedgerError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        });
    }

    let pending: Vec<&SchemaStep> = SCHEMA_STEPS
        .iter()
        .filter(|step| step.version > db_version)
        .collect();
    if !pending.is_empty() {
        let tx = conn.transaction()?;
        for step in &pending {
            tx.execute_batch(step.sql)?;
            tx.pragma_update(None, "user_version", step.version)?;
        }
        tx.commit()?;
        info!(
            "event=db_migrate module=db status=ok from_version={} to_version={}",
            db_version, latest_supported
        );
    }

    verify_revision_seed(conn)
}

fn verify_revision_seed(conn: &Connection) -> LedgerResult<()> {
    let seeded: i64 = conn.query_row(
        "SELECT COUNT(*) FROM ledger_revision WHERE id = 1;",
        [],
        |row| row.get(0),
    )?;
    if seeded != 1 {
        return Err(LedgerError::MissingRevisionSeed);
    }

    let (revision, highest_version): (i64, i64) = conn.query_row(
        "SELECT
            (SELECT revision FROM ledger_revision WHERE id = 1),
            (SELECT COALESCE(MAX(version), 0) FROM ledger_entries);",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    if revision < highest_version {
        return Err(LedgerError::InvalidData(format!(
            "ledger revision {revision} is behind stored entry version {highest_version}"
        )));
    }
    Ok(())
}
