//! SQLite-backed ledger adapter.
//!
//! # Responsibility
//! - Persist ledger entries in the `ledger_entries` table.
//! - Issue revisions from the single-row `ledger_revision` table.
//!
//! # Invariants
//! - Every write runs inside its own savepoint, so the version check of
//!   `compare_and_put`, the revision bump and the entry write commit or roll
//!   back together. A savepoint nests inside a transaction the host already
//!   opened on the connection, letting the host commit several store
//!   operations as one unit.
//! - Scans page through keys in ascending order; no statement stays open
//!   between pages.
//! - Connections must be opened through `db::open_db*`.

use super::{Ledger, LedgerEntry, LedgerError, LedgerResult, LedgerScan, Versioned};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::VecDeque;

const WRITE_SAVEPOINT: &str = "hyperjots_ledger_write";
const SCAN_PAGE_SIZE: usize = 128;

/// Ledger adapter over a migrated SQLite connection.
pub struct SqliteLedger<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteLedger<'conn> {
    /// Constructs a ledger from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> LedgerResult<Self> {
        for table in ["ledger_entries", "ledger_revision"] {
            if !table_exists(conn, table)? {
                return Err(LedgerError::MissingRequiredTable(table));
            }
        }
        Ok(Self { conn })
    }
}

impl Ledger for SqliteLedger<'_> {
    fn get_versioned(&self, key: &str) -> LedgerResult<Option<Versioned>> {
        let row = self
            .conn
            .query_row(
                "SELECT value, version FROM ledger_entries WHERE key = ?1;",
                [key],
                |row| Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;

        match row {
            Some((value, version)) => Ok(Some(Versioned {
                value,
                version: parse_version(key, version)?,
            })),
            None => Ok(None),
        }
    }

    fn put(&self, key: &str, value: &[u8]) -> LedgerResult<()> {
        let scope = WriteScope::begin(self.conn)?;
        write_entry(self.conn, key, value)?;
        scope.release()
    }

    fn compare_and_put(
        &self,
        key: &str,
        expected_version: Option<u64>,
        value: &[u8],
    ) -> LedgerResult<bool> {
        let scope = WriteScope::begin(self.conn)?;
        let current: Option<i64> = self
            .conn
            .query_row(
                "SELECT version FROM ledger_entries WHERE key = ?1;",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        let current = current
            .map(|version| parse_version(key, version))
            .transpose()?;

        if current != expected_version {
            return Ok(false);
        }

        write_entry(self.conn, key, value)?;
        scope.release()?;
        Ok(true)
    }

    fn delete(&self, key: &str) -> LedgerResult<()> {
        self.conn
            .execute("DELETE FROM ledger_entries WHERE key = ?1;", [key])?;
        Ok(())
    }

    fn scan_all(&self) -> LedgerResult<LedgerScan<'_>> {
        Ok(Box::new(SqliteScan {
            conn: self.conn,
            cursor: None,
            page: VecDeque::new(),
            exhausted: false,
        }))
    }
}

/// Savepoint around one ledger write; rolled back unless released.
struct WriteScope<'conn> {
    conn: &'conn Connection,
    open: bool,
}

impl<'conn> WriteScope<'conn> {
    fn begin(conn: &'conn Connection) -> LedgerResult<Self> {
        conn.execute_batch(&format!("SAVEPOINT {WRITE_SAVEPOINT};"))?;
        Ok(Self { conn, open: true })
    }

    fn release(mut self) -> LedgerResult<()> {
        self.conn
            .execute_batch(&format!("RELEASE {WRITE_SAVEPOINT};"))?;
        self.open = false;
        Ok(())
    }
}

impl Drop for WriteScope<'_> {
    fn drop(&mut self) {
        if self.open {
            let _ = self.conn.execute_batch(&format!(
                "ROLLBACK TO {WRITE_SAVEPOINT}; RELEASE {WRITE_SAVEPOINT};"
            ));
        }
    }
}

/// Keyset-paginated walk over `ledger_entries`.
struct SqliteScan<'conn> {
    conn: &'conn Connection,
    cursor: Option<String>,
    page: VecDeque<LedgerEntry>,
    exhausted: bool,
}

impl SqliteScan<'_> {
    fn fetch_page(&mut self) -> LedgerResult<()> {
        let mut stmt = self.conn.prepare(
            "SELECT key, value
             FROM ledger_entries
             WHERE ?1 IS NULL OR key > ?1
             ORDER BY key ASC
             LIMIT ?2;",
        )?;
        let mut rows = stmt.query(params![self.cursor, SCAN_PAGE_SIZE as i64])?;
        let mut fetched = 0;
        while let Some(row) = rows.next()? {
            self.page.push_back(LedgerEntry {
                key: row.get("key")?,
                value: row.get("value")?,
            });
            fetched += 1;
        }

        if fetched < SCAN_PAGE_SIZE {
            self.exhausted = true;
        }
        if let Some(last) = self.page.back() {
            self.cursor = Some(last.key.clone());
        }
        Ok(())
    }
}

impl Iterator for SqliteScan<'_> {
    type Item = LedgerResult<LedgerEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.page.is_empty() && !self.exhausted {
            if let Err(err) = self.fetch_page() {
                self.exhausted = true;
                self.page.clear();
                return Some(Err(err));
            }
        }
        self.page.pop_front().map(Ok)
    }
}

fn write_entry(conn: &Connection, key: &str, value: &[u8]) -> LedgerResult<()> {
    let bumped = conn.execute(
        "UPDATE ledger_revision SET revision = revision + 1 WHERE id = 1;",
        [],
    )?;
    if bumped != 1 {
        return Err(LedgerError::MissingRevisionSeed);
    }
    let revision: i64 = conn.query_row(
        "SELECT revision FROM ledger_revision WHERE id = 1;",
        [],
        |row| row.get(0),
    )?;
    conn.execute(
        "INSERT INTO ledger_entries (key, value, version)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            version = excluded.version;",
        params![key, value, revision],
    )?;
    Ok(())
}

fn parse_version(key: &str, version: i64) -> LedgerResult<u64> {
    u64::try_from(version).map_err(|_| {
        LedgerError::InvalidData(format!(
            "invalid version `{version}` in ledger_entries.version for key `{key}`"
        ))
    })
}

fn table_exists(conn: &Connection, table: &str) -> LedgerResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
