use hyperjots_core::db::migrations::latest_version;
use hyperjots_core::db::{open_db, open_db_in_memory};
use hyperjots_core::{Ledger, LedgerError, SqliteLedger};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "ledger_entries");
    assert_table_exists(&conn, "ledger_revision");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hyperjots.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    let revision: i64 = conn_second
        .query_row("SELECT COUNT(*) FROM ledger_revision;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(revision, 1);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        LedgerError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn sqlite_ledger_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();
    let err = SqliteLedger::try_new(&conn).err().unwrap();
    assert!(matches!(
        err,
        LedgerError::MissingRequiredTable("ledger_entries")
    ));
}

#[test]
fn opening_database_without_revision_seed_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("unseeded.db");

    drop(open_db(&path).unwrap());
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("DELETE FROM ledger_revision;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    assert!(matches!(err, LedgerError::MissingRevisionSeed));
}

#[test]
fn opening_database_with_revision_behind_entries_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rewound.db");

    {
        let conn = open_db(&path).unwrap();
        let ledger = SqliteLedger::try_new(&conn).unwrap();
        ledger.put("1", b"{}").unwrap();
        ledger.put("2", b"{}").unwrap();
        conn.execute_batch("UPDATE ledger_revision SET revision = 1 WHERE id = 1;")
            .unwrap();
    }

    let err = open_db(&path).unwrap_err();
    assert!(matches!(err, LedgerError::InvalidData(_)));
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
