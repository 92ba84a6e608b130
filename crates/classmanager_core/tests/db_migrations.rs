use classmanager_core::db::migrations::latest_version;
use classmanager_core::db::{open_db, open_db_in_memory, ping, DbError};
use classmanager_core::{SqliteDocumentStore, StoreError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "documents");
    ping(&conn).unwrap();
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("classmanager.sqlite3");

    let conn_first = open_db(&path).unwrap();
    conn_first
        .execute(
            "INSERT INTO documents (doc_id, collection, doc_key, body)
             VALUES ('a', 'students', 'S1', '{\"student_id\":\"S1\"}');",
            [],
        )
        .unwrap();
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    let rows: i64 = conn_second
        .query_row("SELECT COUNT(*) FROM documents;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
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
fn store_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();

    let err = SqliteDocumentStore::try_new(&conn).err().unwrap();
    assert!(matches!(
        err,
        StoreError::UninitializedConnection {
            actual_version: 0,
            ..
        }
    ));
}

#[test]
fn documents_table_enforces_unique_key_per_collection() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO documents (doc_id, collection, doc_key, body)
         VALUES ('a', 'students', 'X1', '{}');",
        [],
    )
    .unwrap();

    // Same key in another collection is fine.
    conn.execute(
        "INSERT INTO documents (doc_id, collection, doc_key, body)
         VALUES ('b', 'teachers', 'X1', '{}');",
        [],
    )
    .unwrap();

    let duplicate = conn.execute(
        "INSERT INTO documents (doc_id, collection, doc_key, body)
         VALUES ('c', 'students', 'X1', '{}');",
        [],
    );
    assert!(duplicate.is_err());

    let bad_collection = conn.execute(
        "INSERT INTO documents (doc_id, collection, doc_key, body)
         VALUES ('d', 'janitors', 'J1', '{}');",
        [],
    );
    assert!(bad_collection.is_err());
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
