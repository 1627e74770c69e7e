use parcel_core::db::migrations::latest_version;
use parcel_core::db::{open_db, open_db_in_memory, DbError};
use parcel_core::{Parcel, ParcelRepository, SqliteParcelRepository};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "parcel");
    assert_index_exists(&conn, "idx_parcel_client");
}

#[test]
fn in_memory_databases_are_independent() {
    let first = open_db_in_memory().unwrap();
    let second = open_db_in_memory().unwrap();

    SqliteParcelRepository::try_new(&first)
        .unwrap()
        .add(&Parcel::new(1, "first"))
        .unwrap();

    let repo = SqliteParcelRepository::try_new(&second).unwrap();
    assert!(repo.get_by_client(1).unwrap().is_empty());
}

#[test]
fn reopening_file_database_keeps_parcels() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tracker.db");

    let number = {
        let conn = open_db(&path).unwrap();
        let repo = SqliteParcelRepository::try_new(&conn).unwrap();
        repo.add(&Parcel::new(7, "kept")).unwrap()
    };

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn), latest_version());
    let repo = SqliteParcelRepository::try_new(&conn).unwrap();
    assert_eq!(repo.get(number).unwrap().address, "kept");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
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
fn opening_directory_path_fails_with_sqlite_error() {
    let dir = tempfile::tempdir().unwrap();

    match open_db(dir.path()).unwrap_err() {
        DbError::Sqlite(inner) => assert!(!inner.to_string().is_empty()),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn sqlite_errors_display_driver_message_unchanged() {
    let conn = Connection::open_in_memory().unwrap();
    let inner = conn.execute_batch("SELECT * FROM parcel;").unwrap_err();
    let expected = inner.to_string();

    assert_eq!(DbError::from(inner).to_string(), expected);
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, name: &str) {
    assert_schema_object(conn, "table", name);
}

fn assert_index_exists(conn: &Connection, name: &str) {
    assert_schema_object(conn, "index", name);
}

fn assert_schema_object(conn: &Connection, kind: &str, name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = ?1 AND name = ?2
            );",
            [kind, name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "{kind} {name} does not exist");
}
