use pedigree_core::db::migrations::latest_version;
use pedigree_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_creates_people_and_names() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "people");
    assert_table_exists(&conn, "names");
}

#[test]
fn reopening_project_file_keeps_schema_and_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("FamilyTree-1.ftdb");

    let conn = open_db(&path).unwrap();
    conn.execute("INSERT INTO people (occupation) VALUES ('Weaver');", [])
        .unwrap();
    drop(conn);

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn), latest_version());
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM people;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn file_connections_use_wal_and_foreign_keys() {
    let dir = tempfile::tempdir().unwrap();
    let conn = open_db(dir.path().join("tree.ftdb")).unwrap();

    let journal: String = conn
        .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(journal.to_ascii_lowercase(), "wal");

    let err = conn
        .execute(
            "INSERT INTO names (person_id, given, family, is_primary) VALUES (42, 'A', 'B', 1);",
            [],
        )
        .unwrap_err();
    assert!(err.to_string().contains("FOREIGN KEY"));
}

#[test]
fn schema_rejects_second_primary_name_and_bad_sex() {
    let conn = open_db_in_memory().unwrap();
    conn.execute("INSERT INTO people DEFAULT VALUES;", []).unwrap();
    conn.execute(
        "INSERT INTO names (person_id, given, family, is_primary) VALUES (1, 'Ada', '', 1);",
        [],
    )
    .unwrap();

    assert!(conn
        .execute(
            "INSERT INTO names (person_id, given, family, is_primary) VALUES (1, 'Augusta', '', 1);",
            [],
        )
        .is_err());
    assert!(conn
        .execute("UPDATE people SET sex = 'X' WHERE id = 1;", [])
        .is_err());
}

#[test]
fn opening_project_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.ftdb");

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

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1);",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
