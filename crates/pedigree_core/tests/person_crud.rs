use pedigree_core::db::open_db_in_memory;
use pedigree_core::{
    PersonDraft, PersonRepository, PersonService, PersonUpdate, RepoError, Sex,
    SqlitePersonRepository,
};
use rusqlite::Connection;

#[test]
fn create_fills_defaults_and_primary_name() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePersonRepository::try_new(&conn).unwrap();

    let created = repo
        .create_person(&PersonDraft {
            given: "Ada".to_string(),
            family: "Lovelace".to_string(),
            birth_date: "1815-12-10".to_string(),
            occupation: "Mathematician".to_string(),
        })
        .unwrap();

    assert!(created.person.id > 0);
    assert_eq!(created.person.birth_date, "1815-12-10");
    assert_eq!(created.person.death_date, "");
    assert_eq!(created.person.sex, Sex::U);
    assert_eq!(created.person.notes, "");
    assert_eq!(created.names.len(), 1);
    assert!(created.names[0].is_primary);
    assert_eq!(created.names[0].given, "Ada");
    assert_eq!(created.names[0].family, "Lovelace");

    let loaded = repo.get_person(created.person.id).unwrap().unwrap();
    assert_eq!(loaded, created);
}

#[test]
fn get_missing_person_returns_none() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePersonRepository::try_new(&conn).unwrap();
    assert!(repo.get_person(404).unwrap().is_none());
}

#[test]
fn update_overwrites_every_field_and_keeps_one_primary_name() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePersonRepository::try_new(&conn).unwrap();
    let created = repo
        .create_person(&PersonDraft {
            occupation: "Poet".to_string(),
            ..PersonDraft::named("George", "Byron")
        })
        .unwrap();
    let id = created.person.id;

    repo.update_person(&PersonUpdate {
        id,
        given: "Ada".to_string(),
        family: "Lovelace".to_string(),
        death_date: "1852-11-27".to_string(),
        sex: Sex::F,
        ..PersonUpdate::default()
    })
    .unwrap();
    let saved = repo
        .update_person(&PersonUpdate {
            id,
            given: "Augusta Ada".to_string(),
            family: "King".to_string(),
            sex: Sex::F,
            notes: "Countess of Lovelace".to_string(),
            ..PersonUpdate::default()
        })
        .unwrap();

    // Last write wins; omitted fields reset.
    assert_eq!(saved.person.death_date, "");
    assert_eq!(saved.person.occupation, "");
    assert_eq!(saved.person.notes, "Countess of Lovelace");
    assert_eq!(saved.names.len(), 1);
    assert_eq!(saved.names[0].given, "Augusta Ada");
    assert_eq!(saved.names[0].family, "King");
    assert_eq!(primary_name_count(&conn, id), 1);
}

#[test]
fn update_inserts_primary_name_when_missing() {
    let conn = open_db_in_memory().unwrap();
    conn.execute("INSERT INTO people DEFAULT VALUES;", []).unwrap();
    let id = conn.last_insert_rowid();
    let repo = SqlitePersonRepository::try_new(&conn).unwrap();
    assert!(repo.get_person(id).unwrap().unwrap().names.is_empty());

    let saved = repo
        .update_person(&PersonUpdate {
            id,
            given: "Mary".to_string(),
            ..PersonUpdate::default()
        })
        .unwrap();
    assert_eq!(saved.names.len(), 1);
    assert!(saved.names[0].is_primary);
    assert_eq!(primary_name_count(&conn, id), 1);
}

#[test]
fn update_unknown_id_returns_not_found_and_writes_nothing() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePersonRepository::try_new(&conn).unwrap();

    let err = repo
        .update_person(&PersonUpdate {
            id: 77,
            given: "Ghost".to_string(),
            ..PersonUpdate::default()
        })
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound(77)));

    let names: i64 = conn
        .query_row("SELECT COUNT(*) FROM names;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(names, 0);
}

#[test]
fn list_orders_by_family_then_given_then_id() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePersonRepository::try_new(&conn).unwrap();
    let turing = repo
        .create_person(&PersonDraft::named("Alan", "Turing"))
        .unwrap();
    let ada_older = repo
        .create_person(&PersonDraft::named("Ada", "Byron"))
        .unwrap();
    let ada_newer = repo
        .create_person(&PersonDraft::named("Ada", "Byron"))
        .unwrap();
    let nameless = repo.create_person(&PersonDraft::default()).unwrap();

    let listed: Vec<_> = repo
        .list_people()
        .unwrap()
        .into_iter()
        .map(|person| person.id)
        .collect();
    assert_eq!(
        listed,
        vec![
            nameless.person.id,
            ada_older.person.id,
            ada_newer.person.id,
            turing.person.id,
        ]
    );
}

#[test]
fn list_includes_people_without_names() {
    let conn = open_db_in_memory().unwrap();
    conn.execute("INSERT INTO people (occupation) VALUES ('Smith');", [])
        .unwrap();
    let repo = SqlitePersonRepository::try_new(&conn).unwrap();

    let people = repo.list_people().unwrap();
    assert_eq!(people.len(), 1);
    assert_eq!(people[0].given, "");
    assert_eq!(people[0].family, "");
    assert_eq!(people[0].occupation, "Smith");
}

#[test]
fn service_form_projection_roundtrips_through_update() {
    let conn = open_db_in_memory().unwrap();
    let service = PersonService::new(SqlitePersonRepository::try_new(&conn).unwrap());
    let created = service
        .create_person(&PersonDraft::named("Charles", "Babbage"))
        .unwrap();

    let mut form = service
        .get_person_form(created.person.id)
        .unwrap()
        .unwrap();
    form.occupation = "Inventor".to_string();
    form.sex = Sex::M;
    let saved = service.update_person(&form.into()).unwrap();

    assert_eq!(saved.person.occupation, "Inventor");
    assert_eq!(saved.person.sex, Sex::M);
    assert_eq!(saved.names[0].given, "Charles");
}

#[test]
fn repository_rejects_connection_without_schema() {
    let conn = Connection::open_in_memory().unwrap();
    let err = SqlitePersonRepository::try_new(&conn).err().unwrap();
    assert!(matches!(
        err,
        RepoError::UninitializedConnection {
            actual_version: 0,
            ..
        }
    ));
}

#[test]
fn repository_rejects_missing_table_and_column() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch("DROP TABLE names;").unwrap();
    assert!(matches!(
        SqlitePersonRepository::try_new(&conn).err().unwrap(),
        RepoError::MissingRequiredTable("names")
    ));

    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "ALTER TABLE people RENAME TO people_old;
         CREATE TABLE people (id INTEGER PRIMARY KEY, birth_date TEXT);",
    )
    .unwrap();
    assert!(matches!(
        SqlitePersonRepository::try_new(&conn).err().unwrap(),
        RepoError::MissingRequiredColumn {
            table: "people",
            column: "death_date",
        }
    ));
}

#[test]
fn create_rolls_back_person_when_name_insert_fails() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TRIGGER names_reject BEFORE INSERT ON names
         BEGIN SELECT RAISE(ABORT, 'names are read-only'); END;",
    )
    .unwrap();
    let repo = SqlitePersonRepository::try_new(&conn).unwrap();

    let err = repo
        .create_person(&PersonDraft::named("Ada", "Lovelace"))
        .unwrap_err();
    assert!(err.to_string().contains("names are read-only"), "{err}");

    let people: i64 = conn
        .query_row("SELECT COUNT(*) FROM people", [], |row| row.get(0))
        .unwrap();
    assert_eq!(people, 0);
}

#[test]
fn update_rolls_back_person_fields_when_name_write_fails() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePersonRepository::try_new(&conn).unwrap();
    let created = repo
        .create_person(&PersonDraft {
            occupation: "Poet".to_string(),
            ..PersonDraft::named("George", "Byron")
        })
        .unwrap();
    conn.execute_batch(
        "CREATE TRIGGER names_reject_insert BEFORE INSERT ON names
         BEGIN SELECT RAISE(ABORT, 'names are read-only'); END;
         CREATE TRIGGER names_reject_update BEFORE UPDATE ON names
         BEGIN SELECT RAISE(ABORT, 'names are read-only'); END;",
    )
    .unwrap();

    assert!(repo
        .update_person(&PersonUpdate {
            id: created.person.id,
            given: "Ada".to_string(),
            family: "Lovelace".to_string(),
            occupation: "Mathematician".to_string(),
            ..PersonUpdate::default()
        })
        .is_err());

    let loaded = repo.get_person(created.person.id).unwrap().unwrap();
    assert_eq!(loaded, created);
}

fn primary_name_count(conn: &Connection, person_id: i64) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM names WHERE person_id = ?1 AND is_primary = 1;",
        [person_id],
        |row| row.get(0),
    )
    .unwrap()
}
