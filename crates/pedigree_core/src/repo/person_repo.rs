//! Person repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide create/read/update/list APIs over `people` + `names`.
//! - Keep SQL details inside the storage boundary.
//!
//! # Invariants
//! - Writes touching both tables run in one IMMEDIATE transaction.
//! - At most one `names` row per person has `is_primary = 1`; saves upsert it.
//! - Listing order is `family ASC, given ASC, id ASC`.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::person::{
    Person, PersonDraft, PersonId, PersonName, PersonRecord, PersonSummary, PersonUpdate, Sex,
};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const PEOPLE_COLUMNS: &[&str] = &[
    "id",
    "birth_date",
    "death_date",
    "occupation",
    "sex",
    "notes",
];
const NAMES_COLUMNS: &[&str] = &["id", "person_id", "given", "family", "is_primary"];

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for person persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// No person row with this id.
    NotFound(PersonId),
    /// Persisted data cannot be converted into the domain model.
    InvalidData(String),
    /// Connection schema is not at the expected version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from an expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "person not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted person data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "person repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "person repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "person repository requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for person operations.
pub trait PersonRepository {
    /// Lists flattened summaries ordered by family, given, id.
    fn list_people(&self) -> RepoResult<Vec<PersonSummary>>;
    /// Loads one person with all name rows, primary first.
    fn get_person(&self, id: PersonId) -> RepoResult<Option<PersonRecord>>;
    /// Inserts a person and its primary name atomically.
    fn create_person(&self, draft: &PersonDraft) -> RepoResult<PersonRecord>;
    /// Overwrites a person and upserts its primary name atomically.
    fn update_person(&self, update: &PersonUpdate) -> RepoResult<PersonRecord>;
}

/// SQLite-backed person repository.
pub struct SqlitePersonRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePersonRepository<'conn> {
    /// Creates a repository over a connection with the schema applied.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_person_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl PersonRepository for SqlitePersonRepository<'_> {
    fn list_people(&self) -> RepoResult<Vec<PersonSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                p.id,
                COALESCE(n.given, '') AS given,
                COALESCE(n.family, '') AS family,
                p.birth_date,
                p.death_date,
                p.occupation
             FROM people p
             LEFT JOIN names n
               ON n.person_id = p.id AND n.is_primary = 1
             ORDER BY family ASC, given ASC, p.id ASC;",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(PersonSummary {
                id: row.get("id")?,
                given: row.get("given")?,
                family: row.get("family")?,
                birth_date: row.get("birth_date")?,
                death_date: row.get("death_date")?,
                occupation: row.get("occupation")?,
            })
        })?;

        let mut people = Vec::new();
        for row in rows {
            people.push(row?);
        }
        Ok(people)
    }

    fn get_person(&self, id: PersonId) -> RepoResult<Option<PersonRecord>> {
        load_record(self.conn, id)
    }

    fn create_person(&self, draft: &PersonDraft) -> RepoResult<PersonRecord> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO people (birth_date, death_date, occupation, sex, notes)
             VALUES (?1, '', ?2, 'U', '');",
            params![draft.birth_date.as_str(), draft.occupation.as_str()],
        )?;
        let person_id = tx.last_insert_rowid();
        tx.execute(
            "INSERT INTO names (person_id, given, family, is_primary)
             VALUES (?1, ?2, ?3, 1);",
            params![person_id, draft.given.as_str(), draft.family.as_str()],
        )?;
        tx.commit()?;

        load_record(self.conn, person_id)?.ok_or(RepoError::NotFound(person_id))
    }

    fn update_person(&self, update: &PersonUpdate) -> RepoResult<PersonRecord> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE people
             SET birth_date = ?1,
                 death_date = ?2,
                 occupation = ?3,
                 sex = ?4,
                 notes = ?5
             WHERE id = ?6;",
            params![
                update.birth_date.as_str(),
                update.death_date.as_str(),
                update.occupation.as_str(),
                update.sex.as_code(),
                update.notes.as_str(),
                update.id,
            ],
        )?;
        if changed == 0 {
            // Dropping `tx` rolls back.
            return Err(RepoError::NotFound(update.id));
        }

        tx.execute(
            "INSERT INTO names (person_id, given, family, is_primary)
             VALUES (?1, ?2, ?3, 1)
             ON CONFLICT(person_id, is_primary)
             DO UPDATE SET given = excluded.given, family = excluded.family;",
            params![update.id, update.given.as_str(), update.family.as_str()],
        )?;
        tx.commit()?;

        load_record(self.conn, update.id)?.ok_or(RepoError::NotFound(update.id))
    }
}

fn load_record(conn: &Connection, id: PersonId) -> RepoResult<Option<PersonRecord>> {
    let person = conn
        .query_row(
            "SELECT id, birth_date, death_date, occupation, sex, notes
             FROM people
             WHERE id = ?1;",
            [id],
            RawPerson::from_row,
        )
        .optional()?;
    let person = match person {
        Some(raw) => raw.into_person()?,
        None => return Ok(None),
    };

    let mut stmt = conn.prepare(
        "SELECT id, given, family, is_primary
         FROM names
         WHERE person_id = ?1
         ORDER BY is_primary DESC, id ASC;",
    )?;
    let mut rows = stmt.query([id])?;
    let mut names = Vec::new();
    while let Some(row) = rows.next()? {
        names.push(parse_name_row(row)?);
    }

    Ok(Some(PersonRecord { person, names }))
}

struct RawPerson {
    id: PersonId,
    birth_date: String,
    death_date: String,
    occupation: String,
    sex: String,
    notes: String,
}

impl RawPerson {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            birth_date: row.get("birth_date")?,
            death_date: row.get("death_date")?,
            occupation: row.get("occupation")?,
            sex: row.get("sex")?,
            notes: row.get("notes")?,
        })
    }

    fn into_person(self) -> RepoResult<Person> {
        let sex = self.sex.parse::<Sex>().map_err(|_| {
            RepoError::InvalidData(format!(
                "invalid sex value `{}` in people.sex for id {}",
                self.sex, self.id
            ))
        })?;
        Ok(Person {
            id: self.id,
            birth_date: self.birth_date,
            death_date: self.death_date,
            occupation: self.occupation,
            sex,
            notes: self.notes,
        })
    }
}

fn parse_name_row(row: &Row<'_>) -> RepoResult<PersonName> {
    let is_primary = match row.get::<_, i64>("is_primary")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_primary value `{other}` in names.is_primary"
            )));
        }
    };
    Ok(PersonName {
        id: row.get("id")?,
        given: row.get("given")?,
        family: row.get("family")?,
        is_primary,
    })
}

fn ensure_person_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for (table, columns) in [("people", PEOPLE_COLUMNS), ("names", NAMES_COLUMNS)] {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(RepoError::MissingRequiredColumn { table, column });
            }
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
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

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
