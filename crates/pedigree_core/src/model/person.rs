//! Person domain model.
//!
//! # Responsibility
//! - Define the canonical person row, its name rows and list projections.
//! - Define the create (`PersonDraft`) and overwrite (`PersonUpdate`) payloads.
//!
//! # Invariants
//! - `id` is assigned by the store and never changes.
//! - Omitted payload fields deserialize to `""` (and `Sex::U` for `sex`).
//! - `PersonRecord::names` is ordered primary-first, then by name id.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Store-assigned person row id.
pub type PersonId = i64;

/// Recorded sex of a person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Sex {
    /// Male.
    M,
    /// Female.
    F,
    /// Unknown / not recorded.
    #[default]
    U,
}

impl Sex {
    /// Returns the single-letter storage code.
    pub fn as_code(self) -> &'static str {
        match self {
            Self::M => "M",
            Self::F => "F",
            Self::U => "U",
        }
    }
}

/// Error for sex codes outside `M|F|U`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidSexCode(pub String);

impl Display for InvalidSexCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid sex code `{}`; expected M|F|U", self.0)
    }
}

impl Error for InvalidSexCode {}

impl FromStr for Sex {
    type Err = InvalidSexCode;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "M" => Ok(Self::M),
            "F" => Ok(Self::F),
            "U" => Ok(Self::U),
            other => Err(InvalidSexCode(other.to_string())),
        }
    }
}

/// Canonical `people` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub birth_date: String,
    pub death_date: String,
    pub occupation: String,
    pub sex: Sex,
    pub notes: String,
}

/// One `names` row owned by a person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonName {
    pub id: i64,
    pub given: String,
    pub family: String,
    pub is_primary: bool,
}

/// Fully hydrated person: the row plus every name row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRecord {
    pub person: Person,
    /// Primary name first.
    pub names: Vec<PersonName>,
}

impl PersonRecord {
    /// Returns the authoritative display name row, if any.
    pub fn primary_name(&self) -> Option<&PersonName> {
        self.names.first()
    }

    /// Flattens the record into the single-name shape edited by forms.
    pub fn to_form(&self) -> PersonForm {
        let (given, family) = match self.primary_name() {
            Some(name) => (name.given.clone(), name.family.clone()),
            None => (String::new(), String::new()),
        };
        PersonForm {
            id: self.person.id,
            given,
            family,
            birth_date: self.person.birth_date.clone(),
            death_date: self.person.death_date.clone(),
            occupation: self.person.occupation.clone(),
            sex: self.person.sex,
            notes: self.person.notes.clone(),
        }
    }
}

/// Flattened list row used by the people list and the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonSummary {
    pub id: PersonId,
    pub given: String,
    pub family: String,
    pub birth_date: String,
    pub death_date: String,
    pub occupation: String,
}

impl PersonSummary {
    /// `given family` with blanks dropped; empty when the person has no name.
    pub fn display_name(&self) -> String {
        format_display_name(&self.given, &self.family)
    }
}

/// Create payload. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonDraft {
    pub given: String,
    pub family: String,
    pub birth_date: String,
    pub occupation: String,
}

impl PersonDraft {
    /// Draft carrying only a name pair.
    pub fn named(given: impl Into<String>, family: impl Into<String>) -> Self {
        Self {
            given: given.into(),
            family: family.into(),
            ..Self::default()
        }
    }
}

/// Full-overwrite payload. Omitted fields reset to their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonUpdate {
    pub id: PersonId,
    #[serde(default)]
    pub given: String,
    #[serde(default)]
    pub family: String,
    #[serde(default)]
    pub birth_date: String,
    #[serde(default)]
    pub death_date: String,
    #[serde(default)]
    pub occupation: String,
    #[serde(default)]
    pub sex: Sex,
    #[serde(default)]
    pub notes: String,
}

/// Flat edit-form projection of a person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonForm {
    pub id: PersonId,
    pub given: String,
    pub family: String,
    pub birth_date: String,
    pub death_date: String,
    pub occupation: String,
    pub sex: Sex,
    pub notes: String,
}

impl From<PersonForm> for PersonUpdate {
    fn from(form: PersonForm) -> Self {
        Self {
            id: form.id,
            given: form.given,
            family: form.family,
            birth_date: form.birth_date,
            death_date: form.death_date,
            occupation: form.occupation,
            sex: form.sex,
            notes: form.notes,
        }
    }
}

/// Joins trimmed `given` and `family`, skipping blank parts.
pub fn format_display_name(given: &str, family: &str) -> String {
    [given.trim(), family.trim()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
