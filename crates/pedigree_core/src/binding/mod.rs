//! Pedigree tree slots and their bindings to person rows.
//!
//! # Responsibility
//! - Name the seven fixed tree slots and their labels.
//! - Persist the slot → person map outside the project schema.
//! - Resolve unbound slots by matching or creating a person.
//!
//! # Invariants
//! - A slot is either unbound or bound to exactly one person id.
//! - Binding is one-way: nothing unbinds a single slot.
//! - Several slots may point at the same person.

mod resolver;
mod store;

pub use resolver::{
    normalize_label, parse_label, resolve_slot, seed_if_empty, ParsedLabel, PersonDirectory,
    SlotResolution,
};
pub use store::BindingStore;

use crate::model::person::PersonId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Slot → person map as persisted.
pub type BindingMap = BTreeMap<Slot, PersonId>;

/// Fixed position in the three-generation pedigree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Slot {
    #[serde(rename = "you")]
    You,
    #[serde(rename = "f")]
    Father,
    #[serde(rename = "m")]
    Mother,
    #[serde(rename = "gfP")]
    PaternalGrandfather,
    #[serde(rename = "gmP")]
    PaternalGrandmother,
    #[serde(rename = "gfM")]
    MaternalGrandfather,
    #[serde(rename = "gmM")]
    MaternalGrandmother,
}

impl Slot {
    /// All slots, root first.
    pub const ALL: [Slot; 7] = [
        Slot::You,
        Slot::Father,
        Slot::Mother,
        Slot::PaternalGrandfather,
        Slot::PaternalGrandmother,
        Slot::MaternalGrandfather,
        Slot::MaternalGrandmother,
    ];

    /// Stable persisted key.
    pub fn key(self) -> &'static str {
        match self {
            Self::You => "you",
            Self::Father => "f",
            Self::Mother => "m",
            Self::PaternalGrandfather => "gfP",
            Self::PaternalGrandmother => "gmP",
            Self::MaternalGrandfather => "gfM",
            Self::MaternalGrandmother => "gmM",
        }
    }

    /// Parses a persisted key. Keys are case-sensitive.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|slot| slot.key() == key)
    }

    /// Label shown while the slot is unbound.
    pub fn fallback_label(self) -> &'static str {
        match self {
            Self::You => "You",
            Self::Father => "Father",
            Self::Mother => "Mother",
            Self::PaternalGrandfather => "Grandfather, Paternal",
            Self::PaternalGrandmother => "Grandmother, Paternal",
            Self::MaternalGrandfather => "Grandfather, Maternal",
            Self::MaternalGrandmother => "Grandmother, Maternal",
        }
    }

    /// Placeholder label in `family, given` order used when seeding.
    pub fn seed_label(self) -> &'static str {
        match self {
            Self::You => "You",
            Self::Father => "Father",
            Self::Mother => "Mother",
            Self::PaternalGrandfather => "Paternal, Grandfather",
            Self::PaternalGrandmother => "Paternal, Grandmother",
            Self::MaternalGrandfather => "Maternal, Grandfather",
            Self::MaternalGrandmother => "Maternal, Grandmother",
        }
    }

    /// Parent slots in display order (mother line first), empty for grandparents.
    pub fn parents(self) -> &'static [Slot] {
        match self {
            Self::You => &[Slot::Mother, Slot::Father],
            Self::Mother => &[Slot::MaternalGrandmother, Slot::MaternalGrandfather],
            Self::Father => &[Slot::PaternalGrandmother, Slot::PaternalGrandfather],
            _ => &[],
        }
    }
}

impl Display for Slot {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Errors from binding persistence and slot resolution.
#[derive(Debug)]
pub enum BindingError {
    /// Listing or creating people through the directory failed.
    Directory { slot: Slot, message: String },
    /// Reading or writing the binding file failed.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The binding map could not be encoded or decoded as JSON.
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl Display for BindingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Directory { slot, message } => {
                write!(f, "failed to resolve slot `{slot}`: {message}")
            }
            Self::Io { path, source } => {
                write!(f, "binding file `{}`: {source}", path.display())
            }
            Self::Json { path, source } => {
                write!(f, "binding JSON `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for BindingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Directory { .. } => None,
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BindingMap, Slot};

    #[test]
    fn keys_roundtrip_for_every_slot() {
        for slot in Slot::ALL {
            assert_eq!(Slot::from_key(slot.key()), Some(slot));
        }
        assert_eq!(Slot::from_key("GFM"), None);
    }

    #[test]
    fn binding_map_serializes_as_flat_object() {
        let mut map = BindingMap::new();
        map.insert(Slot::You, 1);
        map.insert(Slot::MaternalGrandfather, 7);
        let encoded = serde_json::to_string(&map).unwrap();
        assert_eq!(encoded, r#"{"you":1,"gfM":7}"#);
    }

    #[test]
    fn tree_shape_has_seven_slots() {
        let mut seen = vec![Slot::You];
        let mut cursor = 0;
        while cursor < seen.len() {
            let parents = seen[cursor].parents();
            seen.extend_from_slice(parents);
            cursor += 1;
        }
        assert_eq!(seen.len(), Slot::ALL.len());
    }
}
