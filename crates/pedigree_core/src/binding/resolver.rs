//! Slot resolution: bound id, name match, or lazy creation.
//!
//! # Responsibility
//! - Turn a slot selection into a person id.
//! - Match unbound slots to existing people by display name before creating.
//! - Seed all seven slots with placeholders for an empty project.
//!
//! # Invariants
//! - A bound slot resolves without listing or creating anything.
//! - Name matching is exact after trimming, whitespace folding and lowercasing.
//! - A failed list/create leaves the slot unbound.

use super::{BindingError, BindingStore, Slot};
use crate::bridge::{BridgeError, CommandBridge};
use crate::model::person::{
    format_display_name, PersonDraft, PersonId, PersonRecord, PersonSummary,
};
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Display;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));
static SELF_LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^you$").expect("valid self label regex"));

/// People source the resolver reads from and creates into.
pub trait PersonDirectory {
    type Error: Display;

    fn list_people(&self) -> Result<Vec<PersonSummary>, Self::Error>;
    fn create_person(&self, draft: &PersonDraft) -> Result<PersonRecord, Self::Error>;
}

impl PersonDirectory for CommandBridge {
    type Error = BridgeError;

    fn list_people(&self) -> Result<Vec<PersonSummary>, BridgeError> {
        CommandBridge::list_people(self)
    }

    fn create_person(&self, draft: &PersonDraft) -> Result<PersonRecord, BridgeError> {
        CommandBridge::create_person(self, draft)
    }
}

/// How a slot got its person.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotResolution {
    /// The slot was already bound.
    AlreadyBound(PersonId),
    /// Bound to an existing person with a matching name.
    Matched(PersonId),
    /// Bound to a newly created person.
    Created(PersonId),
}

impl SlotResolution {
    pub fn person_id(self) -> PersonId {
        match self {
            Self::AlreadyBound(id) | Self::Matched(id) | Self::Created(id) => id,
        }
    }

    pub fn created(self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Given/family pair parsed from a node label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLabel {
    pub given: String,
    pub family: String,
}

impl ParsedLabel {
    pub fn display_name(&self) -> String {
        format_display_name(&self.given, &self.family)
    }
}

/// Splits a node label into given/family.
///
/// - `"Family, Given"` splits at the first comma.
/// - `"you"` (any case) becomes given `You`.
/// - Anything else is taken whole as the given name.
pub fn parse_label(label: &str) -> ParsedLabel {
    let trimmed = label.trim();
    if let Some((family, given)) = trimmed.split_once(',') {
        return ParsedLabel {
            given: given.trim().to_string(),
            family: family.trim().to_string(),
        };
    }
    if SELF_LABEL_RE.is_match(trimmed) {
        return ParsedLabel {
            given: "You".to_string(),
            family: String::new(),
        };
    }
    ParsedLabel {
        given: trimmed.to_string(),
        family: String::new(),
    }
}

/// Comparison key for display names and labels.
pub fn normalize_label(value: &str) -> String {
    WHITESPACE_RE
        .replace_all(value.trim(), " ")
        .to_lowercase()
}

/// Resolves `slot` to a person id, binding it on first use.
///
/// `node_label` is the text shown on the tree node; the slot's fallback label
/// is used when it is `None`.
pub fn resolve_slot<D: PersonDirectory>(
    directory: &D,
    store: &mut BindingStore,
    slot: Slot,
    node_label: Option<&str>,
) -> Result<SlotResolution, BindingError> {
    if let Some(person_id) = store.get(slot) {
        return Ok(SlotResolution::AlreadyBound(person_id));
    }

    let label = node_label.unwrap_or_else(|| slot.fallback_label());
    let parsed = parse_label(label);
    let candidates = match_candidates(slot, label, &parsed);

    let people = directory
        .list_people()
        .map_err(|err| directory_error(slot, err))?;
    let matched = people.iter().find(|person| {
        let name = normalize_label(&person.display_name());
        !name.is_empty() && candidates.contains(&name)
    });

    let resolution = match matched {
        Some(person) => SlotResolution::Matched(person.id),
        None => {
            let draft = PersonDraft::named(parsed.given, parsed.family);
            let record = directory
                .create_person(&draft)
                .map_err(|err| directory_error(slot, err))?;
            SlotResolution::Created(record.person.id)
        }
    };

    store.bind(slot, resolution.person_id())?;
    info!(
        "event=slot_bind module=binding status=ok slot={} person_id={} created={}",
        slot,
        resolution.person_id(),
        resolution.created()
    );
    Ok(resolution)
}

/// Binds every slot to a placeholder person when the project has nobody yet.
///
/// Returns `None` when people already exist and nothing was seeded.
pub fn seed_if_empty<D: PersonDirectory>(
    directory: &D,
    store: &mut BindingStore,
) -> Result<Option<Vec<(Slot, SlotResolution)>>, BindingError> {
    let existing = directory
        .list_people()
        .map_err(|err| directory_error(Slot::You, err))?;
    if !existing.is_empty() {
        return Ok(None);
    }

    let mut resolved = Vec::with_capacity(Slot::ALL.len());
    for slot in Slot::ALL {
        let resolution = resolve_slot(directory, store, slot, Some(slot.seed_label()))?;
        resolved.push((slot, resolution));
    }
    info!(
        "event=slot_seed module=binding status=ok created={}",
        resolved
            .iter()
            .filter(|(_, resolution)| resolution.created())
            .count()
    );
    Ok(Some(resolved))
}

fn match_candidates(slot: Slot, label: &str, parsed: &ParsedLabel) -> Vec<String> {
    let mut candidates = Vec::with_capacity(3);
    for value in [
        normalize_label(slot.fallback_label()),
        normalize_label(label),
        normalize_label(&parsed.display_name()),
    ] {
        if !value.is_empty() && !candidates.contains(&value) {
            candidates.push(value);
        }
    }
    candidates
}

fn directory_error(slot: Slot, err: impl Display) -> BindingError {
    warn!("event=slot_bind module=binding status=error slot={slot} error={err}");
    BindingError::Directory {
        slot,
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_label, parse_label, ParsedLabel};

    #[test]
    fn comma_label_splits_family_then_given() {
        assert_eq!(
            parse_label("Maternal, Grandfather"),
            ParsedLabel {
                given: "Grandfather".to_string(),
                family: "Maternal".to_string(),
            }
        );
    }

    #[test]
    fn comma_split_happens_once() {
        let parsed = parse_label("Byron, Ada, Countess");
        assert_eq!(parsed.family, "Byron");
        assert_eq!(parsed.given, "Ada, Countess");
    }

    #[test]
    fn you_label_is_case_insensitive() {
        assert_eq!(parse_label(" YOU ").given, "You");
        assert_eq!(parse_label("you").family, "");
    }

    #[test]
    fn plain_label_becomes_given_name() {
        let parsed = parse_label("Father");
        assert_eq!(parsed.given, "Father");
        assert_eq!(parsed.family, "");
    }

    #[test]
    fn normalize_folds_case_and_whitespace() {
        assert_eq!(normalize_label("  Ada\t  LOVELACE "), "ada lovelace");
    }
}
