//! Pedigree tree view model.
//!
//! Builds the fixed three-generation node tree from the people listing and
//! the current bindings. Rendering is left to the UI.

use crate::binding::{BindingMap, Slot};
use crate::model::person::{PersonId, PersonSummary};
use serde::Serialize;
use std::collections::HashMap;

const EMPTY_TEXT: &str = "—";

/// One card in the pedigree tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PedigreeNode {
    pub slot: Slot,
    /// Bound person, if the binding points at an existing row.
    pub person_id: Option<PersonId>,
    pub title: String,
    pub subtitle: String,
    pub children: Vec<PedigreeNode>,
}

impl PedigreeNode {
    /// Depth-first walk starting at this node.
    pub fn walk(&self) -> Vec<&PedigreeNode> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children.iter().rev());
        }
        out
    }
}

/// Builds the tree rooted at `Slot::You`.
///
/// Unbound slots, and slots bound to ids missing from `people`, show the
/// slot's fallback label.
pub fn build_pedigree(people: &[PersonSummary], bindings: &BindingMap) -> PedigreeNode {
    let by_id: HashMap<PersonId, &PersonSummary> =
        people.iter().map(|person| (person.id, person)).collect();
    build_node(Slot::You, &by_id, bindings)
}

fn build_node(
    slot: Slot,
    by_id: &HashMap<PersonId, &PersonSummary>,
    bindings: &BindingMap,
) -> PedigreeNode {
    let person = bindings
        .get(&slot)
        .and_then(|person_id| by_id.get(person_id).copied());

    let (title, subtitle) = match person {
        Some(person) => {
            let name = person.display_name();
            let title = if name.is_empty() {
                EMPTY_TEXT.to_string()
            } else {
                name
            };
            let subtitle = if person.occupation.trim().is_empty() {
                EMPTY_TEXT.to_string()
            } else {
                person.occupation.clone()
            };
            (title, subtitle)
        }
        None => (slot.fallback_label().to_string(), EMPTY_TEXT.to_string()),
    };

    PedigreeNode {
        slot,
        person_id: person.map(|person| person.id),
        title,
        subtitle,
        children: slot
            .parents()
            .iter()
            .map(|parent| build_node(*parent, by_id, bindings))
            .collect(),
    }
}
