//! Genealogy domain model.
//!
//! # Responsibility
//! - Define the person/name records shared by storage, bridge and views.
//! - Define create/update payloads with empty-string defaults.
//!
//! # Invariants
//! - Every person is identified by a store-assigned integer `PersonId`.
//! - A person has at most one primary name.
//! - People are never deleted.

pub mod person;
