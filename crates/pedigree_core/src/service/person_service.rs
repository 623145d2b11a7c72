//! Person use-case service.
//!
//! # Responsibility
//! - Provide stable person entry points for the bridge and tests.
//! - Delegate persistence to repository implementations.
//!
//! # Invariants
//! - Service APIs never bypass repository transactions.
//! - Service layer remains storage-agnostic.

use crate::model::person::{
    PersonDraft, PersonForm, PersonId, PersonRecord, PersonSummary, PersonUpdate,
};
use crate::repo::person_repo::{PersonRepository, RepoResult};
use log::debug;

/// Use-case service wrapper for person operations.
pub struct PersonService<R: PersonRepository> {
    repo: R,
}

impl<R: PersonRepository> PersonService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Lists people for display, ordered by family, given, id.
    pub fn list_people(&self) -> RepoResult<Vec<PersonSummary>> {
        let people = self.repo.list_people()?;
        debug!(
            "event=person_list module=service status=ok count={}",
            people.len()
        );
        Ok(people)
    }

    /// Gets one hydrated person, or `None` for an unknown id.
    pub fn get_person(&self, id: PersonId) -> RepoResult<Option<PersonRecord>> {
        self.repo.get_person(id)
    }

    /// Gets one person flattened into the edit-form shape.
    pub fn get_person_form(&self, id: PersonId) -> RepoResult<Option<PersonForm>> {
        Ok(self.repo.get_person(id)?.map(|record| record.to_form()))
    }

    /// Creates a person with a primary name.
    ///
    /// # Contract
    /// - `death_date`/`notes` start empty and `sex` starts as `U`.
    /// - Returns the hydrated record read back after commit.
    pub fn create_person(&self, draft: &PersonDraft) -> RepoResult<PersonRecord> {
        let record = self.repo.create_person(draft)?;
        debug!(
            "event=person_create module=service status=ok person_id={}",
            record.person.id
        );
        Ok(record)
    }

    /// Overwrites every mutable field of an existing person.
    ///
    /// Last write wins; nothing is merged with the prior state.
    pub fn update_person(&self, update: &PersonUpdate) -> RepoResult<PersonRecord> {
        let record = self.repo.update_person(update)?;
        debug!(
            "event=person_update module=service status=ok person_id={}",
            record.person.id
        );
        Ok(record)
    }
}
