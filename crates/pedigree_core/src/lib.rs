//! Core domain logic for the pedigree desktop app.
//! This crate owns project storage, the command bridge and slot bindings.

pub mod binding;
pub mod bridge;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod project;
pub mod repo;
pub mod service;
pub mod tree_view;

pub use binding::{
    resolve_slot, seed_if_empty, BindingError, BindingMap, BindingStore, PersonDirectory, Slot,
    SlotResolution,
};
pub use bridge::{
    call_with_timeout, BridgeError, BridgeResult, Command, CommandBridge, Envelope, FilePicker,
    LifecycleCommand, LifecycleOutcome, PresetPicker, TimedLifecycle, DEFAULT_LIFECYCLE_TIMEOUT,
};
pub use config::AppConfig;
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::person::{
    Person, PersonDraft, PersonForm, PersonId, PersonName, PersonRecord, PersonSummary,
    PersonUpdate, Sex,
};
pub use project::{ProjectError, ProjectResult, ProjectSession, StatusEvent};
pub use repo::person_repo::{PersonRepository, RepoError, RepoResult, SqlitePersonRepository};
pub use service::person_service::PersonService;
pub use tree_view::{build_pedigree, PedigreeNode};

/// Minimal health-check API for shell integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
