//! Command bridge between the presentation layer and project storage.
//!
//! # Responsibility
//! - Expose project lifecycle (`project.*`) and person (`person.*`) commands
//!   through one uniform call/response contract.
//! - Serialize every storage call through the single session connection.
//! - Relay the session's out-of-band status notifications.
//!
//! # Invariants
//! - Lifecycle calls return a tri-state `LifecycleOutcome`; user cancel is
//!   never reported as an error.
//! - Data call failures carry their message verbatim to the caller.
//! - File pickers run outside the session lock.
//! - Nothing here retries.

mod command;
mod timeout;

pub use command::{Command, Envelope};
pub use timeout::{
    call_with_timeout, LifecycleCommand, TimedLifecycle, DEFAULT_LIFECYCLE_TIMEOUT,
};

use crate::model::person::{
    PersonDraft, PersonForm, PersonId, PersonRecord, PersonSummary, PersonUpdate,
};
use crate::project::{ProjectError, ProjectSession, StatusEvent};
use log::{error, info, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// Source of user-chosen project paths (file dialogs in a desktop shell).
///
/// Returning `None` means the user dismissed the picker.
pub trait FilePicker: Send + Sync {
    /// Chooses an existing project file to open.
    fn pick_open(&self) -> Option<PathBuf>;
    /// Chooses a destination for save-as, starting from `current`.
    fn pick_save(&self, current: Option<&Path>) -> Option<PathBuf>;
}

/// Picker answering with preset paths, for headless callers and tests.
#[derive(Debug, Clone, Default)]
pub struct PresetPicker {
    pub open: Option<PathBuf>,
    pub save: Option<PathBuf>,
}

impl FilePicker for PresetPicker {
    fn pick_open(&self) -> Option<PathBuf> {
        self.open.clone()
    }

    fn pick_save(&self, _current: Option<&Path>) -> Option<PathBuf> {
        self.save.clone()
    }
}

/// Tri-state result of a lifecycle command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LifecycleOutcome {
    /// The command finished; `path` is the resulting project file.
    Completed { path: PathBuf },
    /// The user dismissed the file picker.
    Canceled,
    /// The command failed with a human-readable message.
    Failed { message: String },
}

impl LifecycleOutcome {
    fn label(&self) -> &'static str {
        match self {
            Self::Completed { .. } => "ok",
            Self::Canceled => "canceled",
            Self::Failed { .. } => "error",
        }
    }
}

/// Failure of a bridge data call.
#[derive(Debug)]
pub enum BridgeError {
    /// Storage or session failure, including "no project open".
    Project(ProjectError),
    /// Requested person id does not exist.
    PersonNotFound(PersonId),
    /// Command name is not part of the surface.
    UnknownCommand(String),
    /// Command payload could not be decoded.
    InvalidPayload {
        command: &'static str,
        message: String,
    },
}

impl BridgeError {
    /// Returns whether this failure means no project is open.
    pub fn is_not_open(&self) -> bool {
        matches!(self, Self::Project(ProjectError::NotOpen))
    }
}

impl Display for BridgeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Project(err) => write!(f, "{err}"),
            Self::PersonNotFound(id) => write!(f, "person not found: {id}"),
            Self::UnknownCommand(name) => write!(f, "unknown command: {name}"),
            Self::InvalidPayload { command, message } => {
                write!(f, "invalid payload for {command}: {message}")
            }
        }
    }
}

impl Error for BridgeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Project(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ProjectError> for BridgeError {
    fn from(value: ProjectError) -> Self {
        Self::Project(value)
    }
}

pub type BridgeResult<T> = Result<T, BridgeError>;

/// Shared handle to the project session.
///
/// Cloning is cheap; every clone talks to the same session.
#[derive(Clone)]
pub struct CommandBridge {
    session: Arc<Mutex<ProjectSession>>,
    picker: Arc<dyn FilePicker>,
    data_dir: PathBuf,
}

impl CommandBridge {
    /// Creates a bridge with no project open.
    ///
    /// `data_dir` is where `project.new` places fresh project files.
    pub fn new(picker: Arc<dyn FilePicker>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            session: Arc::new(Mutex::new(ProjectSession::new())),
            picker,
            data_dir: data_dir.into(),
        }
    }

    /// Registers a listener for out-of-band status events.
    pub fn subscribe(&self) -> Receiver<StatusEvent> {
        self.lock_session().subscribe()
    }

    /// Path of the active project, if any.
    pub fn current_path(&self) -> Option<PathBuf> {
        self.lock_session().current_path().map(Path::to_path_buf)
    }

    /// `project.new`: creates and opens a fresh project file.
    pub fn project_new(&self) -> LifecycleOutcome {
        let started_at = Instant::now();
        let result = self.lock_session().new_project(&self.data_dir).map(Some);
        finish_lifecycle("project.new", started_at, result)
    }

    /// `project.open`: opens a user-picked project file.
    ///
    /// The picker runs before the session is locked, so person calls keep
    /// flowing while a dialog is up.
    pub fn project_open(&self) -> LifecycleOutcome {
        let started_at = Instant::now();
        let result = match self.picker.pick_open() {
            Some(path) => self.lock_session().open(path).map(Some),
            None => Ok(None),
        };
        finish_lifecycle("project.open", started_at, result)
    }

    /// Opens a known path directly, without consulting the picker.
    pub fn project_open_path(&self, path: impl Into<PathBuf>) -> LifecycleOutcome {
        let started_at = Instant::now();
        let result = self.lock_session().open(path.into()).map(Some);
        finish_lifecycle("project.open", started_at, result)
    }

    /// `project.saveAs`: copies the active project to a user-picked path.
    ///
    /// Only the final copy holds the session lock.
    pub fn project_save_as(&self) -> LifecycleOutcome {
        let started_at = Instant::now();
        let result = match self.current_path() {
            None => Err(ProjectError::NotOpen),
            Some(current) => match self.picker.pick_save(Some(&current)) {
                Some(target) => self.lock_session().save_as(target).map(Some),
                None => Ok(None),
            },
        };
        finish_lifecycle("project.saveAs", started_at, result)
    }

    /// `person.list`.
    pub fn list_people(&self) -> BridgeResult<Vec<PersonSummary>> {
        self.run_data("person.list", |session| {
            session
                .with_people(|service| service.list_people())
                .map_err(Into::into)
        })
    }

    /// `person.get`.
    pub fn get_person(&self, id: PersonId) -> BridgeResult<PersonRecord> {
        self.run_data("person.get", |session| {
            session
                .with_people(|service| service.get_person(id))?
                .ok_or(BridgeError::PersonNotFound(id))
        })
    }

    /// One person flattened into the edit-form shape.
    pub fn get_person_form(&self, id: PersonId) -> BridgeResult<PersonForm> {
        self.run_data("person.form", |session| {
            session
                .with_people(|service| service.get_person_form(id))?
                .ok_or(BridgeError::PersonNotFound(id))
        })
    }

    /// Saves an edit form back as a full overwrite.
    pub fn save_person_form(&self, form: PersonForm) -> BridgeResult<PersonForm> {
        let update = PersonUpdate::from(form);
        self.update_person(&update).map(|record| record.to_form())
    }

    /// `person.create`.
    pub fn create_person(&self, draft: &PersonDraft) -> BridgeResult<PersonRecord> {
        self.run_data("person.create", |session| {
            session
                .with_people(|service| service.create_person(draft))
                .map_err(Into::into)
        })
    }

    /// `person.update`.
    pub fn update_person(&self, update: &PersonUpdate) -> BridgeResult<PersonRecord> {
        self.run_data("person.update", |session| {
            session
                .with_people(|service| service.update_person(update))
                .map_err(Into::into)
        })
    }

    fn run_data<T>(
        &self,
        command: &'static str,
        f: impl FnOnce(&ProjectSession) -> BridgeResult<T>,
    ) -> BridgeResult<T> {
        let started_at = Instant::now();
        let session = self.lock_session();
        let result = f(&*session);
        drop(session);
        match &result {
            Ok(_) => info!(
                "event=bridge_call module=bridge command={} status=ok duration_ms={}",
                command,
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=bridge_call module=bridge command={} status=error duration_ms={} error={}",
                command,
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    fn lock_session(&self) -> MutexGuard<'_, ProjectSession> {
        self.session.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
            warn!("event=session_lock module=bridge status=recovered reason=poisoned");
            poisoned.into_inner()
        })
    }
}

fn finish_lifecycle(
    command: &'static str,
    started_at: Instant,
    result: Result<Option<PathBuf>, ProjectError>,
) -> LifecycleOutcome {
    let outcome = match result {
        Ok(Some(path)) => LifecycleOutcome::Completed { path },
        Ok(None) => LifecycleOutcome::Canceled,
        Err(err) => LifecycleOutcome::Failed {
            message: err.to_string(),
        },
    };

    match &outcome {
        LifecycleOutcome::Failed { message } => error!(
            "event=bridge_call module=bridge command={} status=error duration_ms={} error={}",
            command,
            started_at.elapsed().as_millis(),
            message
        ),
        other => info!(
            "event=bridge_call module=bridge command={} status={} duration_ms={}",
            command,
            other.label(),
            started_at.elapsed().as_millis()
        ),
    }
    outcome
}
