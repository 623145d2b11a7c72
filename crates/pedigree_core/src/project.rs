//! Active project session.
//!
//! # Responsibility
//! - Own the single open project connection and its file path.
//! - Implement new/open/save-as lifecycle operations.
//! - Push `StatusEvent`s to subscribers when the active project changes.
//!
//! # Invariants
//! - At most one project is open; opening another closes the previous one.
//! - Person operations fail with `ProjectError::NotOpen` until a project opens.
//! - `save_as` copies the file and keeps the current project active.

use crate::db::{open_db, DbError};
use crate::repo::person_repo::{RepoError, SqlitePersonRepository};
use crate::service::person_service::PersonService;
use log::{error, info, warn};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{SystemTime, UNIX_EPOCH};

/// File extension used for new project files.
pub const PROJECT_FILE_EXTENSION: &str = "ftdb";
const PROJECT_FILE_PREFIX: &str = "FamilyTree";

/// Out-of-band notification pushed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    /// A project became active.
    ProjectOpened { path: PathBuf },
}

impl StatusEvent {
    /// Wire `type` tag of the event.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ProjectOpened { .. } => "project",
        }
    }
}

pub type ProjectResult<T> = Result<T, ProjectError>;

/// Errors from project lifecycle and person access.
#[derive(Debug)]
pub enum ProjectError {
    /// An operation needing an active project ran before one was opened.
    NotOpen,
    /// Project file could not be opened or bootstrapped.
    Db(DbError),
    /// Person storage failure.
    Repo(RepoError),
    /// File-system failure while creating or copying project files.
    Io {
        action: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
}

impl Display for ProjectError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotOpen => write!(
                f,
                "No project is open. Call project.new or project.open first."
            ),
            Self::Db(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Io {
                action,
                path,
                source,
            } => write!(f, "failed to {action} `{}`: {source}", path.display()),
        }
    }
}

impl Error for ProjectError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NotOpen => None,
            Self::Db(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Io { source, .. } => Some(source),
        }
    }
}

impl From<DbError> for ProjectError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<RepoError> for ProjectError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<rusqlite::Error> for ProjectError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

struct OpenProject {
    path: PathBuf,
    conn: Connection,
}

/// The one active project file, if any.
#[derive(Default)]
pub struct ProjectSession {
    active: Option<OpenProject>,
    subscribers: Vec<Sender<StatusEvent>>,
}

impl ProjectSession {
    /// Creates a session with no project open.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a status listener.
    ///
    /// Dropped receivers are pruned on the next emitted event.
    pub fn subscribe(&mut self) -> Receiver<StatusEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Returns whether a project is active.
    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }

    /// Path of the active project file.
    pub fn current_path(&self) -> Option<&Path> {
        self.active.as_ref().map(|project| project.path.as_path())
    }

    /// Opens (or creates) `path` and makes it the active project.
    ///
    /// # Side effects
    /// - Closes the previously active connection first.
    /// - Emits `StatusEvent::ProjectOpened`.
    pub fn open(&mut self, path: impl AsRef<Path>) -> ProjectResult<PathBuf> {
        let path = path.as_ref().to_path_buf();
        if let Some(previous) = self.active.take() {
            close_connection(previous);
        }

        let conn = open_db(&path)?;
        info!(
            "event=project_open module=project status=ok path={}",
            path.display()
        );
        self.active = Some(OpenProject {
            path: path.clone(),
            conn,
        });
        self.emit(StatusEvent::ProjectOpened { path: path.clone() });
        Ok(path)
    }

    /// Creates a fresh timestamped project file inside `data_dir` and opens it.
    pub fn new_project(&mut self, data_dir: impl AsRef<Path>) -> ProjectResult<PathBuf> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir).map_err(|source| ProjectError::Io {
            action: "create data directory",
            path: data_dir.to_path_buf(),
            source,
        })?;
        self.open(data_dir.join(new_project_file_name()))
    }

    /// Copies the active project file to `target`.
    ///
    /// The active project stays on its original path.
    pub fn save_as(&self, target: impl AsRef<Path>) -> ProjectResult<PathBuf> {
        let target = target.as_ref().to_path_buf();
        let project = self.active.as_ref().ok_or(ProjectError::NotOpen)?;
        if target == project.path {
            return Ok(target);
        }

        // Fold WAL frames into the main file so the copy is self-contained.
        project
            .conn
            .execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        std::fs::copy(&project.path, &target).map_err(|source| ProjectError::Io {
            action: "copy project to",
            path: target.clone(),
            source,
        })?;
        info!(
            "event=project_save_as module=project status=ok path={}",
            target.display()
        );
        Ok(target)
    }

    /// Runs `f` against the person service of the active project.
    pub fn with_people<T>(
        &self,
        f: impl FnOnce(&PersonService<SqlitePersonRepository<'_>>) -> Result<T, RepoError>,
    ) -> ProjectResult<T> {
        let project = self.active.as_ref().ok_or(ProjectError::NotOpen)?;
        let repo = SqlitePersonRepository::try_new(&project.conn)?;
        let service = PersonService::new(repo);
        f(&service).map_err(Into::into)
    }

    fn emit(&mut self, event: StatusEvent) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }
}

fn close_connection(project: OpenProject) {
    if let Err((_, err)) = project.conn.close() {
        warn!(
            "event=project_close module=project status=error path={} error={}",
            project.path.display(),
            err
        );
    }
}

fn new_project_file_name() -> String {
    let millis = match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_millis(),
        Err(err) => {
            error!("event=project_new module=project status=error error_code=clock_before_epoch error={err}");
            0
        }
    };
    format!("{PROJECT_FILE_PREFIX}-{millis}.{PROJECT_FILE_EXTENSION}")
}
