//! Named-command relay with JSON payloads.
//!
//! # Responsibility
//! - Decode `(command name, JSON payload)` pairs into typed `Command`s.
//! - Run them on a `CommandBridge` and normalize every result into one
//!   `Envelope` shape.
//!
//! # Invariants
//! - `ok == true` always carries `data`; `ok == false` carries `error`
//!   unless `canceled` is set.
//! - Error text is the failure's `Display` output, unmodified.

use super::{BridgeError, BridgeResult, CommandBridge, LifecycleOutcome};
use crate::model::person::{PersonDraft, PersonId, PersonUpdate};
use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Every command the bridge understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ProjectNew,
    ProjectOpen,
    ProjectSaveAs,
    PersonList,
    PersonGet(PersonId),
    PersonCreate(PersonDraft),
    PersonUpdate(PersonUpdate),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdPayload {
    Bare(PersonId),
    Object { id: PersonId },
}

impl Command {
    /// Decodes a named command and its payload.
    ///
    /// `Value::Null` stands for "no payload"; `person.create` treats it as an
    /// empty draft, `person.get` and `person.update` reject it.
    pub fn parse(name: &str, payload: Value) -> BridgeResult<Self> {
        match name {
            "project.new" => Ok(Self::ProjectNew),
            "project.open" => Ok(Self::ProjectOpen),
            "project.saveAs" => Ok(Self::ProjectSaveAs),
            "person.list" => Ok(Self::PersonList),
            "person.get" => {
                let id = match decode::<IdPayload>("person.get", payload)? {
                    IdPayload::Bare(id) | IdPayload::Object { id } => id,
                };
                Ok(Self::PersonGet(id))
            }
            "person.create" => {
                let payload = if payload.is_null() {
                    Value::Object(Default::default())
                } else {
                    payload
                };
                Ok(Self::PersonCreate(decode("person.create", payload)?))
            }
            "person.update" => Ok(Self::PersonUpdate(decode("person.update", payload)?)),
            other => Err(BridgeError::UnknownCommand(other.to_string())),
        }
    }

    /// Wire name of the command.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ProjectNew => "project.new",
            Self::ProjectOpen => "project.open",
            Self::ProjectSaveAs => "project.saveAs",
            Self::PersonList => "person.list",
            Self::PersonGet(_) => "person.get",
            Self::PersonCreate(_) => "person.create",
            Self::PersonUpdate(_) => "person.update",
        }
    }
}

fn decode<T: DeserializeOwned>(command: &'static str, payload: Value) -> BridgeResult<T> {
    serde_json::from_value(payload).map_err(|err| BridgeError::InvalidPayload {
        command,
        message: err.to_string(),
    })
}

/// Uniform response shape relayed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub canceled: bool,
}

impl Envelope {
    pub fn success(data: Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
            canceled: false,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(message.into()),
            canceled: false,
        }
    }

    pub fn canceled() -> Self {
        Self {
            ok: false,
            data: None,
            error: None,
            canceled: true,
        }
    }

    fn from_result<T: Serialize>(result: BridgeResult<T>) -> Self {
        match result {
            Ok(value) => match serde_json::to_value(value) {
                Ok(data) => Self::success(data),
                Err(err) => Self::failure(format!("failed to encode response: {err}")),
            },
            Err(err) => Self::failure(err.to_string()),
        }
    }

    fn from_lifecycle(outcome: LifecycleOutcome) -> Self {
        match outcome {
            LifecycleOutcome::Completed { path } => Self::success(serde_json::json!({
                "path": path.to_string_lossy(),
            })),
            LifecycleOutcome::Canceled => Self::canceled(),
            LifecycleOutcome::Failed { message } => Self::failure(message),
        }
    }
}

impl CommandBridge {
    /// Runs a typed command and wraps the result in an `Envelope`.
    pub fn execute(&self, command: Command) -> Envelope {
        match command {
            Command::ProjectNew => Envelope::from_lifecycle(self.project_new()),
            Command::ProjectOpen => Envelope::from_lifecycle(self.project_open()),
            Command::ProjectSaveAs => Envelope::from_lifecycle(self.project_save_as()),
            Command::PersonList => Envelope::from_result(self.list_people()),
            Command::PersonGet(id) => Envelope::from_result(self.get_person(id)),
            Command::PersonCreate(draft) => Envelope::from_result(self.create_person(&draft)),
            Command::PersonUpdate(update) => Envelope::from_result(self.update_person(&update)),
        }
    }

    /// Decodes and runs a named command.
    ///
    /// Never panics; decode failures come back as failure envelopes.
    pub fn dispatch(&self, name: &str, payload: Value) -> Envelope {
        match Command::parse(name, payload) {
            Ok(command) => self.execute(command),
            Err(err) => {
                warn!(
                    "event=bridge_dispatch module=bridge status=error command={} error={}",
                    name,
                    err
                );
                Envelope::failure(err.to_string())
            }
        }
    }
}
