//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose project lifecycle, person commands and slot bindings to Dart via FRB.
//! - Own the one process-global command bridge and binding store.
//! - Apply the client-side timeout to lifecycle calls.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Dialogs live on the Dart side; a `None` path means the user canceled.
//! - Bindings follow the project they were made in: reopening it keeps them,
//!   opening or creating any other project clears them.

use log::{info, warn};
use pedigree_core::{
    build_pedigree, call_with_timeout, core_version as core_version_inner,
    init_logging as init_logging_inner, ping as ping_inner, resolve_slot, seed_if_empty,
    AppConfig, BindingStore, CommandBridge, Envelope, FilePicker, LifecycleCommand,
    LifecycleOutcome, PersonForm, Slot, StatusEvent, TimedLifecycle,
};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

static FFI_STATE: OnceLock<FfiState> = OnceLock::new();

/// Picker fed by paths the Dart side chose in its own dialogs.
#[derive(Default)]
struct HandoffPicker {
    open: Mutex<Option<PathBuf>>,
    save: Mutex<Option<PathBuf>>,
}

impl HandoffPicker {
    fn hand_open(&self, path: Option<PathBuf>) {
        *lock_or_recover(&self.open) = path;
    }

    fn hand_save(&self, path: Option<PathBuf>) {
        *lock_or_recover(&self.save) = path;
    }
}

impl FilePicker for HandoffPicker {
    fn pick_open(&self) -> Option<PathBuf> {
        lock_or_recover(&self.open).take()
    }

    fn pick_save(&self, _current: Option<&Path>) -> Option<PathBuf> {
        lock_or_recover(&self.save).take()
    }
}

struct BindingState {
    store: BindingStore,
    events: Receiver<StatusEvent>,
}

impl BindingState {
    /// Hands the bindings to each project opened since the last call.
    fn follow_project_changes(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                StatusEvent::ProjectOpened { path } => match self.store.adopt_project(&path) {
                    Ok(true) => info!("event=bindings_clear module=ffi status=ok reason=project_changed"),
                    Ok(false) => {}
                    Err(err) => warn!("event=bindings_clear module=ffi status=error error={err}"),
                },
            }
        }
    }
}

struct FfiState {
    config: AppConfig,
    bridge: CommandBridge,
    picker: Arc<HandoffPicker>,
    bindings: Mutex<BindingState>,
}

impl FfiState {
    fn from_config(config: AppConfig) -> Self {
        let picker = Arc::new(HandoffPicker::default());
        let bridge = CommandBridge::new(picker.clone(), config.data_dir.clone());
        let events = bridge.subscribe();
        let store = match BindingStore::load(&config.bindings_path) {
            Ok(store) => store,
            Err(err) => {
                warn!("event=bindings_load module=ffi status=fallback reason=unreadable error={err}");
                BindingStore::in_memory()
            }
        };
        Self {
            config,
            bridge,
            picker,
            bindings: Mutex::new(BindingState { store, events }),
        }
    }

    fn lifecycle(&self, command: LifecycleCommand) -> ProjectActionResponse {
        let timed = call_with_timeout(&self.bridge, command, self.config.lifecycle_timeout);
        ProjectActionResponse::from_timed(command, timed)
    }

    fn lock_bindings(&self) -> MutexGuard<'_, BindingState> {
        let mut guard = lock_or_recover(&self.bindings);
        guard.follow_project_changes();
        guard
    }

    fn project_open(&self, path: Option<String>) -> ProjectActionResponse {
        self.picker.hand_open(non_blank_path(path));
        self.lifecycle(LifecycleCommand::Open)
    }

    fn project_save_as(&self, path: Option<String>) -> ProjectActionResponse {
        self.picker.hand_save(non_blank_path(path));
        self.lifecycle(LifecycleCommand::SaveAs)
    }

    fn current_project(&self) -> Option<String> {
        self.bridge
            .current_path()
            .map(|path| path.to_string_lossy().into_owned())
    }

    fn dispatch(&self, command: &str, payload_json: &str) -> String {
        let envelope = match parse_payload(payload_json) {
            Ok(payload) => self.bridge.dispatch(command.trim(), payload),
            Err(message) => Envelope::failure(message),
        };
        encode_envelope(&envelope)
    }

    fn person_form(&self, id: i64) -> String {
        let envelope = match self.bridge.get_person_form(id) {
            Ok(form) => encode_data(&form),
            Err(err) => Envelope::failure(err.to_string()),
        };
        encode_envelope(&envelope)
    }

    fn save_person_form(&self, form_json: &str) -> String {
        let form = match serde_json::from_str::<PersonForm>(form_json.trim()) {
            Ok(form) => form,
            Err(err) => {
                return encode_envelope(&Envelope::failure(format!(
                    "invalid person form JSON: {err}"
                )))
            }
        };
        let envelope = match self.bridge.save_person_form(form) {
            Ok(saved) => encode_data(&saved),
            Err(err) => Envelope::failure(err.to_string()),
        };
        encode_envelope(&envelope)
    }

    fn select_slot(&self, slot_key: &str, node_label: Option<&str>) -> SlotSelectResponse {
        let Some(slot) = Slot::from_key(slot_key.trim()) else {
            return SlotSelectResponse {
                ok: false,
                person_id: None,
                created: false,
                message: format!("unknown slot: {}", slot_key.trim()),
            };
        };

        let mut bindings = self.lock_bindings();
        match resolve_slot(&self.bridge, &mut bindings.store, slot, node_label) {
            Ok(resolution) => SlotSelectResponse {
                ok: true,
                person_id: Some(resolution.person_id()),
                created: resolution.created(),
                message: String::new(),
            },
            Err(err) => SlotSelectResponse {
                ok: false,
                person_id: None,
                created: false,
                message: err.to_string(),
            },
        }
    }

    fn seed_tree(&self) -> SeedTreeResponse {
        let mut bindings = self.lock_bindings();
        match seed_if_empty(&self.bridge, &mut bindings.store) {
            Ok(Some(resolved)) => SeedTreeResponse {
                ok: true,
                seeded: true,
                created: resolved
                    .iter()
                    .filter(|(_, resolution)| resolution.created())
                    .count() as u32,
                message: String::new(),
            },
            Ok(None) => SeedTreeResponse {
                ok: true,
                seeded: false,
                created: 0,
                message: String::new(),
            },
            Err(err) => SeedTreeResponse {
                ok: false,
                seeded: false,
                created: 0,
                message: err.to_string(),
            },
        }
    }

    fn pedigree_tree(&self) -> String {
        let people = match self.bridge.list_people() {
            Ok(people) => people,
            Err(err) => return encode_envelope(&Envelope::failure(err.to_string())),
        };
        let bindings = self.lock_bindings();
        let tree = build_pedigree(&people, bindings.store.map());
        drop(bindings);
        encode_envelope(&encode_data(&tree))
    }
}

fn state() -> &'static FfiState {
    FFI_STATE.get_or_init(|| FfiState::from_config(AppConfig::from_env()))
}

fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: `trace|debug|info|warn|error`; blank uses `PEDIGREE_LOG_LEVEL`
///   or the build default.
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir`.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    let level = if level.trim().is_empty() {
        state().config.log_level.clone()
    } else {
        level
    };
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Result of a project lifecycle call as shown by the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectActionResponse {
    /// Whether the project command completed.
    pub ok: bool,
    /// User dismissed the dialog; no banner should be shown.
    pub canceled: bool,
    /// No reply within the lifecycle timeout. The call may still finish.
    pub timed_out: bool,
    /// Active project path after a completed call.
    pub path: Option<String>,
    /// Banner text; empty when nothing should be shown.
    pub message: String,
}

impl ProjectActionResponse {
    fn from_timed(command: LifecycleCommand, timed: TimedLifecycle) -> Self {
        let message = timed.banner_message(command).unwrap_or_default();
        match timed {
            TimedLifecycle::Finished(LifecycleOutcome::Completed { path }) => Self {
                ok: true,
                canceled: false,
                timed_out: false,
                path: Some(path.to_string_lossy().into_owned()),
                message,
            },
            TimedLifecycle::Finished(LifecycleOutcome::Canceled) => Self {
                ok: false,
                canceled: true,
                timed_out: false,
                path: None,
                message,
            },
            TimedLifecycle::Finished(LifecycleOutcome::Failed { .. }) => Self {
                ok: false,
                canceled: false,
                timed_out: false,
                path: None,
                message,
            },
            TimedLifecycle::TimedOut => Self {
                ok: false,
                canceled: false,
                timed_out: true,
                path: None,
                message,
            },
        }
    }
}

/// Creates a fresh project file in the configured data directory and opens it.
///
/// # FFI contract
/// - Blocks for at most the lifecycle timeout.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn project_new() -> ProjectActionResponse {
    state().lifecycle(LifecycleCommand::New)
}

/// Opens the project the user picked; `None` reports a canceled dialog.
#[flutter_rust_bridge::frb(sync)]
pub fn project_open(path: Option<String>) -> ProjectActionResponse {
    state().project_open(path)
}

/// Copies the active project to the picked path; `None` reports a canceled dialog.
#[flutter_rust_bridge::frb(sync)]
pub fn project_save_as(path: Option<String>) -> ProjectActionResponse {
    state().project_save_as(path)
}

/// Path of the active project, if any.
#[flutter_rust_bridge::frb(sync)]
pub fn current_project() -> Option<String> {
    state().current_project()
}

/// Runs a named bridge command with a JSON payload.
///
/// Input semantics:
/// - `command`: `project.*` or `person.*` command name.
/// - `payload_json`: JSON text; blank means no payload.
///
/// # FFI contract
/// - Never panics; always returns a JSON envelope
///   `{ "ok": bool, "data"?: .., "error"?: "..", "canceled"?: true }`.
#[flutter_rust_bridge::frb(sync)]
pub fn dispatch(command: String, payload_json: String) -> String {
    state().dispatch(&command, &payload_json)
}

/// Loads one person in the flat edit-form shape.
///
/// Returns a JSON envelope whose `data` is
/// `{ id, given, family, birth_date, death_date, occupation, sex, notes }`.
#[flutter_rust_bridge::frb(sync)]
pub fn person_form(id: i64) -> String {
    state().person_form(id)
}

/// Saves an edit form and returns the stored form in a JSON envelope.
///
/// Input semantics:
/// - `form_json`: the object `person_form` returned, with edited fields.
///   Every field is written; the primary name is replaced.
#[flutter_rust_bridge::frb(sync)]
pub fn save_person_form(form_json: String) -> String {
    state().save_person_form(&form_json)
}

/// Outcome of selecting a tree slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotSelectResponse {
    pub ok: bool,
    /// Person the slot now points at.
    pub person_id: Option<i64>,
    /// Whether a new person row was created for the slot.
    pub created: bool,
    pub message: String,
}

/// Resolves a tree slot to a person, binding it on first use.
///
/// Input semantics:
/// - `slot_key`: one of `you|f|m|gfP|gmP|gfM|gmM`.
/// - `node_label`: text shown on the node; `None` uses the slot's fallback label.
#[flutter_rust_bridge::frb(sync)]
pub fn select_slot(slot_key: String, node_label: Option<String>) -> SlotSelectResponse {
    state().select_slot(&slot_key, node_label.as_deref())
}

/// Outcome of first-use seeding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedTreeResponse {
    pub ok: bool,
    /// False when the project already had people.
    pub seeded: bool,
    /// Placeholder persons created.
    pub created: u32,
    pub message: String,
}

/// Fills every slot with a placeholder person when the project is empty.
#[flutter_rust_bridge::frb(sync)]
pub fn seed_tree() -> SeedTreeResponse {
    state().seed_tree()
}

/// Current pedigree tree as a JSON envelope whose `data` is the root node.
#[flutter_rust_bridge::frb(sync)]
pub fn pedigree_tree() -> String {
    state().pedigree_tree()
}

fn non_blank_path(path: Option<String>) -> Option<PathBuf> {
    path.map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
        .map(PathBuf::from)
}

fn parse_payload(raw: &str) -> Result<Value, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(trimmed).map_err(|err| format!("invalid payload JSON: {err}"))
}

fn encode_data<T: Serialize>(data: &T) -> Envelope {
    match serde_json::to_value(data) {
        Ok(value) => Envelope::success(value),
        Err(err) => Envelope::failure(format!("failed to encode response: {err}")),
    }
}

fn encode_envelope(envelope: &Envelope) -> String {
    serde_json::to_string(envelope).unwrap_or_else(|err| {
        warn!("event=envelope_encode module=ffi status=error error={err}");
        r#"{"ok":false,"error":"failed to encode response"}"#.to_string()
    })
}
