//! CLI entry point.
//!
//! # Responsibility
//! - Print core linkage info when run without arguments.
//! - Run one bridge command against a project file:
//!   `pedigree <project.ftdb> <command> [payload-json]`.
//!
//! # Invariants
//! - Output is one JSON envelope per command; exit code 1 when `ok` is false.

use pedigree_core::{CommandBridge, Envelope, LifecycleOutcome, PresetPicker};
use serde_json::Value;
use std::process::ExitCode;
use std::sync::Arc;

const USAGE: &str = "usage: pedigree <project.ftdb> <command> [payload-json]";

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        println!("pedigree_core ping={}", pedigree_core::ping());
        println!("pedigree_core version={}", pedigree_core::core_version());
        return ExitCode::SUCCESS;
    }

    let envelope = match args.as_slice() {
        [project, command] => run(project, command, None),
        [project, command, payload] => run(project, command, Some(payload.as_str())),
        _ => {
            eprintln!("{USAGE}");
            return ExitCode::from(2);
        }
    };

    match serde_json::to_string_pretty(&envelope) {
        Ok(encoded) => println!("{encoded}"),
        Err(err) => {
            eprintln!("failed to encode response: {err}");
            return ExitCode::FAILURE;
        }
    }
    if envelope.ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn run(project: &str, command: &str, payload: Option<&str>) -> Envelope {
    let payload = match payload.map(|raw| serde_json::from_str::<Value>(raw)) {
        None => Value::Null,
        Some(Ok(value)) => value,
        Some(Err(err)) => return Envelope::failure(format!("invalid payload JSON: {err}")),
    };

    let data_dir = std::path::Path::new(project)
        .parent()
        .map(|parent| parent.to_path_buf())
        .unwrap_or_default();
    let bridge = CommandBridge::new(Arc::new(PresetPicker::default()), data_dir);
    match bridge.project_open_path(project) {
        LifecycleOutcome::Completed { .. } => bridge.dispatch(command, payload),
        LifecycleOutcome::Canceled => Envelope::canceled(),
        LifecycleOutcome::Failed { message } => Envelope::failure(message),
    }
}
