//! Client-side ceiling for lifecycle calls.
//!
//! # Responsibility
//! - Run a lifecycle command off the caller's thread and stop waiting after
//!   a deadline, so an unresponsive session never freezes the caller.
//! - Map outcomes to the user-facing banner text.
//!
//! # Invariants
//! - A timed-out call is abandoned, not canceled; it may still finish.
//! - Timeout is reported distinctly from failure and from cancel.

use super::{CommandBridge, LifecycleOutcome};
use log::warn;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

/// Default ceiling applied by UI callers.
pub const DEFAULT_LIFECYCLE_TIMEOUT: Duration = Duration::from_secs(6);


/// Lifecycle commands eligible for a client-side timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleCommand {
    New,
    Open,
    SaveAs,
}

impl LifecycleCommand {
    pub fn name(self) -> &'static str {
        match self {
            Self::New => "project.new",
            Self::Open => "project.open",
            Self::SaveAs => "project.saveAs",
        }
    }

    /// Banner shown when no reply arrives in time.
    pub fn timed_out_message(self) -> &'static str {
        match self {
            Self::New => "Creating project timed out.",
            Self::Open => "Opening project timed out.",
            Self::SaveAs => "Saving project timed out.",
        }
    }

    /// Banner shown for a failure that carries no message.
    pub fn failed_message(self) -> &'static str {
        match self {
            Self::New => "Could not create project.",
            Self::Open => "Could not open project.",
            Self::SaveAs => "Could not save project.",
        }
    }

    fn run(self, bridge: &CommandBridge) -> LifecycleOutcome {
        match self {
            Self::New => bridge.project_new(),
            Self::Open => bridge.project_open(),
            Self::SaveAs => bridge.project_save_as(),
        }
    }
}

/// Lifecycle outcome as seen by a caller with a deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimedLifecycle {
    /// The command answered before the deadline.
    Finished(LifecycleOutcome),
    /// No answer before the deadline.
    TimedOut,
}

impl TimedLifecycle {
    /// Banner text for the user after `command`, or `None` when nothing
    /// should be shown.
    ///
    /// Success and user cancel show nothing.
    pub fn banner_message(&self, command: LifecycleCommand) -> Option<String> {
        match self {
            Self::Finished(LifecycleOutcome::Completed { .. })
            | Self::Finished(LifecycleOutcome::Canceled) => None,
            Self::Finished(LifecycleOutcome::Failed { message }) => {
                if message.trim().is_empty() {
                    Some(command.failed_message().to_string())
                } else {
                    Some(message.clone())
                }
            }
            Self::TimedOut => Some(command.timed_out_message().to_string()),
        }
    }
}

/// Runs `command` on a worker thread and waits at most `timeout`.
pub fn call_with_timeout(
    bridge: &CommandBridge,
    command: LifecycleCommand,
    timeout: Duration,
) -> TimedLifecycle {
    let (tx, rx) = mpsc::channel();
    let worker_bridge = bridge.clone();
    let spawned = thread::Builder::new()
        .name(format!("lifecycle-{}", command.name()))
        .spawn(move || {
            // The receiver may be gone after a timeout; the result is dropped.
            let _ = tx.send(command.run(&worker_bridge));
        });
    if let Err(err) = spawned {
        return TimedLifecycle::Finished(LifecycleOutcome::Failed {
            message: format!("failed to start {}: {err}", command.name()),
        });
    }

    match rx.recv_timeout(timeout) {
        Ok(outcome) => TimedLifecycle::Finished(outcome),
        Err(RecvTimeoutError::Timeout) => {
            warn!(
                "event=bridge_call module=bridge command={} status=timeout timeout_ms={}",
                command.name(),
                timeout.as_millis()
            );
            TimedLifecycle::TimedOut
        }
        Err(RecvTimeoutError::Disconnected) => TimedLifecycle::Finished(LifecycleOutcome::Failed {
            message: format!("{} worker stopped without a result", command.name()),
        }),
    }
}
