//! Process configuration resolved from the environment.
//!
//! # Responsibility
//! - Resolve data directory, binding file, log level and lifecycle timeout.
//!
//! # Invariants
//! - Blank or unparsable values fall back to defaults; resolution never fails.

use crate::bridge::DEFAULT_LIFECYCLE_TIMEOUT;
use crate::logging::default_log_level;
use log::warn;
use std::path::PathBuf;
use std::time::Duration;

pub const DATA_DIR_ENV: &str = "PEDIGREE_DATA_DIR";
pub const BINDINGS_PATH_ENV: &str = "PEDIGREE_BINDINGS_PATH";
pub const LOG_LEVEL_ENV: &str = "PEDIGREE_LOG_LEVEL";
pub const TIMEOUT_MS_ENV: &str = "PEDIGREE_TIMEOUT_MS";

const DEFAULT_DATA_DIR_NAME: &str = "pedigree";
const BINDINGS_FILE_NAME: &str = "bindings.json";

/// Resolved application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Directory where `project.new` creates project files.
    pub data_dir: PathBuf,
    /// Client-local binding map file.
    pub bindings_path: PathBuf,
    pub log_level: String,
    /// Client-side ceiling for lifecycle calls.
    pub lifecycle_timeout: Duration,
}

impl AppConfig {
    /// Resolves configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::resolve(|key| std::env::var(key).ok())
    }

    /// Resolves configuration through an arbitrary variable lookup.
    pub fn resolve(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let data_dir = non_blank(DATA_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DATA_DIR_NAME));
        let bindings_path = non_blank(BINDINGS_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join(BINDINGS_FILE_NAME));
        let log_level =
            non_blank(LOG_LEVEL_ENV).unwrap_or_else(|| default_log_level().to_string());
        let lifecycle_timeout = match non_blank(TIMEOUT_MS_ENV) {
            Some(raw) => match raw.parse::<u64>() {
                Ok(millis) if millis > 0 => Duration::from_millis(millis),
                _ => {
                    warn!("event=config_resolve module=config status=fallback key={TIMEOUT_MS_ENV}");
                    DEFAULT_LIFECYCLE_TIMEOUT
                }
            },
            None => DEFAULT_LIFECYCLE_TIMEOUT,
        };

        Self {
            data_dir,
            bindings_path,
            log_level,
            lifecycle_timeout,
        }
    }
}
