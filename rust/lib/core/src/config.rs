use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// Default loading timeout for list views, in milliseconds.
pub const DEFAULT_LOADING_TIMEOUT_MS: u64 = 2000;

/// Configuration shared by the admin tools.
///
/// Loaded from `~/.academy/config.toml` (or an explicit path), then
/// overridden by `--key=value` command-line arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct AcademyConfig {
    /// Directory holding the embedded database.
    pub data_dir: Option<PathBuf>,

    /// Path to the redb database file.
    /// Defaults to `{data_dir}/academy.redb` if not specified.
    pub db_path: Option<PathBuf>,

    /// How long a list view waits for its first snapshot before it reports
    /// `TimedOut`.
    pub loading_timeout_ms: u64,

    /// Display name stamped into `resolvedBy` by workflow actions.
    pub operator: String,

    /// Currency code used when printing money amounts.
    pub currency: String,
}

impl Default for AcademyConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            db_path: None,
            loading_timeout_ms: DEFAULT_LOADING_TIMEOUT_MS,
            operator: "admin".to_string(),
            currency: "USD".to_string(),
        }
    }
}

impl AcademyConfig {
    /// Default config file path: `~/.academy/config.toml`.
    pub fn default_path() -> PathBuf {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".academy").join("config.toml")
    }

    /// Load config from a TOML file, or return defaults if it doesn't exist.
    pub fn load(path: &Path) -> Result<Self, ServiceError> {
        if !path.exists() {
            tracing::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| ServiceError::Internal(format!("read {}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    /// Parse config from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ServiceError> {
        toml::from_str(content)
            .map_err(|e| ServiceError::Validation(format!("invalid config: {e}")))
    }

    /// Apply command-line overrides.
    ///
    /// Supported flags:
    /// - `--data-dir=PATH`
    /// - `--db=PATH`
    /// - `--loading-timeout-ms=N`
    /// - `--operator=NAME`
    /// - `--currency=CODE`
    ///
    /// Unknown flags and unparsable numbers are ignored.
    pub fn apply_args(mut self, args: &[String]) -> Self {
        for arg in args {
            if let Some(val) = arg.strip_prefix("--data-dir=") {
                self.data_dir = Some(PathBuf::from(val));
            } else if let Some(val) = arg.strip_prefix("--db=") {
                self.db_path = Some(PathBuf::from(val));
            } else if let Some(val) = arg.strip_prefix("--loading-timeout-ms=") {
                if let Ok(ms) = val.parse() {
                    self.loading_timeout_ms = ms;
                }
            } else if let Some(val) = arg.strip_prefix("--operator=") {
                self.operator = val.to_string();
            } else if let Some(val) = arg.strip_prefix("--currency=") {
                self.currency = val.to_string();
            }
        }
        self
    }

    /// Resolve the redb database path, falling back to `{data_dir}/academy.redb`.
    pub fn resolve_db_path(&self) -> PathBuf {
        self.db_path.clone().unwrap_or_else(|| {
            self.data_dir
                .as_ref()
                .map(|d| d.join("academy.redb"))
                .unwrap_or_else(|| PathBuf::from("academy.redb"))
        })
    }

    pub fn loading_timeout(&self) -> Duration {
        Duration::from_millis(self.loading_timeout_ms)
    }
}
