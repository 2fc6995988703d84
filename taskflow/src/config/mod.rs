//! Configuration for the `taskflow` client.
//!
//! Layered, highest priority first:
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`<config_dir>/taskflow/config.toml`)
//! 4. Compiled defaults
//!
//! A missing default config file is not an error. An explicit `--config`
//! path that doesn't exist is.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};

use taskflow_proto::todo::{DEFAULT_NOTIFY_FREQUENCY, Priority, validate_notify_frequency};

use crate::notify::{self, CheckerConfig, Permission};
use crate::view::{SortBy, StatusFilter};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// A value parsed but is not usable.
    #[error("invalid config value {field}: {reason}")]
    Invalid {
        /// Dotted key, e.g. `notifications.check_interval_secs`.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// No session path configured and no data directory to default to.
    #[error("could not determine data directory for the session file")]
    NoDataDir,
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    api: ApiFileConfig,
    notifications: NotificationsFileConfig,
    session: SessionFileConfig,
    defaults: DefaultsFileConfig,
}

/// `[api]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ApiFileConfig {
    base_url: Option<String>,
    request_timeout_secs: Option<u64>,
}

/// `[notifications]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct NotificationsFileConfig {
    check_interval_secs: Option<u64>,
    overdue_window_minutes: Option<i64>,
    permission: Option<Permission>,
    refresh_interval_secs: Option<u64>,
}

/// `[session]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct SessionFileConfig {
    path: Option<PathBuf>,
}

/// `[defaults]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct DefaultsFileConfig {
    notify_frequency_minutes: Option<u32>,
    priority: Option<Priority>,
}

// ---------------------------------------------------------------------------
// Resolved configuration (concrete types, all fields populated)
// ---------------------------------------------------------------------------

/// Fully resolved client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    // -- API --
    /// Base URL of the REST API.
    pub api_url: String,
    /// Per-request timeout.
    pub request_timeout: Duration,

    // -- Notifications --
    /// Time between due-date scans.
    pub check_interval: Duration,
    /// Length of the "now overdue" window, in minutes.
    pub overdue_window_minutes: i64,
    /// Initial notification permission.
    pub permission: Permission,
    /// Time between list refreshes in `watch`.
    pub refresh_interval: Duration,

    // -- Session --
    /// Session file location.
    pub session_path: PathBuf,

    // -- Form defaults --
    /// Notify frequency for new todos, in minutes.
    pub default_notify_frequency: u32,
    /// Priority for new todos.
    pub default_priority: Priority,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080".to_string(),
            request_timeout: Duration::from_secs(10),
            check_interval: notify::DEFAULT_CHECK_INTERVAL,
            overdue_window_minutes: notify::DEFAULT_OVERDUE_WINDOW_MINUTES,
            permission: Permission::Default,
            refresh_interval: Duration::from_secs(300),
            session_path: default_session_path()
                .unwrap_or_else(|| std::env::temp_dir().join("taskflow-session.json")),
            default_notify_frequency: DEFAULT_NOTIFY_FREQUENCY,
            default_priority: Priority::Medium,
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// If `--config` is given and the file does not exist, returns an
    /// error. Otherwise the default path is tried and silently ignored if
    /// missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config file cannot be read or parsed,
    /// or a value is out of range.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Self::resolve(cli, &file)
    }

    /// Resolve a `ClientConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default. Separate from `load()` so it can be
    /// tested without touching the filesystem.
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let check_interval = file
            .notifications
            .check_interval_secs
            .map_or(defaults.check_interval, Duration::from_secs);
        if check_interval.is_zero() {
            return Err(invalid("notifications.check_interval_secs", "must be at least 1"));
        }
        let request_timeout = file
            .api
            .request_timeout_secs
            .map_or(defaults.request_timeout, Duration::from_secs);
        if request_timeout.is_zero() {
            return Err(invalid("api.request_timeout_secs", "must be at least 1"));
        }
        let refresh_interval = file
            .notifications
            .refresh_interval_secs
            .map_or(defaults.refresh_interval, Duration::from_secs);
        if refresh_interval.is_zero() {
            return Err(invalid("notifications.refresh_interval_secs", "must be at least 1"));
        }
        let overdue_window_minutes = file
            .notifications
            .overdue_window_minutes
            .unwrap_or(defaults.overdue_window_minutes);
        if overdue_window_minutes < 0 {
            return Err(invalid("notifications.overdue_window_minutes", "must not be negative"));
        }
        let default_notify_frequency = file
            .defaults
            .notify_frequency_minutes
            .map_or(Ok(defaults.default_notify_frequency), validate_notify_frequency)
            .map_err(|e| invalid("defaults.notify_frequency_minutes", e.to_string()))?;

        let session_path = match cli
            .session
            .clone()
            .or_else(|| file.session.path.clone())
        {
            Some(path) => path,
            None => default_session_path().ok_or(ConfigError::NoDataDir)?,
        };

        Ok(Self {
            api_url: cli
                .api_url
                .clone()
                .or_else(|| file.api.base_url.clone())
                .unwrap_or(defaults.api_url),
            request_timeout,
            check_interval,
            overdue_window_minutes,
            permission: file.notifications.permission.unwrap_or(defaults.permission),
            refresh_interval,
            session_path,
            default_notify_frequency,
            default_priority: file.defaults.priority.unwrap_or(defaults.default_priority),
        })
    }

    /// Settings for the notification checker.
    #[must_use]
    pub const fn checker(&self) -> CheckerConfig {
        CheckerConfig {
            interval: self.check_interval,
            overdue_window_minutes: self.overdue_window_minutes,
        }
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Personal task tracker with due-date notifications")]
pub struct CliArgs {
    /// Base URL of the TaskFlow API.
    #[arg(long, env = "TASKFLOW_API_URL")]
    pub api_url: Option<String>,

    /// Path to config file (default: `~/.config/taskflow/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to the session file.
    #[arg(long, env = "TASKFLOW_SESSION")]
    pub session: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "TASKFLOW_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/taskflow.log`).
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// What to do. Defaults to `list`.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Subcommands.
#[derive(clap::Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Log in and store the session.
    Login {
        /// Account name.
        username: String,
        /// Password; read from stdin when omitted.
        #[arg(long, env = "TASKFLOW_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Forget the stored session.
    Logout,
    /// Show todos.
    List(ListArgs),
    /// Show total, active and completed counts.
    Stats,
    /// Create a todo.
    Add(AddArgs),
    /// Change fields of a todo.
    Edit(EditArgs),
    /// Mark a todo completed.
    Complete {
        /// Todo id.
        id: String,
    },
    /// Mark a todo not completed.
    Reopen {
        /// Todo id.
        id: String,
    },
    /// Turn notifications for a todo on or off.
    ToggleNotify {
        /// Todo id.
        id: String,
    },
    /// Delete a todo.
    Delete {
        /// Todo id.
        id: String,
    },
    /// Move a todo to the position of another.
    Move {
        /// Todo to move.
        id: String,
        /// Todo whose position it takes.
        #[arg(long)]
        before: String,
    },
    /// Stay running and show due-date notifications.
    Watch,
}

/// Options for `list`.
#[derive(clap::Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ListArgs {
    /// Case-insensitive text to find in title or description.
    #[arg(long, default_value = "")]
    pub search: String,
    /// Completion state to show.
    #[arg(long, value_enum, default_value_t)]
    pub status: StatusFilter,
    /// Sort key.
    #[arg(long, value_enum, default_value_t)]
    pub sort: SortBy,
}

/// Fields for `add`.
#[derive(clap::Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct AddArgs {
    /// Title; must differ from every loaded title.
    pub title: String,
    #[arg(long)]
    pub description: Option<String>,
    /// Due time: RFC 3339, or `YYYY-MM-DD HH:MM` in local time.
    #[arg(long, value_parser = parse_due)]
    pub due: Option<DateTime<Utc>>,
    /// low, medium or high (default from config).
    #[arg(long)]
    pub priority: Option<Priority>,
    /// Minutes before the due time to start notifying (default from config).
    #[arg(long)]
    pub notify_frequency: Option<u32>,
    /// Create with notifications off.
    #[arg(long)]
    pub no_notify: bool,
    #[arg(long)]
    pub discord: bool,
    #[arg(long)]
    pub telegram: bool,
}

/// Fields for `edit`. Only given options change.
#[derive(clap::Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct EditArgs {
    /// Todo id.
    pub id: String,
    #[arg(long)]
    pub title: Option<String>,
    /// New description; an empty string clears it.
    #[arg(long)]
    pub description: Option<String>,
    /// New due time: RFC 3339, or `YYYY-MM-DD HH:MM` in local time.
    #[arg(long, value_parser = parse_due, conflicts_with = "clear_due")]
    pub due: Option<DateTime<Utc>>,
    /// Remove the due time.
    #[arg(long)]
    pub clear_due: bool,
    #[arg(long)]
    pub priority: Option<Priority>,
    #[arg(long)]
    pub notify_frequency: Option<u32>,
    #[arg(long)]
    pub discord: Option<bool>,
    #[arg(long)]
    pub telegram: Option<bool>,
}

/// Parses a due time given on the command line.
///
/// # Errors
///
/// Returns a message when `s` is neither RFC 3339 nor `YYYY-MM-DD HH:MM`.
pub fn parse_due(s: &str) -> Result<DateTime<Utc>, String> {
    let s = s.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Ok(t.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M"))
        .map_err(|_| format!("invalid due time '{s}' (expected RFC 3339 or YYYY-MM-DD HH:MM)"))?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
        .ok_or_else(|| format!("due time '{s}' does not exist in the local time zone"))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

fn default_session_path() -> Option<PathBuf> {
    Some(dirs::data_dir()?.join("taskflow").join("session.json"))
}

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and missing file
/// is treated as empty config.
fn load_config_file(explicit_path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(ConfigFile::default());
        };
        config_dir.join("taskflow").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
