//! Todo wire types for the TaskFlow REST API.
//!
//! Field names on the wire follow the server (`user_id`, `notify_frequency`);
//! the Rust field names describe what the values mean. Timestamps travel as
//! RFC 3339 strings.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Smallest accepted notification lead time, in minutes.
pub const MIN_NOTIFY_FREQUENCY: u32 = 1;

/// Largest accepted notification lead time (one week), in minutes.
pub const MAX_NOTIFY_FREQUENCY: u32 = 10_080;

/// Lead time used when a new todo does not specify one.
pub const DEFAULT_NOTIFY_FREQUENCY: u32 = 60;

/// Server-assigned todo identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoId(String);

impl TodoId {
    /// Wraps a raw identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as sent on the wire.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Priority of a todo.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Can wait.
    Low,
    /// The default for new todos.
    #[default]
    Medium,
    /// Needs attention first.
    High,
}

impl Priority {
    /// Sort rank: high=3, medium=2, low=1.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Error returned when a string is not a known [`Priority`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown priority '{0}' (expected low, medium or high)")]
pub struct ParsePriorityError(String);

impl FromStr for Priority {
    type Err = ParsePriorityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(ParsePriorityError(s.to_string())),
        }
    }
}

/// A todo as returned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    /// Server-assigned identifier.
    pub id: TodoId,
    /// Owner of the todo.
    #[serde(rename = "user_id")]
    pub owner_id: String,
    /// Short, non-empty title. Unique per owner (checked client-side only).
    pub title: String,
    /// Optional free-form details.
    #[serde(default)]
    pub description: Option<String>,
    /// Optional due time.
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    /// Priority.
    pub priority: Priority,
    /// Whether the todo is done.
    pub completed: bool,
    /// Whether due-time notifications are wanted.
    pub notify_enabled: bool,
    /// Minutes before the due time at which "due soon" notifications start.
    #[serde(rename = "notify_frequency")]
    pub notify_frequency_minutes: u32,
    /// Position in the user's chosen display order.
    pub order_index: u32,
    /// Creation time (server clock).
    pub created_at: DateTime<Utc>,
    /// Last modification time (server clock).
    pub updated_at: DateTime<Utc>,
    /// Forward notifications to Discord (server-side delivery).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discord_enabled: Option<bool>,
    /// Forward notifications to Telegram (server-side delivery).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram_enabled: Option<bool>,
}

/// Body of `POST /api/todos`.
///
/// Only `title` is required; everything else falls back to server defaults
/// when omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTodo {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify_enabled: Option<bool>,
    #[serde(
        default,
        rename = "notify_frequency",
        skip_serializing_if = "Option::is_none"
    )]
    pub notify_frequency_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discord_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram_enabled: Option<bool>,
}

impl NewTodo {
    /// A request with only a title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Body of `PUT /api/todos/{id}`: a partial update.
///
/// Unset fields are omitted from the JSON body. `description` is doubly
/// optional so it can be cleared: `Some(None)` serializes as `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TodoPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify_enabled: Option<bool>,
    #[serde(rename = "notify_frequency", skip_serializing_if = "Option::is_none")]
    pub notify_frequency_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discord_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegram_enabled: Option<bool>,
}

impl TodoPatch {
    /// A patch that only sets the completion flag.
    #[must_use]
    pub fn completed(done: bool) -> Self {
        Self {
            completed: Some(done),
            ..Self::default()
        }
    }

    /// Returns `true` if the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Applies every set field to `todo`. Timestamps are left to the caller.
    pub fn apply_to(&self, todo: &mut Todo) {
        if let Some(title) = &self.title {
            todo.title.clone_from(title);
        }
        if let Some(description) = &self.description {
            todo.description.clone_from(description);
        }
        if let Some(due_date) = self.due_date {
            todo.due_date = due_date;
        }
        if let Some(priority) = self.priority {
            todo.priority = priority;
        }
        if let Some(completed) = self.completed {
            todo.completed = completed;
        }
        if let Some(enabled) = self.notify_enabled {
            todo.notify_enabled = enabled;
        }
        if let Some(minutes) = self.notify_frequency_minutes {
            todo.notify_frequency_minutes = minutes;
        }
        if let Some(enabled) = self.discord_enabled {
            todo.discord_enabled = Some(enabled);
        }
        if let Some(enabled) = self.telegram_enabled {
            todo.telegram_enabled = Some(enabled);
        }
    }
}

/// Body of `PATCH /api/todos/reorder`: the complete new order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderRequest {
    pub todo_ids: Vec<TodoId>,
}

/// Client-side validation failures, raised before anything is sent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The title is empty after trimming.
    #[error("title cannot be empty")]
    TitleEmpty,
    /// Another loaded todo already uses this title.
    #[error("a task with the title '{0}' already exists")]
    DuplicateTitle(String),
    /// Notify frequency outside `[MIN_NOTIFY_FREQUENCY, MAX_NOTIFY_FREQUENCY]`.
    #[error("notify frequency {0} out of range (1..=10080 minutes)")]
    NotifyFrequencyOutOfRange(u32),
}

/// Checks a notify frequency against the accepted range.
///
/// # Errors
///
/// Returns [`ValidationError::NotifyFrequencyOutOfRange`] when `minutes` is
/// below [`MIN_NOTIFY_FREQUENCY`] or above [`MAX_NOTIFY_FREQUENCY`].
pub const fn validate_notify_frequency(minutes: u32) -> Result<u32, ValidationError> {
    if minutes < MIN_NOTIFY_FREQUENCY || minutes > MAX_NOTIFY_FREQUENCY {
        return Err(ValidationError::NotifyFrequencyOutOfRange(minutes));
    }
    Ok(minutes)
}
