//! Form-layer validation for new and edited todos.
//!
//! Runs before anything is sent: titles are trimmed and must be non-empty,
//! new titles must not collide with a loaded title, and the notify
//! frequency must be in range.

use chrono::{DateTime, Utc};

use taskflow_proto::todo::{
    DEFAULT_NOTIFY_FREQUENCY, NewTodo, Priority, TodoPatch, ValidationError,
    validate_notify_frequency,
};

/// A todo as entered, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoDraft {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Priority,
    pub notify_enabled: bool,
    pub notify_frequency_minutes: u32,
    pub discord_enabled: bool,
    pub telegram_enabled: bool,
}

impl Default for TodoDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: None,
            due_date: None,
            priority: Priority::Medium,
            notify_enabled: true,
            notify_frequency_minutes: DEFAULT_NOTIFY_FREQUENCY,
            discord_enabled: false,
            telegram_enabled: false,
        }
    }
}

impl TodoDraft {
    /// A draft with the given title and form defaults for everything else.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Validates the draft and builds the request body.
    ///
    /// `existing_titles` are the titles currently loaded; the trimmed title
    /// must match none of them exactly.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::TitleEmpty`], [`ValidationError::DuplicateTitle`]
    /// or [`ValidationError::NotifyFrequencyOutOfRange`].
    pub fn validate<'a>(
        &self,
        existing_titles: impl IntoIterator<Item = &'a str>,
    ) -> Result<NewTodo, ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::TitleEmpty);
        }
        if existing_titles.into_iter().any(|t| t == title) {
            return Err(ValidationError::DuplicateTitle(title.to_string()));
        }
        let minutes = validate_notify_frequency(self.notify_frequency_minutes)?;

        Ok(NewTodo {
            title: title.to_string(),
            description: trimmed_non_empty(self.description.as_deref()),
            due_date: self.due_date,
            priority: Some(self.priority),
            notify_enabled: Some(self.notify_enabled),
            notify_frequency_minutes: Some(minutes),
            order_index: None,
            discord_enabled: Some(self.discord_enabled),
            telegram_enabled: Some(self.telegram_enabled),
        })
    }
}

/// Normalizes an edit: trims the title (which must stay non-empty), turns
/// a blank description into an explicit clear, and range-checks the
/// notify frequency.
///
/// # Errors
///
/// Returns [`ValidationError::TitleEmpty`] or
/// [`ValidationError::NotifyFrequencyOutOfRange`].
pub fn normalize_patch(mut patch: TodoPatch) -> Result<TodoPatch, ValidationError> {
    if let Some(title) = patch.title.take() {
        let title = title.trim();
        if title.is_empty() {
            return Err(ValidationError::TitleEmpty);
        }
        patch.title = Some(title.to_string());
    }
    if let Some(description) = patch.description.take() {
        patch.description = Some(trimmed_non_empty(description.as_deref()));
    }
    if let Some(minutes) = patch.notify_frequency_minutes {
        validate_notify_frequency(minutes)?;
    }
    Ok(patch)
}

fn trimmed_non_empty(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
}
