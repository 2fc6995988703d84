//! Due-date notifications.
//!
//! [`check_due`] is the pure scan: given the list and the current time it
//! returns the notifications to show. [`NotificationChecker`] runs that
//! scan on a fixed interval against the store's published snapshot and
//! hands the results to a [`Notifier`].
//!
//! Nothing is remembered between scans: a todo that stays inside its
//! window is notified again on every tick.

pub mod terminal;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};

use taskflow_proto::todo::{Todo, TodoId};

use crate::store::Snapshot;

/// Default time between scans.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Default length of the "now overdue" window, in minutes.
pub const DEFAULT_OVERDUE_WINDOW_MINUTES: i64 = 5;

/// Whether the user allows notifications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// Not decided yet; ask once.
    #[default]
    #[serde(alias = "ask")]
    Default,
    /// Notifications are shown.
    Granted,
    /// Notifications are silently dropped.
    Denied,
}

/// Why a notification fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// Due within the todo's notify frequency.
    DueSoon {
        /// Whole minutes left, always positive.
        minutes_remaining: i64,
    },
    /// Due time just passed.
    Overdue,
}

/// A notification ready to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub todo_id: TodoId,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
}

/// Where notifications go.
pub trait Notifier: Send + Sync {
    /// The current permission.
    fn permission(&self) -> Permission;

    /// Asks the user for permission if undecided, and returns the outcome.
    fn request_permission(&self) -> impl Future<Output = Permission> + Send;

    /// Displays a notification. Only called with [`Permission::Granted`].
    fn show(&self, notification: &Notification);
}

/// Formats minutes as `"<h>h <m>m"`, or `"<m>m"` under an hour.
#[must_use]
pub fn format_remaining(minutes: i64) -> String {
    let hours = minutes / 60;
    let minutes = minutes % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Whole minutes from `now` until `due`, rounded down.
#[must_use]
pub fn minutes_until(due: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (due - now).num_milliseconds().div_euclid(60_000)
}

/// Scans `todos` and returns the notifications due at `now`.
///
/// Only incomplete todos with notifications enabled and a due date are
/// considered. With `m = minutes_until(due, now)`:
/// - `0 < m <= notify_frequency` fires "due soon";
/// - `-overdue_window < m <= 0` fires "now overdue".
#[must_use]
pub fn check_due(todos: &[Todo], now: DateTime<Utc>, overdue_window_minutes: i64) -> Vec<Notification> {
    todos
        .iter()
        .filter(|t| !t.completed && t.notify_enabled)
        .filter_map(|todo| {
            let minutes = minutes_until(todo.due_date?, now);
            if minutes > 0 && minutes <= i64::from(todo.notify_frequency_minutes) {
                Some(Notification {
                    todo_id: todo.id.clone(),
                    kind: NotificationKind::DueSoon {
                        minutes_remaining: minutes,
                    },
                    title: format!("Task Due Soon: {}", todo.title),
                    body: format!("This task is due in {}", format_remaining(minutes)),
                })
            } else if minutes <= 0 && minutes > -overdue_window_minutes {
                Some(Notification {
                    todo_id: todo.id.clone(),
                    kind: NotificationKind::Overdue,
                    title: format!("Task Overdue: {}", todo.title),
                    body: "This task is now overdue!".to_string(),
                })
            } else {
                None
            }
        })
        .collect()
}

/// Requests permission if it is still undecided. Call once per session.
pub async fn ensure_permission<N: Notifier>(notifier: &N) -> Permission {
    match notifier.permission() {
        Permission::Default => {
            let answer = notifier.request_permission().await;
            tracing::info!(?answer, "notification permission decided");
            answer
        }
        decided => decided,
    }
}

/// Shows each notification if permission is granted; drops them otherwise.
pub fn deliver<N: Notifier>(notifier: &N, notifications: &[Notification]) -> usize {
    if notifier.permission() != Permission::Granted {
        if !notifications.is_empty() {
            tracing::debug!(count = notifications.len(), "notifications suppressed");
        }
        return 0;
    }
    for notification in notifications {
        notifier.show(notification);
    }
    notifications.len()
}

/// Timing of the periodic scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckerConfig {
    /// Time between scans; the first scan happens one interval after start.
    pub interval: Duration,
    /// Length of the "now overdue" window, in minutes.
    pub overdue_window_minutes: i64,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_CHECK_INTERVAL,
            overdue_window_minutes: DEFAULT_OVERDUE_WINDOW_MINUTES,
        }
    }
}

/// The periodic due-date scanner.
pub struct NotificationChecker;

impl NotificationChecker {
    /// Starts scanning in a background task.
    ///
    /// Each tick reads the latest snapshot from `todos`, so list changes
    /// never require a restart. The task runs until the returned handle is
    /// stopped or dropped.
    pub fn start<N>(
        todos: watch::Receiver<Snapshot>,
        notifier: Arc<N>,
        config: CheckerConfig,
    ) -> CheckerHandle
    where
        N: Notifier + 'static,
    {
        tracing::info!(interval = ?config.interval, "notification checker started");
        let handle = tokio::spawn(async move {
            let mut tick = tokio::time::interval_at(Instant::now() + config.interval, config.interval);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tick.tick().await;
                let snapshot = Arc::clone(&todos.borrow());
                let due = check_due(&snapshot, Utc::now(), config.overdue_window_minutes);
                let shown = deliver(notifier.as_ref(), &due);
                tracing::debug!(scanned = snapshot.len(), due = due.len(), shown, "due-date scan");
            }
        });
        CheckerHandle { handle }
    }
}

/// Running checker. Stops the task when stopped or dropped.
#[derive(Debug)]
pub struct CheckerHandle {
    handle: tokio::task::JoinHandle<()>,
}

impl CheckerHandle {
    /// Whether the scan task is still alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stops the scan task.
    pub fn stop(self) {
        self.handle.abort();
        tracing::info!("notification checker stopped");
    }
}

impl Drop for CheckerHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Collects notifications in memory. Useful for tests and dry runs.
#[derive(Debug)]
pub struct RecordingNotifier {
    permission: Mutex<Permission>,
    answer: Permission,
    requests: Mutex<usize>,
    shown: Mutex<Vec<Notification>>,
    tx: Option<mpsc::UnboundedSender<Notification>>,
}

impl RecordingNotifier {
    /// A notifier with the given current permission. A permission request
    /// is answered with [`Permission::Granted`].
    #[must_use]
    pub const fn new(permission: Permission) -> Self {
        Self {
            permission: Mutex::new(permission),
            answer: Permission::Granted,
            requests: Mutex::new(0),
            shown: Mutex::new(Vec::new()),
            tx: None,
        }
    }

    /// Answers permission requests with `answer` instead.
    #[must_use]
    pub const fn answering(mut self, answer: Permission) -> Self {
        self.answer = answer;
        self
    }

    /// Also forwards every shown notification to `tx`.
    #[must_use]
    pub fn with_sender(mut self, tx: mpsc::UnboundedSender<Notification>) -> Self {
        self.tx = Some(tx);
        self
    }

    /// Everything shown so far.
    #[must_use]
    pub fn shown(&self) -> Vec<Notification> {
        self.shown.lock().clone()
    }

    /// How many times permission was requested.
    #[must_use]
    pub fn requests(&self) -> usize {
        *self.requests.lock()
    }
}

impl Notifier for RecordingNotifier {
    fn permission(&self) -> Permission {
        *self.permission.lock()
    }

    async fn request_permission(&self) -> Permission {
        *self.requests.lock() += 1;
        let mut permission = self.permission.lock();
        if *permission == Permission::Default {
            *permission = self.answer;
        }
        *permission
    }

    fn show(&self, notification: &Notification) {
        self.shown.lock().push(notification.clone());
        if let Some(tx) = &self.tx {
            let _ = tx.send(notification.clone());
        }
    }
}
