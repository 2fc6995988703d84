//! Integration tests for the notification checker.
//!
//! Runs on a paused tokio clock: awaiting a notification lets the runtime
//! jump straight to the next scan tick. Due dates are set relative to the
//! wall clock, which the checker reads on every tick.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, timeout};

use taskflow::api::memory::{ApiCall, InMemoryApi};
use taskflow::commands;
use taskflow::config::ClientConfig;
use taskflow::notify::{
    CheckerConfig, Notification, NotificationChecker, NotificationKind, Notifier, Permission,
    RecordingNotifier,
};
use taskflow::store::{Snapshot, TodoDraft, TodoStore};
use taskflow_proto::todo::{Priority, Todo, TodoId};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const TICK: Duration = Duration::from_secs(60);

fn todo_due_in(id: &str, minutes: i64, frequency: u32) -> Todo {
    let now = Utc::now();
    Todo {
        id: TodoId::new(id),
        owner_id: "user-1".to_string(),
        title: format!("Task {id}"),
        description: None,
        due_date: Some(now + TimeDelta::minutes(minutes)),
        priority: Priority::Medium,
        completed: false,
        notify_enabled: true,
        notify_frequency_minutes: frequency,
        order_index: 0,
        created_at: now,
        updated_at: now,
        discord_enabled: None,
        telegram_enabled: None,
    }
}

fn recording(
    permission: Permission,
) -> (Arc<RecordingNotifier>, mpsc::UnboundedReceiver<Notification>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(RecordingNotifier::new(permission).with_sender(tx)), rx)
}

fn snapshot(todos: Vec<Todo>) -> (watch::Sender<Snapshot>, watch::Receiver<Snapshot>) {
    watch::channel(Arc::new(todos))
}

// ---------------------------------------------------------------------------
// Checker timing and rules
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn due_soon_fires_after_first_interval() {
    let (notifier, mut rx) = recording(Permission::Granted);
    let (_tx, todos) = snapshot(vec![todo_due_in("a", 30, 60)]);
    let start = Instant::now();

    let _checker = NotificationChecker::start(todos, notifier, CheckerConfig::default());
    let fired = rx.recv().await.unwrap();

    assert!(start.elapsed() >= TICK);
    assert!(matches!(fired.kind, NotificationKind::DueSoon { .. }));
    assert_eq!(fired.title, "Task Due Soon: Task a");
    assert!(fired.body.starts_with("This task is due in "));
}

#[tokio::test(start_paused = true)]
async fn due_outside_frequency_stays_silent() {
    let (notifier, mut rx) = recording(Permission::Granted);
    let (_tx, todos) = snapshot(vec![todo_due_in("a", 30, 20)]);

    let _checker = NotificationChecker::start(todos, notifier, CheckerConfig::default());
    assert!(timeout(TICK * 3, rx.recv()).await.is_err());
}

#[tokio::test(start_paused = true)]
async fn recently_overdue_fires_and_long_overdue_does_not() {
    let (notifier, mut rx) = recording(Permission::Granted);
    let (_tx, todos) = snapshot(vec![todo_due_in("late", -2, 60), todo_due_in("old", -10, 60)]);

    let _checker = NotificationChecker::start(todos, Arc::clone(&notifier), CheckerConfig::default());
    let fired = rx.recv().await.unwrap();

    assert_eq!(fired.kind, NotificationKind::Overdue);
    assert_eq!(fired.todo_id, TodoId::new("late"));
    assert_eq!(fired.title, "Task Overdue: Task late");
    assert_eq!(fired.body, "This task is now overdue!");
    assert_eq!(notifier.shown().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn repeats_every_tick_while_in_window() {
    let (notifier, mut rx) = recording(Permission::Granted);
    let (_tx, todos) = snapshot(vec![todo_due_in("a", 45, 60)]);

    let _checker = NotificationChecker::start(todos, Arc::clone(&notifier), CheckerConfig::default());
    for _ in 0..3 {
        rx.recv().await.unwrap();
    }
    assert_eq!(notifier.shown().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn picks_up_new_snapshots_without_restart() {
    let (notifier, mut rx) = recording(Permission::Granted);
    let (tx, todos) = snapshot(Vec::new());

    let _checker = NotificationChecker::start(todos, notifier, CheckerConfig::default());
    assert!(timeout(TICK + Duration::from_secs(1), rx.recv()).await.is_err());

    tx.send_replace(Arc::new(vec![todo_due_in("b", 5, 60)]));
    let fired = rx.recv().await.unwrap();
    assert_eq!(fired.todo_id, TodoId::new("b"));
}

#[tokio::test(start_paused = true)]
async fn custom_interval_and_window() {
    let (notifier, mut rx) = recording(Permission::Granted);
    let (_tx, todos) = snapshot(vec![todo_due_in("a", -8, 60)]);
    let config = CheckerConfig {
        interval: Duration::from_secs(10),
        overdue_window_minutes: 15,
    };
    let start = Instant::now();

    let _checker = NotificationChecker::start(todos, notifier, config);
    let fired = rx.recv().await.unwrap();

    assert!(start.elapsed() < TICK);
    assert_eq!(fired.kind, NotificationKind::Overdue);
}

// ---------------------------------------------------------------------------
// Permission and lifecycle
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn denied_permission_drops_everything() {
    let (notifier, mut rx) = recording(Permission::Denied);
    let (_tx, todos) = snapshot(vec![todo_due_in("a", 10, 60)]);

    let _checker = NotificationChecker::start(todos, Arc::clone(&notifier), CheckerConfig::default());
    assert!(timeout(TICK * 3, rx.recv()).await.is_err());
    assert!(notifier.shown().is_empty());
}

#[tokio::test(start_paused = true)]
async fn stop_ends_scanning() {
    let (notifier, mut rx) = recording(Permission::Granted);
    let (_tx, todos) = snapshot(vec![todo_due_in("a", 10, 60)]);

    let checker = NotificationChecker::start(todos, Arc::clone(&notifier), CheckerConfig::default());
    rx.recv().await.unwrap();
    assert!(checker.is_running());

    checker.stop();
    assert!(timeout(TICK * 3, rx.recv()).await.is_err());
    assert_eq!(notifier.shown().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn dropping_handle_ends_scanning() {
    let (notifier, mut rx) = recording(Permission::Granted);
    let (_tx, todos) = snapshot(vec![todo_due_in("a", 10, 60)]);

    drop(NotificationChecker::start(
        todos,
        Arc::clone(&notifier),
        CheckerConfig::default(),
    ));
    assert!(timeout(TICK * 2, rx.recv()).await.is_err());
    assert!(notifier.shown().is_empty());
}

// ---------------------------------------------------------------------------
// Store and watch session
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn store_changes_reach_the_checker() {
    let (notifier, mut rx) = recording(Permission::Granted);
    let mut store = TodoStore::new(InMemoryApi::new("user-1"), Some("user-1".to_string()));

    let _checker = NotificationChecker::start(store.subscribe(), notifier, CheckerConfig::default());

    let draft = TodoDraft {
        due_date: Some(Utc::now() + TimeDelta::minutes(90)),
        notify_frequency_minutes: 120,
        ..TodoDraft::new("File taxes")
    };
    store.add(&draft).await.unwrap();

    let fired = rx.recv().await.unwrap();
    assert_eq!(fired.title, "Task Due Soon: File taxes");
    assert!(fired.body.starts_with("This task is due in 1h "));
}

#[tokio::test(start_paused = true)]
async fn watch_session_asks_once_notifies_and_refreshes() {
    let api = InMemoryApi::new("user-1");
    let mut store = TodoStore::new(api, Some("user-1".to_string()));
    let draft = TodoDraft {
        due_date: Some(Utc::now() + TimeDelta::minutes(20)),
        ..TodoDraft::new("Call the bank")
    };
    store.add(&draft).await.unwrap();
    store.api().clear_calls();

    let notifier = Arc::new(RecordingNotifier::new(Permission::Default));
    let config = ClientConfig::default();
    let mut out = Vec::new();
    let session_length = config.refresh_interval + Duration::from_secs(30);

    commands::watch(
        &mut store,
        Arc::clone(&notifier),
        &config,
        &mut out,
        tokio::time::sleep(session_length),
    )
    .await
    .unwrap();

    assert_eq!(notifier.requests(), 1);
    assert_eq!(notifier.permission(), Permission::Granted);
    // One scan per minute over five and a half minutes.
    assert_eq!(notifier.shown().len(), 5);
    assert_eq!(store.api().calls(), vec![ApiCall::List]);

    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("Watching 1 todos."));
}

#[tokio::test(start_paused = true)]
async fn watch_session_with_denied_permission_says_so() {
    let mut store = TodoStore::new(InMemoryApi::new("user-1"), Some("user-1".to_string()));
    let notifier = Arc::new(RecordingNotifier::new(Permission::Denied));
    let mut out = Vec::new();

    commands::watch(
        &mut store,
        Arc::clone(&notifier),
        &ClientConfig::default(),
        &mut out,
        tokio::time::sleep(Duration::from_secs(1)),
    )
    .await
    .unwrap();

    assert_eq!(notifier.requests(), 0);
    let out = String::from_utf8(out).unwrap();
    assert!(out.starts_with("Notifications are off"));
}
