//! Notifications printed to the controlling terminal.

use std::io::{self, BufRead, Write};

use parking_lot::Mutex;

use super::{Notification, Notifier, Permission};

/// Prints notifications to stdout with a bell.
///
/// Permission starts from configuration. When it is [`Permission::Default`]
/// the user is asked once on stdin.
#[derive(Debug)]
pub struct TerminalNotifier {
    permission: Mutex<Permission>,
}

impl TerminalNotifier {
    #[must_use]
    pub const fn new(permission: Permission) -> Self {
        Self {
            permission: Mutex::new(permission),
        }
    }
}

fn prompt() -> Permission {
    let mut stdout = io::stdout();
    let _ = write!(stdout, "Show due-date notifications in this terminal? [y/N] ");
    let _ = stdout.flush();

    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line).is_err() {
        return Permission::Denied;
    }
    match line.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Permission::Granted,
        _ => Permission::Denied,
    }
}

impl Notifier for TerminalNotifier {
    fn permission(&self) -> Permission {
        *self.permission.lock()
    }

    async fn request_permission(&self) -> Permission {
        let current = *self.permission.lock();
        if current != Permission::Default {
            return current;
        }
        let answer = tokio::task::spawn_blocking(prompt)
            .await
            .unwrap_or(Permission::Denied);
        *self.permission.lock() = answer;
        answer
    }

    fn show(&self, notification: &Notification) {
        tracing::info!(
            todo_id = %notification.todo_id,
            title = %notification.title,
            "notification shown"
        );
        let time = chrono::Local::now().format("%H:%M");
        println!("\x07[{time}] {}\n        {}", notification.title, notification.body);
    }
}
