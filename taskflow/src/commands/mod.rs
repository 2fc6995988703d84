//! Subcommand handlers.
//!
//! [`run`] wires configuration, the session file and the HTTP client
//! together. The store-level handlers in [`execute`] and [`watch`] are
//! generic over [`TodoApi`] and the output writer so they run unchanged
//! against [`InMemoryApi`](crate::api::memory::InMemoryApi) in tests.

use std::future::Future;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use chrono::Local;
use tokio::time::Instant;

use taskflow_proto::todo::{Todo, TodoId, TodoPatch};

use crate::api::http::HttpApi;
use crate::api::{ApiError, TodoApi};
use crate::config::{AddArgs, ClientConfig, Command, EditArgs, ListArgs};
use crate::notify::terminal::TerminalNotifier;
use crate::notify::{self, NotificationChecker, Notifier, Permission};
use crate::session::{Session, SessionError};
use crate::store::{StoreError, TodoDraft, TodoStore};
use crate::view::{self, Stats, ViewOptions};

/// Errors reported to the user by the binary.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// No stored token or user id.
    #[error("not logged in; run `taskflow login <username>` first")]
    NotLoggedIn,

    /// The server rejected the stored token.
    #[error("session expired; run `taskflow login <username>` again")]
    SessionExpired,

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Api(ApiError),

    /// Arguments that parse but make no sense.
    #[error("{0}")]
    Invalid(String),

    /// A command that needs the session runner was passed to [`execute`].
    #[error("`{0}` cannot run against a loaded store")]
    Unsupported(&'static str),

    /// Writing output failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl From<StoreError> for CommandError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Api(api) => api.into(),
            other => Self::Store(other),
        }
    }
}

impl From<ApiError> for CommandError {
    fn from(e: ApiError) -> Self {
        if e.is_unauthorized() {
            Self::SessionExpired
        } else {
            Self::Api(e)
        }
    }
}

/// Runs `command` against the configured server.
///
/// # Errors
///
/// Returns [`CommandError`] for anything the user should see.
pub async fn run<W: Write>(
    command: Command,
    config: &ClientConfig,
    out: &mut W,
) -> Result<(), CommandError> {
    match command {
        Command::Login { username, password } => login(config, &username, password, out).await,
        Command::Logout => {
            Session::clear(&config.session_path)?;
            tracing::info!("logged out");
            writeln!(out, "Logged out.")?;
            Ok(())
        }
        Command::Watch => {
            let mut store = connect(config).await?;
            let notifier = Arc::new(TerminalNotifier::new(config.permission));
            watch(&mut store, notifier, config, out, async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %e, "failed to listen for ctrl-c");
                }
            })
            .await
        }
        other => {
            let mut store = connect(config).await?;
            execute(&mut store, other, config, out).await
        }
    }
}

async fn login<W: Write>(
    config: &ClientConfig,
    username: &str,
    password: Option<String>,
    out: &mut W,
) -> Result<(), CommandError> {
    let password = match password {
        Some(p) => p,
        None => {
            tokio::task::spawn_blocking(|| prompt_line("Password: "))
                .await
                .map_err(|e| CommandError::Invalid(format!("password prompt failed: {e}")))??
        }
    };

    let api = HttpApi::new(&config.api_url, config.request_timeout).map_err(CommandError::Api)?;
    let response = api
        .login(username, &password)
        .await
        .map_err(CommandError::Api)?;
    Session::new(response.token, response.user_id.clone()).save(&config.session_path)?;

    tracing::info!(user_id = %response.user_id, "logged in");
    writeln!(out, "Logged in as {}.", response.user_id)?;
    Ok(())
}

fn prompt_line(prompt: &str) -> io::Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{prompt}")?;
    stdout.flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Builds a store for the stored session and loads the list.
async fn connect(config: &ClientConfig) -> Result<TodoStore<HttpApi>, CommandError> {
    let session = Session::load(&config.session_path)?;
    let (token, user_id) = session.credentials().ok_or(CommandError::NotLoggedIn)?;

    let api = HttpApi::new(&config.api_url, config.request_timeout)
        .map_err(CommandError::Api)?
        .with_token(token);
    let mut store = TodoStore::new(api, Some(user_id.to_string()));
    store.list().await?;
    Ok(store)
}

/// Runs a store-level command against an already loaded store.
///
/// # Errors
///
/// Returns [`CommandError`] on validation, API or output failures, and
/// [`CommandError::Unsupported`] for `login`, `logout` and `watch`.
pub async fn execute<A: TodoApi, W: Write>(
    store: &mut TodoStore<A>,
    command: Command,
    config: &ClientConfig,
    out: &mut W,
) -> Result<(), CommandError> {
    match command {
        Command::List(args) => list(store, &args, out),
        Command::Stats => {
            let stats = Stats::of(&store.todos());
            writeln!(
                out,
                "Total: {}  Active: {}  Completed: {}",
                stats.total, stats.active, stats.completed
            )?;
            Ok(())
        }
        Command::Add(args) => {
            let draft = draft_from(args, config);
            store.add(&draft).await?;
            writeln!(out, "Added \"{}\".", draft.title.trim())?;
            Ok(())
        }
        Command::Edit(args) => {
            let id = TodoId::new(args.id.clone());
            let patch = patch_from(args);
            if patch.is_empty() {
                return Err(CommandError::Invalid("nothing to change".to_string()));
            }
            store.edit(&id, patch).await?;
            writeln!(out, "Updated {id}.")?;
            Ok(())
        }
        Command::Complete { id } => {
            let id = TodoId::new(id);
            store.update(&id, TodoPatch::completed(true)).await?;
            writeln!(out, "Completed {id}.")?;
            Ok(())
        }
        Command::Reopen { id } => {
            let id = TodoId::new(id);
            store.update(&id, TodoPatch::completed(false)).await?;
            writeln!(out, "Reopened {id}.")?;
            Ok(())
        }
        Command::ToggleNotify { id } => {
            let id = TodoId::new(id);
            let enabled = store.toggle_notify(&id).await?;
            let state = if enabled { "on" } else { "off" };
            writeln!(out, "Notifications {state} for {id}.")?;
            Ok(())
        }
        Command::Delete { id } => {
            let id = TodoId::new(id);
            store.remove(&id).await?;
            writeln!(out, "Deleted {id}.")?;
            Ok(())
        }
        Command::Move { id, before } => {
            let active = TodoId::new(id);
            let over = TodoId::new(before);
            for id in [&active, &over] {
                if store.get(id).is_none() {
                    return Err(StoreError::NotFound(id.clone()).into());
                }
            }
            if store.move_before(&active, &over).await? {
                writeln!(out, "Moved {active} to the position of {over}.")?;
            } else {
                writeln!(out, "Nothing to move.")?;
            }
            Ok(())
        }
        Command::Login { .. } => Err(CommandError::Unsupported("login")),
        Command::Logout => Err(CommandError::Unsupported("logout")),
        Command::Watch => Err(CommandError::Unsupported("watch")),
    }
}

fn list<A: TodoApi, W: Write>(
    store: &TodoStore<A>,
    args: &ListArgs,
    out: &mut W,
) -> Result<(), CommandError> {
    let options = ViewOptions {
        search: args.search.clone(),
        status: args.status,
        sort: args.sort,
    };
    let shown = view::apply(&store.todos(), &options);
    if shown.is_empty() {
        writeln!(out, "No todos found.")?;
        return Ok(());
    }
    for todo in &shown {
        writeln!(out, "{}", render(todo))?;
        if let Some(description) = &todo.description {
            writeln!(out, "      {description}")?;
        }
    }
    Ok(())
}

/// One list line: state, id, priority, due time, notify setting, title.
#[must_use]
pub fn render(todo: &Todo) -> String {
    let state = if todo.completed { "[x]" } else { "[ ]" };
    let due = todo.due_date.map_or_else(
        || "-".to_string(),
        |d| d.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
    );
    let notify = if todo.notify_enabled {
        format!("{}m", todo.notify_frequency_minutes)
    } else {
        "off".to_string()
    };
    format!(
        "{state} {:<10} {:<6} {due:<16} {notify:>6}  {}",
        todo.id.as_str(),
        todo.priority.to_string(),
        todo.title
    )
}

fn draft_from(args: AddArgs, config: &ClientConfig) -> TodoDraft {
    TodoDraft {
        title: args.title,
        description: args.description,
        due_date: args.due,
        priority: args.priority.unwrap_or(config.default_priority),
        notify_enabled: !args.no_notify,
        notify_frequency_minutes: args
            .notify_frequency
            .unwrap_or(config.default_notify_frequency),
        discord_enabled: args.discord,
        telegram_enabled: args.telegram,
    }
}

fn patch_from(args: EditArgs) -> TodoPatch {
    TodoPatch {
        title: args.title,
        description: args.description.map(Some),
        due_date: if args.clear_due {
            Some(None)
        } else {
            args.due.map(Some)
        },
        priority: args.priority,
        notify_frequency_minutes: args.notify_frequency,
        discord_enabled: args.discord,
        telegram_enabled: args.telegram,
        ..TodoPatch::default()
    }
}

/// Long-running session: shows due-date notifications and refreshes the
/// list until `shutdown` resolves.
///
/// Permission is requested once up front if undecided. The checker and the
/// refresh loop both stop before this returns.
///
/// # Errors
///
/// Returns [`CommandError::Io`] if writing the banner fails. Refresh
/// failures are logged and the session keeps running.
pub async fn watch<A, N, W, F>(
    store: &mut TodoStore<A>,
    notifier: Arc<N>,
    config: &ClientConfig,
    out: &mut W,
    shutdown: F,
) -> Result<(), CommandError>
where
    A: TodoApi,
    N: Notifier + 'static,
    W: Write,
    F: Future<Output = ()>,
{
    if notify::ensure_permission(notifier.as_ref()).await != Permission::Granted {
        writeln!(out, "Notifications are off; due todos will not be shown.")?;
    }
    let checker = NotificationChecker::start(store.subscribe(), notifier, config.checker());
    writeln!(
        out,
        "Watching {} todos. Press Ctrl-C to stop.",
        store.todos().len()
    )?;
    out.flush()?;

    let mut refresh = tokio::time::interval_at(
        Instant::now() + config.refresh_interval,
        config.refresh_interval,
    );
    let mut shutdown = std::pin::pin!(shutdown);
    loop {
        tokio::select! {
            () = &mut shutdown => break,
            _ = refresh.tick() => {
                if let Err(e) = store.list().await {
                    tracing::warn!(error = %e, "periodic refresh failed");
                }
            }
        }
    }

    checker.stop();
    tracing::info!("watch session ended");
    Ok(())
}
