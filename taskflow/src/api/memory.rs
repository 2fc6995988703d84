//! In-process [`TodoApi`] for tests and offline demos.
//!
//! Behaves like the server for the operations the client uses: assigns ids,
//! owner and timestamps, applies partial updates, rewrites `order_index` on
//! reorder, and answers unknown ids with a 404. Every call is recorded so
//! tests can assert which endpoint a store operation hit.

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;

use taskflow_proto::auth::LoginResponse;
use taskflow_proto::todo::{DEFAULT_NOTIFY_FREQUENCY, NewTodo, Todo, TodoId, TodoPatch};

use super::{ApiError, TodoApi};

/// One recorded API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    Login { username: String },
    List,
    Create(NewTodo),
    Update(TodoId, TodoPatch),
    Complete(TodoId),
    Delete(TodoId),
    Reorder(Vec<TodoId>),
}

impl ApiCall {
    /// Whether the call changes server state.
    #[must_use]
    pub const fn is_mutation(&self) -> bool {
        !matches!(self, Self::Login { .. } | Self::List)
    }
}

#[derive(Debug, Default)]
struct State {
    todos: Vec<Todo>,
    calls: Vec<ApiCall>,
    next_id: u64,
    fail_next: usize,
    last_created: Option<DateTime<Utc>>,
}

/// Server stand-in holding one user's todos in memory.
#[derive(Debug)]
pub struct InMemoryApi {
    owner_id: String,
    password: Option<String>,
    state: Mutex<State>,
}

impl InMemoryApi {
    /// Creates an empty server for `owner_id`. Any password is accepted.
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            password: None,
            state: Mutex::new(State::default()),
        }
    }

    /// Requires `password` on login.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Seeds the server with existing todos (kept in the given order).
    #[must_use]
    pub fn with_todos(self, todos: Vec<Todo>) -> Self {
        {
            let mut state = self.state.lock();
            state.next_id = todos.len() as u64;
            state.todos = todos;
        }
        self
    }

    /// Makes the next `n` calls fail with a 503.
    pub fn fail_next(&self, n: usize) {
        self.state.lock().fail_next = n;
    }

    /// All calls made so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<ApiCall> {
        self.state.lock().calls.clone()
    }

    /// Forgets the recorded calls.
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// The server's current todos, in list order.
    #[must_use]
    pub fn todos(&self) -> Vec<Todo> {
        self.state.lock().todos.clone()
    }

    /// Records `call` and consumes one injected failure, if any.
    fn record(&self, call: ApiCall) -> Result<(), ApiError> {
        let mut state = self.state.lock();
        state.calls.push(call);
        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(ApiError::Status {
                status: 503,
                message: "service unavailable".to_string(),
            });
        }
        Ok(())
    }
}

fn not_found(id: &TodoId) -> ApiError {
    ApiError::Status {
        status: 404,
        message: format!("todo {id} not found"),
    }
}

impl State {
    fn find_mut(&mut self, id: &TodoId) -> Result<&mut Todo, ApiError> {
        self.todos
            .iter_mut()
            .find(|t| t.id == *id)
            .ok_or_else(|| not_found(id))
    }

    /// Creation timestamps strictly increase even within one clock tick.
    fn next_created_at(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let at = match self.last_created {
            Some(last) if now <= last => last + TimeDelta::milliseconds(1),
            _ => now,
        };
        self.last_created = Some(at);
        at
    }
}

impl TodoApi for InMemoryApi {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        self.record(ApiCall::Login {
            username: username.to_string(),
        })?;
        if self.password.as_deref().is_some_and(|p| p != password) {
            return Err(ApiError::Status {
                status: 401,
                message: "invalid credentials".to_string(),
            });
        }
        Ok(LoginResponse {
            token: format!("token-{username}"),
            user_id: self.owner_id.clone(),
        })
    }

    async fn list_todos(&self) -> Result<Vec<Todo>, ApiError> {
        self.record(ApiCall::List)?;
        let mut todos = self.state.lock().todos.clone();
        todos.sort_by_key(|t| t.order_index);
        Ok(todos)
    }

    async fn create_todo(&self, todo: &NewTodo) -> Result<Todo, ApiError> {
        self.record(ApiCall::Create(todo.clone()))?;
        let mut state = self.state.lock();
        state.next_id += 1;
        let created_at = state.next_created_at();
        let order_index = todo
            .order_index
            .unwrap_or_else(|| u32::try_from(state.todos.len()).unwrap_or(u32::MAX));
        let created = Todo {
            id: TodoId::new(format!("todo-{}", state.next_id)),
            owner_id: self.owner_id.clone(),
            title: todo.title.clone(),
            description: todo.description.clone(),
            due_date: todo.due_date,
            priority: todo.priority.unwrap_or_default(),
            completed: false,
            notify_enabled: todo.notify_enabled.unwrap_or(true),
            notify_frequency_minutes: todo
                .notify_frequency_minutes
                .unwrap_or(DEFAULT_NOTIFY_FREQUENCY),
            order_index,
            created_at,
            updated_at: created_at,
            discord_enabled: todo.discord_enabled,
            telegram_enabled: todo.telegram_enabled,
        };
        state.todos.push(created.clone());
        Ok(created)
    }

    async fn update_todo(&self, id: &TodoId, patch: &TodoPatch) -> Result<Todo, ApiError> {
        self.record(ApiCall::Update(id.clone(), patch.clone()))?;
        let mut state = self.state.lock();
        let todo = state.find_mut(id)?;
        patch.apply_to(todo);
        todo.updated_at = Utc::now();
        Ok(todo.clone())
    }

    async fn complete_todo(&self, id: &TodoId) -> Result<Todo, ApiError> {
        self.record(ApiCall::Complete(id.clone()))?;
        let mut state = self.state.lock();
        let todo = state.find_mut(id)?;
        todo.completed = true;
        todo.updated_at = Utc::now();
        Ok(todo.clone())
    }

    async fn delete_todo(&self, id: &TodoId) -> Result<(), ApiError> {
        self.record(ApiCall::Delete(id.clone()))?;
        let mut state = self.state.lock();
        let before = state.todos.len();
        state.todos.retain(|t| t.id != *id);
        if state.todos.len() == before {
            return Err(not_found(id));
        }
        Ok(())
    }

    async fn reorder_todos(&self, ids: &[TodoId]) -> Result<(), ApiError> {
        self.record(ApiCall::Reorder(ids.to_vec()))?;
        let mut state = self.state.lock();
        if let Some(unknown) = ids.iter().find(|id| !state.todos.iter().any(|t| t.id == **id)) {
            return Err(ApiError::Status {
                status: 400,
                message: format!("unknown todo id {unknown}"),
            });
        }
        for (index, id) in ids.iter().enumerate() {
            let todo = state.find_mut(id)?;
            todo.order_index = u32::try_from(index).unwrap_or(u32::MAX);
        }
        Ok(())
    }
}
