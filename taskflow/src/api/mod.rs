//! REST API access for TaskFlow.
//!
//! Defines the [`TodoApi`] trait the task store talks to. Implementations:
//! - [`http::HttpApi`]: reqwest client against the real server
//! - [`memory::InMemoryApi`]: in-process server stand-in for tests and demos

pub mod http;
pub mod memory;

use std::future::Future;

use taskflow_proto::auth::LoginResponse;
use taskflow_proto::todo::{NewTodo, Todo, TodoId, TodoPatch};

/// Errors surfaced by API calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The server answered with a non-2xx status.
    ///
    /// `message` is the server's `message` field, or
    /// `HTTP error! status: <code>` when the body had none.
    #[error("{message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Human-readable message.
        message: String,
    },

    /// The request never produced a response (DNS, connect, timeout...).
    #[error("request failed: {0}")]
    Network(#[source] reqwest::Error),

    /// A 2xx response whose body could not be decoded.
    #[error("unexpected response body: {0}")]
    Decode(String),

    /// The configured base URL is not valid.
    #[error("invalid API URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A todo id that cannot stand as a single path segment (empty, `.`
    /// or `..`). Nothing was sent.
    #[error("invalid todo id: {0:?}")]
    InvalidId(String),
}

impl ApiError {
    /// The HTTP status, when the server produced one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the server rejected the bearer token.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401))
    }
}

/// Async access to the todo endpoints.
///
/// Every method maps to exactly one HTTP request. Implementations attach
/// the bearer token themselves; callers never see it.
pub trait TodoApi: Send + Sync {
    /// `POST /api/login`.
    fn login(
        &self,
        username: &str,
        password: &str,
    ) -> impl Future<Output = Result<LoginResponse, ApiError>> + Send;

    /// `GET /api/todos`.
    fn list_todos(&self) -> impl Future<Output = Result<Vec<Todo>, ApiError>> + Send;

    /// `POST /api/todos`.
    fn create_todo(&self, todo: &NewTodo)
    -> impl Future<Output = Result<Todo, ApiError>> + Send;

    /// `PUT /api/todos/{id}` with only the fields set in `patch`.
    fn update_todo(
        &self,
        id: &TodoId,
        patch: &TodoPatch,
    ) -> impl Future<Output = Result<Todo, ApiError>> + Send;

    /// `POST /api/todos/{id}/complete`.
    fn complete_todo(&self, id: &TodoId) -> impl Future<Output = Result<Todo, ApiError>> + Send;

    /// `DELETE /api/todos/{id}`.
    fn delete_todo(&self, id: &TodoId) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// `PATCH /api/todos/reorder` with the complete new order.
    fn reorder_todos(&self, ids: &[TodoId]) -> impl Future<Output = Result<(), ApiError>> + Send;
}
