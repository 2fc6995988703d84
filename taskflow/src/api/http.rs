//! HTTP implementation of [`TodoApi`] backed by `reqwest`.

use std::time::Duration;

use parking_lot::RwLock;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use url::Url;

use taskflow_proto::auth::{ApiErrorBody, LoginRequest, LoginResponse};
use taskflow_proto::todo::{NewTodo, ReorderRequest, Todo, TodoId, TodoPatch};

use super::{ApiError, TodoApi};

/// Client for the TaskFlow REST API.
///
/// Holds the bearer token in memory; [`set_token`](Self::set_token) swaps
/// it after a login or logout. Requests made without a token are sent
/// without an `Authorization` header.
pub struct HttpApi {
    base_url: Url,
    client: reqwest::Client,
    token: RwLock<Option<String>>,
}

impl std::fmt::Debug for HttpApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpApi")
            .field("base_url", &self.base_url.as_str())
            .field("has_token", &self.token.read().is_some())
            .finish_non_exhaustive()
    }
}

impl HttpApi {
    /// Creates a client for `base_url` (e.g. `http://localhost:8080`).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidUrl`] if `base_url` does not parse, or
    /// [`ApiError::Network`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let mut base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(
                url::ParseError::RelativeUrlWithCannotBeABaseBase,
            ));
        }
        // Url::join replaces the last segment unless the path ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::Network)?;
        Ok(Self {
            base_url,
            client,
            token: RwLock::new(None),
        })
    }

    /// Sets the bearer token used for subsequent requests.
    #[must_use]
    pub fn with_token(self, token: impl Into<String>) -> Self {
        *self.token.write() = Some(token.into());
        self
    }

    /// Replaces (or clears) the bearer token.
    pub fn set_token(&self, token: Option<String>) {
        *self.token.write() = token;
    }

    /// The normalized base URL (always ends in `/`).
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The base URL with `segments` appended, each percent-encoded as a
    /// single path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// `api/todos/{id}` followed by `rest`.
    fn todo_endpoint(&self, id: &TodoId, rest: &[&str]) -> Result<Url, ApiError> {
        let id = id.as_str();
        // Url drops "." and ".." segments, which would retarget the request.
        if matches!(id, "" | "." | "..") {
            return Err(ApiError::InvalidId(id.to_string()));
        }
        let mut segments = vec!["api", "todos", id];
        segments.extend_from_slice(rest);
        self.endpoint(&segments)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        tracing::debug!(%method, %url, "api request");
        let builder = self.client.request(method, url);
        match self.token.read().as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = builder.send().await.map_err(ApiError::Network)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await.unwrap_or_default();
        let message = ApiErrorBody::message_from(&body)
            .unwrap_or_else(|| ApiErrorBody::fallback_message(status.as_u16()));
        tracing::warn!(status = status.as_u16(), %message, "api request rejected");
        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let body = response.bytes().await.map_err(ApiError::Network)?;
        serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

impl TodoApi for HttpApi {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let builder = self
            .request(Method::POST, self.endpoint(&["api", "login"])?)
            .json(&body);
        Self::decode(Self::send(builder).await?).await
    }

    async fn list_todos(&self) -> Result<Vec<Todo>, ApiError> {
        let builder = self.request(Method::GET, self.endpoint(&["api", "todos"])?);
        // The server answers `null` for a user without todos.
        let todos: Option<Vec<Todo>> = Self::decode(Self::send(builder).await?).await?;
        Ok(todos.unwrap_or_default())
    }

    async fn create_todo(&self, todo: &NewTodo) -> Result<Todo, ApiError> {
        let builder = self
            .request(Method::POST, self.endpoint(&["api", "todos"])?)
            .json(todo);
        Self::decode(Self::send(builder).await?).await
    }

    async fn update_todo(&self, id: &TodoId, patch: &TodoPatch) -> Result<Todo, ApiError> {
        let builder = self
            .request(Method::PUT, self.todo_endpoint(id, &[])?)
            .json(patch);
        Self::decode(Self::send(builder).await?).await
    }

    async fn complete_todo(&self, id: &TodoId) -> Result<Todo, ApiError> {
        let builder = self.request(Method::POST, self.todo_endpoint(id, &["complete"])?);
        Self::decode(Self::send(builder).await?).await
    }

    async fn delete_todo(&self, id: &TodoId) -> Result<(), ApiError> {
        let builder = self.request(Method::DELETE, self.todo_endpoint(id, &[])?);
        Self::send(builder).await?;
        Ok(())
    }

    async fn reorder_todos(&self, ids: &[TodoId]) -> Result<(), ApiError> {
        let body = ReorderRequest {
            todo_ids: ids.to_vec(),
        };
        let builder = self
            .request(Method::PATCH, self.endpoint(&["api", "todos", "reorder"])?)
            .json(&body);
        Self::send(builder).await?;
        Ok(())
    }
}
