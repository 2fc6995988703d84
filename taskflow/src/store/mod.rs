//! Task store: the in-memory todo list of the logged-in user.
//!
//! The server is the source of truth. Every mutation is followed by a full
//! re-fetch instead of patching the local list, except [`TodoStore::reorder`],
//! which commits the new order locally once the server accepted it.
//!
//! Each replacement of the list is published as a [`Snapshot`] on a
//! `tokio::sync::watch` channel; the notification checker reads from
//! [`TodoStore::subscribe`].

pub mod draft;

use std::sync::Arc;

use tokio::sync::watch;

use taskflow_proto::todo::{Todo, TodoId, TodoPatch, ValidationError};

use crate::api::{ApiError, TodoApi};
use crate::view;

pub use draft::{TodoDraft, normalize_patch};

/// An immutable view of the list at one point in time.
pub type Snapshot = Arc<Vec<Todo>>;

/// Errors returned by store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Rejected client-side; nothing was sent.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// The API call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// No loaded todo has this id.
    #[error("todo not found: {0}")]
    NotFound(TodoId),
}

/// Owns the loaded todos and routes mutations to the API.
pub struct TodoStore<A: TodoApi> {
    api: A,
    user_id: Option<String>,
    loading: bool,
    todos: watch::Sender<Snapshot>,
}

impl<A: TodoApi> TodoStore<A> {
    /// Creates a store. Nothing is fetched until [`list`](Self::list).
    pub fn new(api: A, user_id: Option<String>) -> Self {
        let (todos, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            api,
            user_id,
            loading: true,
            todos,
        }
    }

    /// The underlying API client.
    pub const fn api(&self) -> &A {
        &self.api
    }

    /// The current user, if any.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Switches user. The loaded list is cleared until the next fetch.
    pub fn set_user(&mut self, user_id: Option<String>) {
        if self.user_id != user_id {
            self.user_id = user_id;
            self.loading = true;
            self.publish(Vec::new());
        }
    }

    /// `true` until the first fetch attempt finishes.
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    /// The current list.
    pub fn todos(&self) -> Snapshot {
        Arc::clone(&self.todos.borrow())
    }

    /// The loaded todo with `id`.
    pub fn get(&self, id: &TodoId) -> Option<Todo> {
        self.todos.borrow().iter().find(|t| t.id == *id).cloned()
    }

    /// A receiver that sees every future replacement of the list.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.todos.subscribe()
    }

    /// Fetches the list and replaces the local copy. No-op without a user.
    ///
    /// On failure the previous list is kept.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Api`] if the fetch fails.
    pub async fn list(&mut self) -> Result<(), StoreError> {
        if self.user_id.is_none() {
            return Ok(());
        }

        let result = self.api.list_todos().await;
        self.loading = false;
        match result {
            Ok(todos) => {
                tracing::debug!(count = todos.len(), "fetched todos");
                self.publish(todos);
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "error fetching todos");
                Err(e.into())
            }
        }
    }

    /// Validates `draft`, creates it at the end of the list, and re-fetches.
    /// No-op without a user.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] (nothing sent) or
    /// [`StoreError::Api`].
    pub async fn add(&mut self, draft: &TodoDraft) -> Result<(), StoreError> {
        if self.user_id.is_none() {
            return Ok(());
        }
        let body = {
            let current = self.todos.borrow();
            let mut body = draft.validate(current.iter().map(|t| t.title.as_str()))?;
            body.order_index = Some(u32::try_from(current.len()).unwrap_or(u32::MAX));
            body
        };

        if let Err(e) = self.api.create_todo(&body).await {
            tracing::error!(error = %e, title = %body.title, "error adding todo");
            return Err(e.into());
        }
        tracing::info!(title = %body.title, "todo added");
        self.refresh_after_write().await;
        Ok(())
    }

    /// Applies `patch` to todo `id` and re-fetches.
    ///
    /// `completed: Some(true)` goes through the dedicated complete endpoint;
    /// any remaining fields (and every other patch, including
    /// `completed: Some(false)`) go through the generic update.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Api`] if a call fails.
    pub async fn update(&mut self, id: &TodoId, patch: TodoPatch) -> Result<(), StoreError> {
        if let Err(e) = self.route_update(id, patch).await {
            tracing::error!(error = %e, %id, "error updating todo");
            return Err(e.into());
        }
        self.refresh_after_write().await;
        Ok(())
    }

    async fn route_update(&self, id: &TodoId, mut patch: TodoPatch) -> Result<(), ApiError> {
        if patch.completed == Some(true) {
            patch.completed = None;
            self.api.complete_todo(id).await?;
            if patch.is_empty() {
                return Ok(());
            }
        }
        self.api.update_todo(id, &patch).await?;
        Ok(())
    }

    /// Edit-dialog path: normalizes the patch (non-empty trimmed title,
    /// blank description cleared) before [`update`](Self::update).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] (nothing sent) or
    /// [`StoreError::Api`].
    pub async fn edit(&mut self, id: &TodoId, patch: TodoPatch) -> Result<(), StoreError> {
        let patch = normalize_patch(patch)?;
        self.update(id, patch).await
    }

    /// Flips the completion flag of a loaded todo.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if `id` is not loaded, or
    /// [`StoreError::Api`].
    pub async fn toggle_complete(&mut self, id: &TodoId) -> Result<bool, StoreError> {
        let todo = self.get(id).ok_or_else(|| StoreError::NotFound(id.clone()))?;
        let done = !todo.completed;
        self.update(id, TodoPatch::completed(done)).await?;
        Ok(done)
    }

    /// Flips whether a loaded todo sends notifications.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if `id` is not loaded, or
    /// [`StoreError::Api`].
    pub async fn toggle_notify(&mut self, id: &TodoId) -> Result<bool, StoreError> {
        let todo = self.get(id).ok_or_else(|| StoreError::NotFound(id.clone()))?;
        let enabled = !todo.notify_enabled;
        let patch = TodoPatch {
            notify_enabled: Some(enabled),
            ..TodoPatch::default()
        };
        self.update(id, patch).await?;
        Ok(enabled)
    }

    /// Deletes todo `id` and re-fetches.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Api`] if the delete fails.
    pub async fn remove(&mut self, id: &TodoId) -> Result<(), StoreError> {
        if let Err(e) = self.api.delete_todo(id).await {
            tracing::error!(error = %e, %id, "error deleting todo");
            return Err(e.into());
        }
        tracing::info!(%id, "todo deleted");
        self.refresh_after_write().await;
        Ok(())
    }

    /// Submits `reordered` as the complete new order, then makes it the
    /// local list without re-fetching.
    ///
    /// The local list only changes once the server accepted the order; on
    /// failure the previous order stays.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Api`] if the reorder call fails.
    pub async fn reorder(&mut self, mut reordered: Vec<Todo>) -> Result<(), StoreError> {
        let ids: Vec<TodoId> = reordered.iter().map(|t| t.id.clone()).collect();
        if let Err(e) = self.api.reorder_todos(&ids).await {
            tracing::error!(error = %e, "error reordering todos");
            return Err(e.into());
        }
        for (index, todo) in reordered.iter_mut().enumerate() {
            todo.order_index = u32::try_from(index).unwrap_or(u32::MAX);
        }
        self.publish(reordered);
        Ok(())
    }

    /// Drag-end: moves `active` to the position of `over` in the current
    /// list and submits the result. Returns `false` (nothing sent) when the
    /// ids are equal or either is not loaded.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Api`] if the reorder call fails.
    pub async fn move_before(&mut self, active: &TodoId, over: &TodoId) -> Result<bool, StoreError> {
        let moved = view::move_item(&self.todos(), active, over);
        match moved {
            Some(reordered) => {
                self.reorder(reordered).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Re-fetch after a successful write. A failed re-fetch keeps the old
    /// list and does not undo the write.
    async fn refresh_after_write(&mut self) {
        if let Err(e) = self.list().await {
            tracing::warn!(error = %e, "re-fetch after write failed");
        }
    }

    fn publish(&self, todos: Vec<Todo>) {
        self.todos.send_replace(Arc::new(todos));
    }
}
