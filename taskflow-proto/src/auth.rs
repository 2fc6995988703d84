//! Authentication and error-envelope wire types.

use serde::{Deserialize, Serialize};

/// Body of `POST /api/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Successful login: a bearer token and the id of the authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: String,
}

/// Error body the server returns with non-2xx responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub message: String,
}

impl ApiErrorBody {
    /// Extracts the `message` of an error body.
    ///
    /// Returns `None` if the body is not JSON or carries no string `message`.
    #[must_use]
    pub fn message_from(body: &[u8]) -> Option<String> {
        serde_json::from_slice::<Self>(body)
            .ok()
            .map(|b| b.message)
    }

    /// The message used when the server gave no usable error body.
    #[must_use]
    pub fn fallback_message(status: u16) -> String {
        format!("HTTP error! status: {status}")
    }
}
