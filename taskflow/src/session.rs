//! Persisted login session.
//!
//! The bearer token and user id live in a small JSON file under the keys
//! `auth_token` and `user_id`. A session missing either key counts as
//! logged out.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Errors reading or writing the session file.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The session file exists but could not be read or written.
    #[error("session file {path}: {source}")]
    Io {
        /// Session file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The session file is not valid JSON.
    #[error("corrupt session file {path}: {source}")]
    Corrupt {
        /// Session file path.
        path: PathBuf,
        /// Underlying parse error.
        source: serde_json::Error,
    },
}

/// Token and user id of the logged-in user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl Session {
    /// A session for a freshly logged-in user.
    pub fn new(token: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            auth_token: Some(token.into()),
            user_id: Some(user_id.into()),
        }
    }

    /// Whether a token is present.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.auth_token.is_some()
    }

    /// Token and user id, if both are present.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        Some((self.auth_token.as_deref()?, self.user_id.as_deref()?))
    }

    /// Loads the session at `path`. A missing file is an empty session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the file exists but cannot be read or
    /// parsed.
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        match std::fs::read(path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| SessionError::Corrupt {
                path: path.to_path_buf(),
                source,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(SessionError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Writes the session to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] if the directory or file cannot be
    /// written.
    pub fn save(&self, path: &Path) -> Result<(), SessionError> {
        let io_err = |source| SessionError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(io_err)?;
        }
        let json = serde_json::to_vec_pretty(self).map_err(|source| SessionError::Corrupt {
            path: path.to_path_buf(),
            source,
        })?;
        write_private(path, &json).map_err(io_err)?;
        tracing::debug!(path = %path.display(), "session saved");
        Ok(())
    }

    /// Removes the session file. A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] if the file exists but cannot be removed.
    pub fn clear(path: &Path) -> Result<(), SessionError> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SessionError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

/// Writes `contents` to `path`, which is only ever readable by the owner.
///
/// A new file is created with mode 0600. An existing file is narrowed to
/// 0600 before anything is written into it.
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::io::Write;

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(contents)?;
    file.flush()
}
