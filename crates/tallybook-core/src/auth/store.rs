use std::path::PathBuf;

use anyhow::Result;
use tracing::{debug, warn};

use super::session::Session;
use super::storage::{FileStorage, MemoryStorage, TokenStorage};

/// Storage key for the access token
pub const ACCESS_TOKEN_KEY: &str = "token";

/// Storage key for the refresh token
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Storage key for the user identifier
pub const USER_KEY: &str = "user";

const SESSION_KEYS: [&str; 3] = [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY];

/// Persists the session's three fields as one unit.
pub struct SessionStore {
    storage: Box<dyn TokenStorage>,
}

impl SessionStore {
    pub fn new(storage: impl TokenStorage + 'static) -> Self {
        Self {
            storage: Box::new(storage),
        }
    }

    /// Store backed by a JSON file at `path`.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(FileStorage::new(path))
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStorage::new())
    }

    /// Read the persisted session. Missing, partial, or unreadable data is
    /// treated as no session.
    pub fn load(&self) -> Option<Session> {
        match self.try_load() {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Failed to read stored session, treating as logged out");
                None
            }
        }
    }

    fn try_load(&self) -> Result<Option<Session>> {
        let read = |key: &str| -> Result<Option<String>> {
            Ok(self.storage.get(key)?.filter(|v| !v.trim().is_empty()))
        };

        match (read(ACCESS_TOKEN_KEY)?, read(REFRESH_TOKEN_KEY)?, read(USER_KEY)?) {
            (Some(access), Some(refresh), Some(user)) => Ok(Some(Session::new(access, refresh, user))),
            (None, None, None) => Ok(None),
            _ => {
                debug!("Stored session is incomplete, ignoring it");
                Ok(None)
            }
        }
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        self.storage.set_many(&[
            (ACCESS_TOKEN_KEY, session.access_token.as_str()),
            (REFRESH_TOKEN_KEY, session.refresh_token.as_str()),
            (USER_KEY, session.user_id.as_str()),
        ])
    }

    pub fn clear(&self) -> Result<()> {
        self.storage.remove_many(&SESSION_KEYS)
    }
}
