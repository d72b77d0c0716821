//! Login, logout, and token refresh.
//!
//! `AuthManager` is the only writer of the session. It keeps the current
//! session in memory, mirrors it to the `SessionStore`, and publishes its
//! `AuthState` through a watch channel so the rest of the application can
//! react to a forced logout.

use reqwest::{Client, Url};
use serde::Deserialize;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use super::session::{Credentials, Session};
use super::store::SessionStore;
use crate::api::{endpoint, ApiError};

const LOGIN_PATH: &str = "auth/login/";
const REFRESH_PATH: &str = "token/refresh/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticated,
    /// A refresh request is in flight. The session is still usable.
    Refreshing,
}

// The refresh token arrives under `token`
#[derive(Debug, Deserialize)]
struct LoginResponse {
    access: Option<String>,
    #[serde(rename = "token")]
    refresh: Option<String>,
    #[serde(default, deserialize_with = "crate::models::de::string_or_number")]
    user: Option<String>,
}

impl LoginResponse {
    fn into_session(self) -> Option<Session> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        Some(Session::new(
            non_empty(self.access)?,
            non_empty(self.refresh)?,
            non_empty(self.user)?,
        ))
    }
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: Option<String>,
}

pub struct AuthManager {
    http: Client,
    base_url: Url,
    store: SessionStore,
    session: watch::Sender<Option<Session>>,
    state: watch::Sender<AuthState>,
    refresh_lock: Mutex<()>,
    /// Held while the session is written to the store and published, so a
    /// logout can never interleave with a refresh or login commit.
    write_lock: std::sync::Mutex<()>,
}

impl AuthManager {
    /// Create the manager, restoring any session found in the store.
    /// A restored session is trusted until the server rejects it.
    pub fn new(http: Client, base_url: Url, store: SessionStore) -> Self {
        let restored = store.load();
        let initial_state = if restored.is_some() {
            debug!("Restored session from storage");
            AuthState::Authenticated
        } else {
            debug!("No stored session");
            AuthState::Unauthenticated
        };

        Self {
            http,
            base_url,
            store,
            session: watch::channel(restored).0,
            state: watch::channel(initial_state).0,
            refresh_lock: Mutex::new(()),
            write_lock: std::sync::Mutex::new(()),
        }
    }

    pub fn current_session(&self) -> Option<Session> {
        self.session.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.borrow().is_some()
    }

    pub fn state(&self) -> AuthState {
        *self.state.borrow()
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    fn write_guard(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_state(&self, next: AuthState) {
        self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                debug!(from = ?current, to = ?next, "Auth state change");
                *current = next;
                true
            }
        });
    }

    /// Exchange credentials for a session. On any failure nothing changes.
    pub async fn login(&self, credentials: &Credentials) -> Result<Session, ApiError> {
        let url = endpoint(&self.base_url, LOGIN_PATH)?;
        debug!(email = %credentials.email, "Sending login request");

        let response = self.http.post(url).json(credentials).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(%status, "Login rejected");
            return Err(match status.as_u16() {
                400 | 401 | 403 => ApiError::AuthenticationFailure("Invalid credentials".to_string()),
                _ => ApiError::from_status(status, &body),
            });
        }

        let parsed: LoginResponse = serde_json::from_str(&body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse login response: {}", e)))?;
        let session = parsed.into_session().ok_or_else(|| {
            ApiError::InvalidResponse("Login response is missing tokens or user".to_string())
        })?;

        {
            let _write = self.write_guard();
            self.store
                .save(&session)
                .map_err(|e| ApiError::Storage(format!("{:#}", e)))?;
            self.session.send_replace(Some(session.clone()));
        }
        self.set_state(AuthState::Authenticated);
        info!(user = %session.user_id, "Login successful");
        Ok(session)
    }

    /// End the session. Always succeeds; calling it again is a no-op.
    pub fn logout(&self) {
        let previous = {
            let _write = self.write_guard();
            if let Err(e) = self.store.clear() {
                warn!(error = %e, "Failed to clear stored session");
            }
            self.session.send_replace(None)
        };
        self.set_state(AuthState::Unauthenticated);
        if previous.is_some() {
            info!("Logged out");
        }
    }

    /// Obtain a new access token with the refresh token.
    /// Any failure ends the session and returns `None`.
    pub async fn refresh(&self) -> Option<String> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    /// Refresh on behalf of a request that was rejected with `rejected`.
    ///
    /// Concurrent callers are serialized; whoever gets the lock after a
    /// refresh already happened receives the new token without another
    /// network call, and if that refresh failed they receive `None`.
    pub async fn refresh_after(&self, rejected: Option<&str>) -> Option<String> {
        let _guard = self.refresh_lock.lock().await;

        let current = self.current_session()?;
        if let Some(rejected) = rejected {
            if current.access_token != rejected {
                debug!("Access token already refreshed by another request");
                return Some(current.access_token);
            }
        }
        self.refresh_locked().await
    }

    async fn refresh_locked(&self) -> Option<String> {
        let Some(session) = self.current_session() else {
            warn!("No refresh token available");
            self.logout();
            return None;
        };

        self.set_state(AuthState::Refreshing);
        match self.request_access_token(&session.refresh_token).await {
            Ok(access) => {
                if !self.commit_refresh(&session, &access) {
                    debug!("Session ended during refresh, discarding new token");
                    return None;
                }
                self.set_state(AuthState::Authenticated);
                debug!("Access token refreshed");
                Some(access)
            }
            Err(e) => {
                warn!(error = %e, "Failed to refresh token");
                self.logout();
                None
            }
        }
    }

    /// Store and publish `access` if `session` is still the current one.
    /// A logout while the request was in flight wins.
    fn commit_refresh(&self, session: &Session, access: &str) -> bool {
        let _write = self.write_guard();
        let still_current = self
            .session
            .borrow()
            .as_ref()
            .is_some_and(|s| s.refresh_token == session.refresh_token);
        if !still_current {
            return false;
        }

        let updated = session.with_access_token(access);
        if let Err(e) = self.store.save(&updated) {
            warn!(error = %e, "Failed to persist refreshed token");
        }
        self.session.send_replace(Some(updated));
        true
    }

    async fn request_access_token(&self, refresh_token: &str) -> Result<String, ApiError> {
        let url = endpoint(&self.base_url, REFRESH_PATH)?;
        let response = self
            .http
            .post(url)
            .json(&serde_json::json!({ "refresh": refresh_token }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::from_status(status, &body));
        }

        let parsed: RefreshResponse = serde_json::from_str(&body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse refresh response: {}", e)))?;
        parsed
            .access
            .filter(|a| !a.trim().is_empty())
            .ok_or_else(|| ApiError::InvalidResponse("Refresh response has no access token".to_string()))
    }
}
