use std::fmt;

use serde::{Deserialize, Serialize};

/// An authenticated session. Access and refresh tokens always travel together.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub user_id: String,
}

impl Session {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            user_id: user_id.into(),
        }
    }

    /// Same session with a new access token.
    pub fn with_access_token(&self, access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            ..self.clone()
        }
    }
}

// Tokens stay out of logs
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// Login input. Never persisted.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secrets() {
        let session = Session::new("A1", "R1", "u1");
        let printed = format!("{:?}", session);
        assert!(!printed.contains("A1"));
        assert!(!printed.contains("R1"));
        assert!(printed.contains("u1"));

        let creds = Credentials::new("me@example.com", "hunter2");
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("hunter2"));
    }

    #[test]
    fn test_with_access_token_keeps_refresh_and_user() {
        let session = Session::new("A1", "R1", "u1");
        assert_eq!(session.with_access_token("A2"), Session::new("A2", "R1", "u1"));
    }

    #[test]
    fn test_credentials_body() {
        let body = serde_json::to_value(Credentials::new("me@example.com", "pw")).unwrap();
        assert_eq!(body, serde_json::json!({"email": "me@example.com", "password": "pw"}));
    }
}
