//! The authenticated request pipeline.
//!
//! Every API call is dispatched with the current bearer token. A 401 gets
//! exactly one refresh-and-retry; a second 401, or a failed refresh, ends
//! the session and surfaces `ApiError::AuthenticationFailure`. Other
//! failures are returned as they are, without retry.

use std::sync::Arc;

use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::request::RequestDescriptor;
use super::ApiError;
use crate::auth::AuthManager;
use crate::models::ApiEnvelope;

const SESSION_EXPIRED: &str = "Session expired. Please log in again.";

/// Clone is cheap - the HTTP client and auth manager are shared.
#[derive(Clone)]
pub struct AuthenticatedClient {
    http: Client,
    base_url: Url,
    auth: Arc<AuthManager>,
}

impl AuthenticatedClient {
    pub fn new(http: Client, base_url: Url, auth: Arc<AuthManager>) -> Self {
        Self {
            http,
            base_url,
            auth,
        }
    }

    pub fn auth(&self) -> &Arc<AuthManager> {
        &self.auth
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Send a request, recovering from one expired access token.
    /// Non-success statuses other than 401 come back as `ApiError::from_status`.
    pub async fn send(&self, mut request: RequestDescriptor) -> Result<Response, ApiError> {
        let mut sent_token = self.auth.current_session().map(|s| s.access_token);
        match sent_token {
            Some(ref token) => request.set_bearer(token)?,
            None => debug!(path = %request.path(), "No session, sending unauthenticated"),
        }

        loop {
            let response = self.dispatch(&request).await?;
            if response.status() != StatusCode::UNAUTHORIZED {
                return Self::check_response(response).await;
            }

            if request.retried() {
                warn!(path = %request.path(), "Request rejected again after token refresh");
                self.auth.logout();
                return Err(ApiError::AuthenticationFailure(SESSION_EXPIRED.to_string()));
            }

            request.mark_retried();
            debug!(path = %request.path(), "Access token rejected, attempting refresh");

            match self.auth.refresh_after(sent_token.as_deref()).await {
                Some(token) => {
                    request.set_bearer(&token)?;
                    sent_token = Some(token);
                }
                None => {
                    warn!(path = %request.path(), "Token refresh failed, session ended");
                    return Err(ApiError::AuthenticationFailure(SESSION_EXPIRED.to_string()));
                }
            }
        }
    }

    /// Send and decode the JSON body.
    pub async fn send_json<T: DeserializeOwned>(&self, request: RequestDescriptor) -> Result<T, ApiError> {
        let path = request.path().to_string();
        let response = self.send(request).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", path, e))
        })
    }

    /// Send and decode a `{status, message, records}` envelope.
    /// `status: false` becomes `ApiError::Validation` with the server's message.
    pub async fn send_envelope<T: DeserializeOwned>(
        &self,
        request: RequestDescriptor,
    ) -> Result<ApiEnvelope<T>, ApiError> {
        let envelope: ApiEnvelope<T> = self.send_json(request).await?;
        envelope.check()
    }

    async fn dispatch(&self, request: &RequestDescriptor) -> Result<Response, ApiError> {
        let url = request.url(&self.base_url)?;
        let mut builder = self
            .http
            .request(request.method().clone(), url)
            .headers(request.headers().clone());
        if !request.query_params().is_empty() {
            builder = builder.query(request.query_params());
        }
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        debug!(
            method = %request.method(),
            path = %request.path(),
            retried = request.retried(),
            "Dispatching request"
        );
        Ok(builder.send().await?)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::parse_base_url;
    use crate::auth::{AuthState, Session, SessionStore};
    use mockito::{Matcher, Server, ServerGuard};
    use std::path::Path;

    const SUMMARY_PATH: &str = "/api/transactions/summary/";
    const REFRESH_PATH: &str = "/api/token/refresh/";
    const SUMMARY_BODY: &str =
        r#"{"status": true, "records": {"total_income": 100, "total_expenses": 40, "balance": 60}}"#;

    fn client_with(server: &ServerGuard, store: SessionStore) -> AuthenticatedClient {
        let base = parse_base_url(&format!("{}/api/", server.url())).unwrap();
        let http = Client::new();
        let auth = Arc::new(AuthManager::new(http.clone(), base.clone(), store));
        AuthenticatedClient::new(http, base, auth)
    }

    fn file_store(path: &Path, session: Option<Session>) -> SessionStore {
        let store = SessionStore::file(path);
        if let Some(session) = session {
            store.save(&session).unwrap();
        }
        store
    }

    fn memory_store(session: Session) -> SessionStore {
        let store = SessionStore::in_memory();
        store.save(&session).unwrap();
        store
    }

    #[tokio::test]
    async fn test_attaches_bearer_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", SUMMARY_PATH)
            .match_header("authorization", "Bearer A1")
            .with_status(200)
            .with_body(SUMMARY_BODY)
            .expect(1)
            .create_async()
            .await;

        let client = client_with(&server, memory_store(Session::new("A1", "R1", "u1")));
        let response = client.send(RequestDescriptor::get("transactions/summary/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_sends_unauthenticated_without_session() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/categories/list/")
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_body(r#"{"status": true, "records": []}"#)
            .expect(1)
            .create_async()
            .await;

        let client = client_with(&server, SessionStore::in_memory());
        client
            .send(RequestDescriptor::post("categories/list/").json(&serde_json::json!({})).unwrap())
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_refresh_and_retry_scenario() {
        let mut server = Server::new_async().await;
        let rejected = server
            .mock("GET", SUMMARY_PATH)
            .match_header("authorization", "Bearer A1")
            .with_status(401)
            .expect(1)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", REFRESH_PATH)
            .match_body(Matcher::Json(serde_json::json!({"refresh": "R1"})))
            .with_status(200)
            .with_body(r#"{"access": "A2"}"#)
            .expect(1)
            .create_async()
            .await;
        let retried = server
            .mock("GET", SUMMARY_PATH)
            .match_header("authorization", "Bearer A2")
            .with_status(200)
            .with_body(SUMMARY_BODY)
            .expect(1)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let client = client_with(&server, file_store(&path, Some(Session::new("A1", "R1", "u1"))));

        let response = client.send(RequestDescriptor::get("transactions/summary/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        rejected.assert_async().await;
        refresh.assert_async().await;
        retried.assert_async().await;
        assert_eq!(client.auth().state(), AuthState::Authenticated);
        assert_eq!(SessionStore::file(&path).load(), Some(Session::new("A2", "R1", "u1")));
    }

    #[tokio::test]
    async fn test_expired_refresh_token_is_terminal() {
        let mut server = Server::new_async().await;
        let rejected = server
            .mock("GET", SUMMARY_PATH)
            .with_status(401)
            .expect(1)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", REFRESH_PATH)
            .with_status(401)
            .with_body(r#"{"detail": "Token is invalid or expired"}"#)
            .expect(1)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let client = client_with(&server, file_store(&path, Some(Session::new("A1", "R1", "u1"))));
        let mut events = client.auth().subscribe();

        let err = client
            .send(RequestDescriptor::get("transactions/summary/"))
            .await
            .unwrap_err();

        assert!(err.is_terminal_auth());
        rejected.assert_async().await;
        refresh.assert_async().await;
        assert_eq!(client.auth().current_session(), None);
        assert_eq!(*events.borrow_and_update(), AuthState::Unauthenticated);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_rejected_refreshed_token_does_not_loop() {
        let mut server = Server::new_async().await;
        let rejected = server
            .mock("GET", SUMMARY_PATH)
            .with_status(401)
            .expect(2)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", REFRESH_PATH)
            .with_status(200)
            .with_body(r#"{"access": "A2"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = client_with(&server, memory_store(Session::new("A1", "R1", "u1")));
        let err = client
            .send(RequestDescriptor::get("transactions/summary/"))
            .await
            .unwrap_err();

        assert!(err.is_terminal_auth());
        rejected.assert_async().await;
        refresh.assert_async().await;
        assert_eq!(client.auth().current_session(), None);
    }

    #[tokio::test]
    async fn test_unauthenticated_401_is_terminal_without_refresh() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", SUMMARY_PATH)
            .with_status(401)
            .expect(1)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", REFRESH_PATH)
            .expect(0)
            .create_async()
            .await;

        let client = client_with(&server, SessionStore::in_memory());
        let err = client
            .send(RequestDescriptor::get("transactions/summary/"))
            .await
            .unwrap_err();
        assert!(err.is_terminal_auth());
        refresh.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_is_not_retried() {
        let mut server = Server::new_async().await;
        let failing = server
            .mock("GET", SUMMARY_PATH)
            .with_status(500)
            .with_body("boom")
            .expect(1)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", REFRESH_PATH)
            .expect(0)
            .create_async()
            .await;

        let client = client_with(&server, memory_store(Session::new("A1", "R1", "u1")));
        let err = client
            .send(RequestDescriptor::get("transactions/summary/"))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::ServerError(ref body) if body == "boom"));
        failing.assert_async().await;
        refresh.assert_async().await;
        // Session untouched
        assert!(client.auth().is_authenticated());
    }

    #[tokio::test]
    async fn test_concurrent_401s_share_one_refresh() {
        let mut server = Server::new_async().await;
        let rejected = server
            .mock("GET", SUMMARY_PATH)
            .match_header("authorization", "Bearer A1")
            .with_status(401)
            .expect(2)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", REFRESH_PATH)
            .with_status(200)
            .with_body(r#"{"access": "A2"}"#)
            .expect(1)
            .create_async()
            .await;
        let retried = server
            .mock("GET", SUMMARY_PATH)
            .match_header("authorization", "Bearer A2")
            .with_status(200)
            .with_body(SUMMARY_BODY)
            .expect(2)
            .create_async()
            .await;

        let client = client_with(&server, memory_store(Session::new("A1", "R1", "u1")));
        let (first, second) = futures::join!(
            client.send(RequestDescriptor::get("transactions/summary/")),
            client.send(RequestDescriptor::get("transactions/summary/")),
        );

        assert!(first.is_ok());
        assert!(second.is_ok());
        rejected.assert_async().await;
        refresh.assert_async().await;
        retried.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_envelope_validation_failure() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/api/budgets/add/")
            .with_status(200)
            .with_body(r#"{"status": false, "message": "Budget already set for this month"}"#)
            .create_async()
            .await;

        let client = client_with(&server, memory_store(Session::new("A1", "R1", "u1")));
        let request = RequestDescriptor::post("budgets/add/")
            .json(&serde_json::json!({"amount": 100.0, "month": "2025-05-01"}))
            .unwrap();
        let err = client
            .send_envelope::<serde_json::Value>(request)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Budget already set for this month");
    }
}
