//! REST API module for the Tallybook finance service.
//!
//! All calls go through the `AuthenticatedClient` pipeline, which attaches
//! the bearer token and performs a single silent refresh-and-retry when the
//! server answers 401. `FinanceApi` wraps every endpoint in typed methods.

pub mod client;
pub mod error;
pub mod pipeline;
pub mod request;

use std::time::Duration;

use reqwest::{Client, Url};

pub use client::FinanceApi;
pub use error::ApiError;
pub use pipeline::AuthenticatedClient;
pub use request::RequestDescriptor;

/// Build the shared HTTP client.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
pub fn build_http_client(timeout: Duration) -> Result<Client, ApiError> {
    Ok(Client::builder().timeout(timeout).build()?)
}

/// Parse the API base URL, making sure relative endpoint paths join under it.
pub fn parse_base_url(raw: &str) -> Result<Url, ApiError> {
    let trimmed = raw.trim();
    let normalized = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    };
    Url::parse(&normalized)
        .map_err(|e| ApiError::InvalidRequest(format!("Invalid API base URL '{}': {}", raw, e)))
}

/// Join an endpoint path onto the base URL.
pub(crate) fn endpoint(base: &Url, path: &str) -> Result<Url, ApiError> {
    base.join(path.trim_start_matches('/'))
        .map_err(|e| ApiError::InvalidRequest(format!("Invalid endpoint path '{}': {}", path, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_base_url_adds_trailing_slash() {
        let url = parse_base_url("http://localhost:8000/api").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/");
        assert_eq!(
            endpoint(&url, "auth/login/").unwrap().as_str(),
            "http://localhost:8000/api/auth/login/"
        );
    }

    #[test]
    fn test_endpoint_ignores_leading_slash() {
        let url = parse_base_url("https://budget.example.com/api/").unwrap();
        assert_eq!(
            endpoint(&url, "/token/refresh/").unwrap().as_str(),
            "https://budget.example.com/api/token/refresh/"
        );
    }

    #[test]
    fn test_parse_base_url_rejects_garbage() {
        assert!(matches!(
            parse_base_url("not a url"),
            Err(ApiError::InvalidRequest(_))
        ));
    }
}
