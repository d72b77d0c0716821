use serde::Deserialize;

use crate::api::ApiError;

/// Standard response wrapper: `{status, message?, records?, num_pages?}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default, deserialize_with = "super::de::bool_like")]
    pub status: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub records: Option<T>,
    #[serde(default)]
    pub num_pages: Option<u32>,
}

impl<T> ApiEnvelope<T> {
    fn failure_message(message: Option<String>) -> String {
        message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| "Request was rejected by the server".to_string())
    }

    /// Fail with the server's message when `status` is false.
    pub fn check(self) -> Result<Self, ApiError> {
        if self.status {
            Ok(self)
        } else {
            Err(ApiError::Validation(Self::failure_message(self.message)))
        }
    }

    /// The records of a successful response.
    pub fn into_records(self) -> Result<T, ApiError> {
        let checked = self.check()?;
        checked
            .records
            .ok_or_else(|| ApiError::InvalidResponse("Response is missing records".to_string()))
    }

    /// The optional confirmation message of a successful response.
    pub fn into_message(self) -> Result<Option<String>, ApiError> {
        Ok(self.check()?.message)
    }
}
