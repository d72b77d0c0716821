use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::ApiError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    #[serde(default, deserialize_with = "super::de::amount")]
    pub total_income: f64,
    #[serde(default, deserialize_with = "super::de::amount")]
    pub total_expenses: f64,
    #[serde(default, deserialize_with = "super::de::amount")]
    pub balance: f64,
}

impl Summary {
    /// Parse a summary response. The server sends the totals either nested
    /// under `records` or flat at the top level; both are accepted.
    pub fn from_response(value: serde_json::Value) -> Result<Self, ApiError> {
        if let Some(status) = value.get("status") {
            let ok = match status {
                serde_json::Value::Bool(b) => *b,
                serde_json::Value::String(s) => s.eq_ignore_ascii_case("true"),
                _ => true,
            };
            if !ok {
                let message = value
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("Failed to fetch financial data")
                    .to_string();
                return Err(ApiError::Validation(message));
            }
        }

        let totals = match value.get("records") {
            Some(records) if records.is_object() => records.clone(),
            _ => value,
        };
        serde_json::from_value(totals)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse summary: {}", e)))
    }

    /// Label/value pairs for charting.
    pub fn chart_data(&self) -> [(&'static str, f64); 3] {
        [
            ("Income", self.total_income),
            ("Expenses", self.total_expenses),
            ("Balance", self.balance),
        ]
    }
}

/// Optional date bounds for the summary query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(start) = self.start {
            query.push(("start_date".to_string(), start.format("%Y-%m-%d").to_string()));
        }
        if let Some(end) = self.end {
            query.push(("end_date".to_string(), end.format("%Y-%m-%d").to_string()));
        }
        query
    }
}
