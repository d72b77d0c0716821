//! Transaction models and the list filter.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Default number of rows per page on the transaction list.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "income" => Ok(TransactionType::Income),
            "expense" | "expenses" => Ok(TransactionType::Expense),
            other => Err(format!(
                "unknown transaction type '{}' (expected 'income' or 'expense')",
                other
            )),
        }
    }
}

/// A transaction as returned by the list and details endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(deserialize_with = "super::de::id")]
    pub id: String,
    pub transaction_type: TransactionType,
    #[serde(deserialize_with = "super::de::amount")]
    pub amount: f64,
    #[serde(default, deserialize_with = "super::de::string_or_number")]
    pub category: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Transaction {
    /// Amount with sign applied: expenses are negative.
    pub fn signed_amount(&self) -> f64 {
        match self.transaction_type {
            TransactionType::Income => self.amount,
            TransactionType::Expense => -self.amount,
        }
    }

    /// Editable fields of this transaction, used to prefill an update.
    /// Returns `None` when the stored date is missing or unparseable.
    pub fn to_input(&self) -> Option<TransactionInput> {
        let date = self.date.as_deref().and_then(parse_date)?;
        Some(TransactionInput {
            transaction_type: self.transaction_type,
            amount: self.amount,
            category: self.category.clone().unwrap_or_default(),
            date,
            description: self.description.clone().unwrap_or_default(),
        })
    }
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

/// Request body for adding a transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionInput {
    pub transaction_type: TransactionType,
    pub amount: f64,
    pub category: String,
    pub date: NaiveDate,
    pub description: String,
}

impl TransactionInput {
    /// Local checks before anything goes over the wire.
    pub fn validate(&self) -> Result<(), String> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err("Amount must be greater than zero".to_string());
        }
        if self.category.trim().is_empty() {
            return Err("Category is required".to_string());
        }
        Ok(())
    }
}

/// Request body for updating a transaction: `{id, ...fields}`.
#[derive(Debug, Serialize)]
pub struct TransactionUpdate<'a> {
    pub id: &'a str,
    #[serde(flatten)]
    pub input: &'a TransactionInput,
}

/// Filters for the transaction list. Unset filters go out as empty strings.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionFilter {
    pub page: u32,
    pub page_size: u32,
    pub date: Option<NaiveDate>,
    pub category: Option<String>,
    pub transaction_type: Option<TransactionType>,
    pub amount_min: Option<f64>,
    pub amount_max: Option<f64>,
}

impl Default for TransactionFilter {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            date: None,
            category: None,
            transaction_type: None,
            amount_min: None,
            amount_max: None,
        }
    }
}

impl TransactionFilter {
    pub fn to_body(&self) -> serde_json::Value {
        fn or_empty<T: ToString>(value: Option<T>) -> String {
            value.map(|v| v.to_string()).unwrap_or_default()
        }

        serde_json::json!({
            "page": self.page.max(1),
            "page_size": self.page_size.max(1),
            "date": or_empty(self.date.map(|d| d.format("%Y-%m-%d"))),
            "category": or_empty(self.category.as_deref()),
            "transaction_type": or_empty(self.transaction_type),
            "amount_min": or_empty(self.amount_min),
            "amount_max": or_empty(self.amount_max),
        })
    }
}

/// One page of the transaction list.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionPage {
    pub records: Vec<Transaction>,
    pub page: u32,
    pub num_pages: u32,
}

impl TransactionPage {
    pub fn has_next(&self) -> bool {
        self.page < self.num_pages
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_transaction_with_string_amount() {
        let json = r#"{"id": 7, "transaction_type": "expense", "amount": "450.00",
                       "category": 3, "date": "2025-05-04", "description": "Groceries"}"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.id, "7");
        assert_eq!(tx.transaction_type, TransactionType::Expense);
        assert_eq!(tx.amount, 450.0);
        assert_eq!(tx.category.as_deref(), Some("3"));
        assert_eq!(tx.signed_amount(), -450.0);
    }

    #[test]
    fn test_to_input_prefills_update() {
        let json = r#"{"id": "a1", "transaction_type": "income", "amount": 1000,
                       "category": "Salary", "date": "2025-05-01T00:00:00Z"}"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();
        let input = tx.to_input().unwrap();
        assert_eq!(input.date, NaiveDate::from_ymd_opt(2025, 5, 1).unwrap());
        assert_eq!(input.category, "Salary");
        assert_eq!(input.description, "");
    }

    #[test]
    fn test_transaction_type_from_str() {
        assert_eq!("Income".parse::<TransactionType>(), Ok(TransactionType::Income));
        assert_eq!("expense".parse::<TransactionType>(), Ok(TransactionType::Expense));
        assert!("transfer".parse::<TransactionType>().is_err());
    }

    #[test]
    fn test_filter_body_uses_empty_strings_for_unset() {
        let body = TransactionFilter::default().to_body();
        assert_eq!(body["page"], 1);
        assert_eq!(body["page_size"], 10);
        assert_eq!(body["date"], "");
        assert_eq!(body["category"], "");
        assert_eq!(body["transaction_type"], "");
        assert_eq!(body["amount_min"], "");
        assert_eq!(body["amount_max"], "");
    }

    #[test]
    fn test_filter_body_with_values() {
        let filter = TransactionFilter {
            page: 2,
            date: NaiveDate::from_ymd_opt(2025, 5, 4),
            category: Some("3".to_string()),
            transaction_type: Some(TransactionType::Expense),
            amount_min: Some(100.0),
            amount_max: Some(250.5),
            ..Default::default()
        };
        let body = filter.to_body();
        assert_eq!(body["page"], 2);
        assert_eq!(body["date"], "2025-05-04");
        assert_eq!(body["transaction_type"], "expense");
        assert_eq!(body["amount_min"], "100");
        assert_eq!(body["amount_max"], "250.5");
    }

    #[test]
    fn test_update_body_flattens_fields() {
        let input = TransactionInput {
            transaction_type: TransactionType::Income,
            amount: 20.0,
            category: "1".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 5, 2).unwrap(),
            description: "Refund".to_string(),
        };
        let body = serde_json::to_value(TransactionUpdate { id: "9", input: &input }).unwrap();
        assert_eq!(body["id"], "9");
        assert_eq!(body["transaction_type"], "income");
        assert_eq!(body["date"], "2025-05-02");
        assert_eq!(body["amount"], 20.0);
    }

    #[test]
    fn test_input_validate() {
        let mut input = TransactionInput {
            transaction_type: TransactionType::Expense,
            amount: 0.0,
            category: "Food".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 5, 2).unwrap(),
            description: String::new(),
        };
        assert!(input.validate().is_err());
        input.amount = 12.5;
        assert!(input.validate().is_ok());
        input.category = " ".to_string();
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_page_navigation() {
        let page = TransactionPage { records: vec![], page: 1, num_pages: 3 };
        assert!(page.has_next());
        assert!(!page.has_prev());
    }
}
