//! Typed client for the finance endpoints.
//!
//! Every method goes through the `AuthenticatedClient` pipeline, so callers
//! only ever see `ApiError::AuthenticationFailure` when the session is gone
//! for good.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::debug;

use super::pipeline::AuthenticatedClient;
use super::request::RequestDescriptor;
use super::{build_http_client, parse_base_url, ApiError};
use crate::auth::{AuthManager, SessionStore};
use crate::models::{
    month_end, month_key, month_start, Budget, BudgetStatus, Category, DateRange, Summary,
    Transaction, TransactionFilter, TransactionInput, TransactionPage, TransactionUpdate,
};

/// API client for the finance service.
/// Clone is cheap - the pipeline shares its connection pool and session.
#[derive(Clone)]
pub struct FinanceApi {
    client: AuthenticatedClient,
}

impl FinanceApi {
    pub fn new(client: AuthenticatedClient) -> Self {
        Self { client }
    }

    /// Wire up the HTTP client, auth manager, and pipeline for `base_url`.
    pub fn connect(base_url: &str, timeout: Duration, store: SessionStore) -> Result<Self, ApiError> {
        let base_url = parse_base_url(base_url)?;
        let http = build_http_client(timeout)?;
        let auth = Arc::new(AuthManager::new(http.clone(), base_url.clone(), store));
        Ok(Self::new(AuthenticatedClient::new(http, base_url, auth)))
    }

    pub fn auth(&self) -> &Arc<AuthManager> {
        self.client.auth()
    }

    pub fn pipeline(&self) -> &AuthenticatedClient {
        &self.client
    }

    // ===== Categories =====

    pub async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        let request = RequestDescriptor::post("categories/list/").json(&serde_json::json!({}))?;
        let envelope = self.client.send_envelope::<Vec<Category>>(request).await?;
        Ok(envelope.records.unwrap_or_default())
    }

    // ===== Transactions =====

    pub async fn list_transactions(&self, filter: &TransactionFilter) -> Result<TransactionPage, ApiError> {
        let request = RequestDescriptor::post("transactions/list/").json(&filter.to_body())?;
        let envelope = self.client.send_envelope::<Vec<Transaction>>(request).await?;
        let num_pages = envelope.num_pages.unwrap_or(1).max(1);
        let records = envelope.records.unwrap_or_default();
        debug!(count = records.len(), page = filter.page, num_pages, "Fetched transactions");
        Ok(TransactionPage {
            records,
            page: filter.page.max(1),
            num_pages,
        })
    }

    pub async fn transaction_details(&self, id: &str) -> Result<Transaction, ApiError> {
        let request = RequestDescriptor::post("transactions/details/")
            .json(&serde_json::json!({ "id": id }))?;
        self.client
            .send_envelope::<Transaction>(request)
            .await?
            .into_records()
    }

    /// Returns the server's confirmation message, if any.
    pub async fn add_transaction(&self, input: &TransactionInput) -> Result<Option<String>, ApiError> {
        input.validate().map_err(ApiError::Validation)?;
        let request = RequestDescriptor::post("transactions/add/").json(input)?;
        self.client
            .send_envelope::<serde_json::Value>(request)
            .await?
            .into_message()
    }

    pub async fn update_transaction(
        &self,
        id: &str,
        input: &TransactionInput,
    ) -> Result<Option<String>, ApiError> {
        input.validate().map_err(ApiError::Validation)?;
        let request = RequestDescriptor::put("transactions/update/").json(&TransactionUpdate { id, input })?;
        self.client
            .send_envelope::<serde_json::Value>(request)
            .await?
            .into_message()
    }

    pub async fn delete_transaction(&self, id: &str) -> Result<(), ApiError> {
        let id = id.trim();
        if id.is_empty() || id.contains('/') {
            return Err(ApiError::InvalidRequest(format!("Invalid transaction id '{}'", id)));
        }
        let request = RequestDescriptor::delete(format!("transactions/delete/{}/", id));
        self.client.send(request).await?;
        Ok(())
    }

    // ===== Summary =====

    pub async fn summary(&self, range: DateRange) -> Result<Summary, ApiError> {
        let request = RequestDescriptor::get("transactions/summary/").query(range.to_query());
        let value: serde_json::Value = self.client.send_json(request).await?;
        Summary::from_response(value)
    }

    // ===== Budgets =====

    pub async fn list_budgets(&self, month: NaiveDate) -> Result<Vec<Budget>, ApiError> {
        let request = RequestDescriptor::post("budgets/list/")
            .json(&serde_json::json!({ "month": month_key(month) }))?;
        let envelope = self.client.send_envelope::<Vec<Budget>>(request).await?;
        Ok(envelope.records.unwrap_or_default())
    }

    pub async fn add_budget(&self, amount: f64, month: NaiveDate) -> Result<Option<String>, ApiError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(ApiError::Validation("Budget must be greater than zero".to_string()));
        }
        let request = RequestDescriptor::post("budgets/add/")
            .json(&serde_json::json!({ "amount": amount, "month": month_key(month) }))?;
        self.client
            .send_envelope::<serde_json::Value>(request)
            .await?
            .into_message()
    }

    /// The month's budget next to that month's expenses.
    /// A rejected budget lookup means no budget is set; expenses still load.
    pub async fn budget_status(&self, month: NaiveDate) -> Result<BudgetStatus, ApiError> {
        let start = month_start(month);
        let budget = match self.list_budgets(start).await {
            Ok(budgets) => budgets.first().map(|b| b.amount),
            Err(ApiError::Validation(message)) => {
                debug!(%message, month = %start, "No budget for month");
                None
            }
            Err(e) => return Err(e),
        };
        let range = DateRange::new(Some(start), Some(month_end(start)));
        let summary = self.summary(range).await?;
        Ok(BudgetStatus {
            month: start,
            budget,
            expenses: summary.total_expenses,
        })
    }
}
