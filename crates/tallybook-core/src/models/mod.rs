//! Data models for the finance API.
//!
//! - `Category`: transaction categories
//! - `Transaction`, `TransactionInput`, `TransactionFilter`: ledger entries
//! - `Budget`, `BudgetStatus`: monthly budgets
//! - `Summary`, `DateRange`: income/expense totals
//! - `ApiEnvelope`: the `{status, message, records}` response wrapper

pub mod budget;
pub mod category;
pub(crate) mod de;
pub mod envelope;
pub mod summary;
pub mod transaction;

pub use budget::{month_end, month_key, month_start, parse_month, Budget, BudgetStatus};
pub use category::{category_title, Category};
pub use envelope::ApiEnvelope;
pub use summary::{DateRange, Summary};
pub use transaction::{
    Transaction, TransactionFilter, TransactionInput, TransactionPage, TransactionType,
    TransactionUpdate, DEFAULT_PAGE_SIZE,
};
