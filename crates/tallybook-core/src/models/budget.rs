//! Monthly budgets and month arithmetic.

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    #[serde(deserialize_with = "super::de::amount")]
    pub amount: f64,
    #[serde(default)]
    pub month: Option<String>,
}

/// First day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Last day of the month containing `date`.
pub fn month_end(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|next| next.pred_opt())
        .unwrap_or(date)
}

/// Parse `YYYY-MM` or `YYYY-MM-DD` into the first day of that month.
pub fn parse_month(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&format!("{}-01", raw), "%Y-%m-%d"))
        .with_context(|| format!("Invalid month '{}', expected YYYY-MM", raw))?;
    Ok(month_start(date))
}

/// The wire format the budget endpoints use for a month.
pub fn month_key(month: NaiveDate) -> String {
    month_start(month).format("%Y-%m-%d").to_string()
}

/// A month's budget next to what was actually spent.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetStatus {
    pub month: NaiveDate,
    pub budget: Option<f64>,
    pub expenses: f64,
}

impl BudgetStatus {
    pub fn remaining(&self) -> Option<f64> {
        self.budget.map(|b| b - self.expenses)
    }

    pub fn is_over_budget(&self) -> bool {
        self.remaining().map(|r| r < 0.0).unwrap_or(false)
    }

    /// Share of the budget already spent, as a percentage.
    pub fn percent_used(&self) -> Option<f64> {
        match self.budget {
            Some(b) if b > 0.0 => Some(self.expenses / b * 100.0),
            _ => None,
        }
    }
}
