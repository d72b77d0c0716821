use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tallybook_core::models::{TransactionFilter, TransactionType, DEFAULT_PAGE_SIZE};

#[derive(Parser)]
#[command(name = "tallybook")]
#[command(version)]
#[command(about = "Track income, expenses, and monthly budgets")]
pub struct Cli {
    /// API base URL (overrides the config file and TALLYBOOK_API_URL)
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Also write logs to this file
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and store the session
    Login {
        /// Account email (defaults to TALLYBOOK_EMAIL or the last used email)
        #[arg(long)]
        email: Option<String>,
    },
    /// End the session and forget stored tokens
    Logout,
    /// Show who is logged in
    Whoami,
    /// Income, expenses, and balance
    Dashboard {
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,
        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,
    },
    /// List transaction categories
    Categories,
    /// List and filter transactions
    Transactions(ListArgs),
    /// Add a transaction
    Add(AddArgs),
    /// Edit a transaction; omitted fields keep their current values
    Edit(EditArgs),
    /// Delete a transaction
    Delete {
        #[arg(value_name = "TRANSACTION_ID")]
        id: String,
    },
    /// Show or set the monthly budget
    Budget {
        /// Month (YYYY-MM), defaults to the current month
        #[arg(long)]
        month: Option<String>,
        /// Set the budget for the month to this amount
        #[arg(long, value_name = "AMOUNT")]
        set: Option<f64>,
    },
}

#[derive(Args)]
pub struct ListArgs {
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: u32,
    /// Only transactions on this date (YYYY-MM-DD)
    #[arg(long)]
    pub date: Option<NaiveDate>,
    /// Category id or title
    #[arg(long)]
    pub category: Option<String>,
    /// income or expense
    #[arg(long = "type", value_name = "TYPE")]
    pub transaction_type: Option<TransactionType>,
    #[arg(long)]
    pub min: Option<f64>,
    #[arg(long)]
    pub max: Option<f64>,
}

impl ListArgs {
    pub fn to_filter(&self, category: Option<String>) -> TransactionFilter {
        TransactionFilter {
            page: self.page,
            page_size: self.page_size,
            date: self.date,
            category,
            transaction_type: self.transaction_type,
            amount_min: self.min,
            amount_max: self.max,
        }
    }
}

#[derive(Args)]
pub struct AddArgs {
    /// income or expense
    #[arg(long = "type", value_name = "TYPE", default_value = "expense")]
    pub transaction_type: TransactionType,
    #[arg(long)]
    pub amount: f64,
    /// Category id or title
    #[arg(long)]
    pub category: String,
    /// Defaults to today
    #[arg(long)]
    pub date: Option<NaiveDate>,
    #[arg(long, default_value = "")]
    pub description: String,
}

#[derive(Args)]
pub struct EditArgs {
    #[arg(value_name = "TRANSACTION_ID")]
    pub id: String,
    #[arg(long = "type", value_name = "TYPE")]
    pub transaction_type: Option<TransactionType>,
    #[arg(long)]
    pub amount: Option<f64>,
    /// Category id or title
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub date: Option<NaiveDate>,
    #[arg(long)]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_transactions_filters() {
        let cli = Cli::parse_from([
            "tallybook", "transactions", "--page", "2", "--type", "expense", "--min", "10",
        ]);
        match cli.command {
            Commands::Transactions(args) => {
                let filter = args.to_filter(None);
                assert_eq!(filter.page, 2);
                assert_eq!(filter.page_size, DEFAULT_PAGE_SIZE);
                assert_eq!(filter.transaction_type, Some(TransactionType::Expense));
                assert_eq!(filter.amount_min, Some(10.0));
            }
            _ => panic!("expected transactions command"),
        }
    }

    #[test]
    fn test_parse_add_defaults() {
        let cli = Cli::parse_from(["tallybook", "add", "--amount", "12.5", "--category", "Food"]);
        match cli.command {
            Commands::Add(args) => {
                assert_eq!(args.transaction_type, TransactionType::Expense);
                assert_eq!(args.date, None);
                assert_eq!(args.description, "");
            }
            _ => panic!("expected add command"),
        }
    }

    #[test]
    fn test_parse_budget_set() {
        let cli = Cli::parse_from(["tallybook", "budget", "--set", "1500", "--month", "2025-05"]);
        match cli.command {
            Commands::Budget { month, set } => {
                assert_eq!(month.as_deref(), Some("2025-05"));
                assert_eq!(set, Some(1500.0));
            }
            _ => panic!("expected budget command"),
        }
    }
}
