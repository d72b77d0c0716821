//! Page handlers behind each subcommand.

use std::io::{self, Write};

use anyhow::{anyhow, bail, Context, Result};
use chrono::{Local, NaiveDate};
use tallybook_core::models::{month_start, parse_month, Category, DateRange, TransactionInput};
use tallybook_core::navigation::guard;
use tallybook_core::{ApiError, AuthState, Config, Credentials, FinanceApi, Route};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::cli::{AddArgs, EditArgs, ListArgs};
use crate::render;

const EMAIL_ENV: &str = "TALLYBOOK_EMAIL";
const PASSWORD_ENV: &str = "TALLYBOOK_PASSWORD";

pub struct App {
    config: Config,
    api: FinanceApi,
    auth_events: watch::Receiver<AuthState>,
}

impl App {
    /// Load config and connect. `api_url` wins over every other source.
    pub fn new(api_url: Option<String>) -> Result<Self> {
        let config = Config::load().unwrap_or_else(|e| {
            warn!(error = %format!("{:#}", e), "Failed to load config, using defaults");
            Config::default()
        });
        let base_url = api_url.unwrap_or_else(|| config.api_base_url());
        let store = config.session_store()?;
        let api = FinanceApi::connect(&base_url, config.request_timeout(), store)
            .with_context(|| format!("Invalid API URL '{}'", base_url))?;
        let auth_events = api.auth().subscribe();
        debug!(%base_url, storage = ?config.storage, "App initialized");

        Ok(Self {
            config,
            api,
            auth_events,
        })
    }

    /// Enter a page, refusing it when the guard sends us to login instead.
    fn mount(&self, route: Route) -> Result<Route> {
        let shown = guard(route.clone(), self.api.auth());
        if shown != route {
            debug!(target_route = %route, "Redirected to login");
            bail!("Not logged in. Run `tallybook login` first.");
        }
        debug!(route = %shown, title = shown.title(), "Mounted page");
        Ok(shown)
    }

    /// True once when the session was ended since the last check.
    pub fn session_ended(&mut self) -> bool {
        let changed = self.auth_events.has_changed().unwrap_or(false);
        changed && *self.auth_events.borrow_and_update() == AuthState::Unauthenticated
    }

    // ===== Session =====

    pub async fn login(&mut self, email: Option<String>) -> Result<()> {
        self.mount(Route::Login)?;

        let email = match email
            .or_else(|| std::env::var(EMAIL_ENV).ok())
            .or_else(|| self.config.last_email.clone())
            .filter(|e| !e.trim().is_empty())
        {
            Some(email) => email,
            None => prompt("Email: ")?,
        };
        let password = match std::env::var(PASSWORD_ENV) {
            Ok(password) if !password.is_empty() => password,
            _ => rpassword::prompt_password(format!("Password for {}: ", email))
                .context("Failed to read password")?,
        };
        if email.trim().is_empty() || password.is_empty() {
            bail!("Email and password are required");
        }

        let credentials = Credentials::new(email.trim(), password);
        match self.api.auth().login(&credentials).await {
            Ok(session) => {
                self.config.last_email = Some(credentials.email.clone());
                if let Err(e) = self.config.save() {
                    warn!(error = %format!("{:#}", e), "Failed to save config");
                }
                info!(user = %session.user_id, "Logged in");
                println!("Logged in as {}", credentials.email);
                Ok(())
            }
            Err(ApiError::AuthenticationFailure(_)) => bail!("Invalid credentials"),
            Err(ApiError::Network(e)) => {
                debug!(error = %e, "Login request failed");
                bail!("Unable to connect to server. Check your internet connection.")
            }
            Err(e) => Err(anyhow!(e).context("Login failed")),
        }
    }

    pub fn logout(&self) -> Result<()> {
        let was_logged_in = self.api.auth().is_authenticated();
        self.api.auth().logout();
        if was_logged_in {
            println!("Logged out");
        } else {
            println!("Not logged in");
        }
        Ok(())
    }

    pub fn whoami(&self) -> Result<()> {
        match self.api.auth().current_session() {
            Some(session) => {
                let email = self.config.last_email.as_deref().unwrap_or("unknown email");
                println!("Logged in as {} (user {})", email, session.user_id);
            }
            None => println!("Not logged in"),
        }
        Ok(())
    }

    // ===== Dashboard =====

    pub async fn dashboard(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<()> {
        self.mount(Route::Dashboard)?;
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                bail!("Start date must not be after end date");
            }
        }
        let summary = self.api.summary(DateRange::new(start, end)).await?;
        println!("{}", render::summary(&summary));
        Ok(())
    }

    // ===== Transactions =====

    pub async fn categories(&self) -> Result<()> {
        self.mount(Route::ManageTransactions)?;
        let categories = self.api.list_categories().await?;
        println!("{}", render::categories(&categories));
        Ok(())
    }

    pub async fn transactions(&self, args: ListArgs) -> Result<()> {
        self.mount(Route::Transactions)?;

        let (categories, page) = match args.category.as_deref() {
            // Titles need the category list before the filter can be built
            Some(reference) => {
                let categories = categories_or_empty(self.api.list_categories().await)?;
                let filter = args.to_filter(Some(resolve_category(&categories, reference)?));
                let page = self.api.list_transactions(&filter).await?;
                (categories, page)
            }
            None => {
                let filter = args.to_filter(None);
                let (categories, page) = futures::future::join(
                    self.api.list_categories(),
                    self.api.list_transactions(&filter),
                )
                .await;
                (categories_or_empty(categories)?, page?)
            }
        };

        println!("{}", render::transactions(&page, &categories));
        if page.has_next() {
            println!("Next page: --page {}", page.page + 1);
        }
        Ok(())
    }

    pub async fn add(&self, args: AddArgs) -> Result<()> {
        self.mount(Route::AddTransaction)?;

        let categories = categories_or_empty(self.api.list_categories().await)?;
        let input = TransactionInput {
            transaction_type: args.transaction_type,
            amount: args.amount,
            category: resolve_category(&categories, &args.category)?,
            date: args.date.unwrap_or_else(|| Local::now().date_naive()),
            description: args.description,
        };
        input.validate().map_err(anyhow::Error::msg)?;

        let message = self.api.add_transaction(&input).await?;
        println!("{}", message.as_deref().unwrap_or("Transaction added"));
        Ok(())
    }

    pub async fn edit(&self, args: EditArgs) -> Result<()> {
        self.mount(Route::EditTransaction(args.id.clone()))?;

        let (categories, details) = futures::future::join(
            self.api.list_categories(),
            self.api.transaction_details(&args.id),
        )
        .await;
        let categories = categories_or_empty(categories)?;
        let current = details?;

        let mut input = match (current.to_input(), args.date) {
            (Some(input), _) => input,
            (None, Some(date)) => TransactionInput {
                transaction_type: current.transaction_type,
                amount: current.amount,
                category: current.category.clone().unwrap_or_default(),
                date,
                description: current.description.clone().unwrap_or_default(),
            },
            (None, None) => bail!("Transaction {} has no valid date; pass --date", args.id),
        };
        if let Some(transaction_type) = args.transaction_type {
            input.transaction_type = transaction_type;
        }
        if let Some(amount) = args.amount {
            input.amount = amount;
        }
        if let Some(category) = args.category.as_deref() {
            input.category = resolve_category(&categories, category)?;
        }
        if let Some(date) = args.date {
            input.date = date;
        }
        if let Some(description) = args.description {
            input.description = description;
        }
        input.validate().map_err(anyhow::Error::msg)?;

        let message = self.api.update_transaction(&args.id, &input).await?;
        println!("{}", message.as_deref().unwrap_or("Transaction updated"));
        let updated = self.api.transaction_details(&args.id).await?;
        println!("{}", render::transaction(&updated, &categories));
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.mount(Route::ManageTransactions)?;
        self.api.delete_transaction(id).await?;
        println!("Transaction {} deleted", id.trim());
        Ok(())
    }

    // ===== Budget =====

    pub async fn budget(&self, month: Option<&str>, set: Option<f64>) -> Result<()> {
        self.mount(Route::Budget)?;

        let month = match month {
            Some(raw) => parse_month(raw)?,
            None => month_start(Local::now().date_naive()),
        };
        if let Some(amount) = set {
            let message = self.api.add_budget(amount, month).await?;
            println!("{}", message.as_deref().unwrap_or("Budget saved"));
        }

        let status = self.api.budget_status(month).await?;
        println!("{}", render::budget(&status));
        Ok(())
    }
}

/// Categories only label rows, so a failed fetch is not fatal
/// unless the session is gone.
fn categories_or_empty(result: Result<Vec<Category>, ApiError>) -> Result<Vec<Category>> {
    match result {
        Ok(categories) => Ok(categories),
        Err(e) if e.is_terminal_auth() => Err(e.into()),
        Err(e) => {
            warn!(error = %e, "Failed to load categories");
            Ok(Vec::new())
        }
    }
}

/// Map a category id or title to the id the API expects.
fn resolve_category(categories: &[Category], reference: &str) -> Result<String> {
    let reference = reference.trim();
    if reference.is_empty() {
        bail!("Category is required");
    }
    if categories.is_empty() {
        return Ok(reference.to_string());
    }
    categories
        .iter()
        .find(|c| c.id == reference)
        .or_else(|| categories.iter().find(|c| c.title.eq_ignore_ascii_case(reference)))
        .map(|c| c.id.clone())
        .ok_or_else(|| anyhow!("Unknown category '{}'. Run `tallybook categories` to list them.", reference))
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line).context("Failed to read input")?;
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories() -> Vec<Category> {
        vec![
            Category { id: "1".to_string(), title: "Salary".to_string() },
            Category { id: "2".to_string(), title: "Rent".to_string() },
        ]
    }

    #[test]
    fn test_resolve_category_by_id_or_title() {
        assert_eq!(resolve_category(&categories(), "2").unwrap(), "2");
        assert_eq!(resolve_category(&categories(), "salary").unwrap(), "1");
    }

    #[test]
    fn test_resolve_category_unknown() {
        let err = resolve_category(&categories(), "Travel").unwrap_err();
        assert!(err.to_string().contains("Unknown category 'Travel'"));
        assert!(resolve_category(&categories(), "  ").is_err());
    }

    #[test]
    fn test_resolve_category_without_list_passes_through() {
        assert_eq!(resolve_category(&[], "Food").unwrap(), "Food");
    }

    #[test]
    fn test_categories_or_empty() {
        let soft = categories_or_empty(Err(ApiError::ServerError("boom".to_string()))).unwrap();
        assert!(soft.is_empty());

        let terminal = categories_or_empty(Err(ApiError::AuthenticationFailure("expired".to_string())));
        let err = terminal.unwrap_err();
        assert!(err.downcast_ref::<ApiError>().is_some_and(|e| e.is_terminal_auth()));
    }
}
