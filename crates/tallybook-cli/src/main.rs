//! Tallybook - a command-line client for the personal finance API.
//!
//! Each subcommand is one page of the tracker: dashboard summary,
//! transaction list and editing, and monthly budgets.

mod app;
mod cli;
mod render;

use std::io;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tallybook_core::ApiError;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;
use cli::{Cli, Commands};

/// Shown whenever the session ends for good during a command
const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please log in again.";

/// Initialize logging to stderr, plus `log_file` when given.
/// RUST_LOG controls the level (e.g. RUST_LOG=tallybook_core=debug).
fn init_tracing(log_file: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let name = path.file_name().unwrap_or(path.as_os_str());
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut app = App::new(cli.api_url)?;

    let result = match cli.command {
        Commands::Login { email } => app.login(email).await,
        Commands::Logout => app.logout(),
        Commands::Whoami => app.whoami(),
        Commands::Dashboard { start, end } => app.dashboard(start, end).await,
        Commands::Categories => app.categories().await,
        Commands::Transactions(args) => app.transactions(args).await,
        Commands::Add(args) => app.add(args).await,
        Commands::Edit(args) => app.edit(args).await,
        Commands::Delete { id } => app.delete(&id).await,
        Commands::Budget { month, set } => app.budget(month.as_deref(), set).await,
    };

    if app.session_ended() {
        info!("Session ended during command; stored tokens were cleared");
    }
    result
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_file.as_deref());
    info!("tallybook starting");

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            debug!(error = %format!("{:#}", e), "command failed");
            match e.downcast_ref::<ApiError>() {
                Some(api_err) if api_err.is_terminal_auth() => eprintln!("{}", SESSION_EXPIRED_MESSAGE),
                _ => eprintln!("Error: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}
