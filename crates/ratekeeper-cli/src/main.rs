//! Ratekeeper - set nightly listing prices from the terminal.
//!
//! Logs in against the pricing API, keeps the session between runs and
//! sends single-date or date-range price updates for the configured property.

mod args;
mod terminal;

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ratekeeper_core::api::ApiError;
use ratekeeper_core::models::PriceUpdate;
use ratekeeper_core::utils::describe_update;
use ratekeeper_core::{ApiClient, Config, Credentials, PricingService, SessionStore};

use args::{Cli, Command, ConfigCommand};
use terminal::TerminalNotifier;

/// Log file name prefix; tracing-appender adds the date suffix
const LOG_FILE_PREFIX: &str = "ratekeeper.log";

/// A price update may span a login refresh and a retry, so allow a few round trips.
const DEADLINE_REQUEST_MULTIPLIER: u32 = 3;

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr and to a daily rolling file under `log_dir`. If the log
/// directory cannot be created, logging continues on stderr alone. The returned
/// guard must be held until exit so buffered lines are flushed.
fn init_tracing(log_dir: Option<&Path>, verbose: bool) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let appender = log_dir.and_then(|dir| match file_appender(dir) {
        Ok(appender) => Some(appender),
        Err(e) => {
            eprintln!("Warning: file logging disabled ({})", e);
            None
        }
    });
    let (file_layer, guard) = match appender {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .init();

    guard
}

fn file_appender(dir: &Path) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .build(dir)
        .with_context(|| format!("cannot write logs to {}", dir.display()))
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = Config::load().context("Failed to load configuration")?;

    let log_dir = config.cache_dir().ok().map(|dir| dir.join("logs"));
    let _guard = init_tracing(log_dir.as_deref(), cli.verbose);
    info!("Ratekeeper starting");

    let session = Arc::new(
        SessionStore::new(config.session_backend()?).with_max_age(config.session_max_age()),
    );
    if let Err(e) = session.load() {
        warn!(error = %e, "Failed to load saved session");
    }

    if cli.command.requires_session() && !session.is_authenticated() {
        bail!("Not logged in. Run `ratekeeper login` first.");
    }

    match cli.command {
        Command::Login { email } => login(&config, session, email).await,
        Command::Logout => {
            session.clear().context("Failed to clear session")?;
            println!("Logged out");
            Ok(ExitCode::SUCCESS)
        }
        Command::Status => {
            print_status(&config, &session);
            Ok(ExitCode::SUCCESS)
        }
        Command::SetPrice { date, rate } => {
            let service = pricing_service(&config, session)?;
            if let Ok(update) = PriceUpdate::single(&date, rate) {
                println!("Updating {}", describe_update(&update));
            }
            Ok(outcome(service.update_single_date_price(&date, rate).await))
        }
        Command::SetRange { start, end, rate } => {
            let service = pricing_service(&config, session)?;
            if let Ok(update) = PriceUpdate::range(&start, &end, rate) {
                println!("Updating {}", describe_update(&update));
            }
            Ok(outcome(service.update_range_price(&start, &end, rate).await))
        }
        Command::Config(cmd) => {
            run_config(&cmd, &config)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn pricing_service(config: &Config, session: Arc<SessionStore>) -> Result<PricingService> {
    let client = ApiClient::new(config.api_base_url()?, config.request_timeout(), session)?;
    let deadline = config.request_timeout() * DEADLINE_REQUEST_MULTIPLIER;
    Ok(PricingService::new(client, config.property_id()?, Arc::new(TerminalNotifier)).with_deadline(deadline))
}

/// Notices were already printed; only add a hint for an expired session
fn outcome<T>(result: Result<T, ApiError>) -> ExitCode {
    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            if e.is_auth_expired() {
                eprintln!("Run `ratekeeper login` to start a new session.");
            }
            ExitCode::FAILURE
        }
    }
}

async fn login(config: &Config, session: Arc<SessionStore>, email: Option<String>) -> Result<ExitCode> {
    if let Some(data) = session.snapshot().filter(|_| session.is_authenticated()) {
        println!("Already logged in as {}", data.display_name());
        return Ok(ExitCode::SUCCESS);
    }

    let email = match email.or_else(|| config.last_email.clone()) {
        Some(email) => email,
        None => prompt("Email: ")?,
    };
    let password = rpassword::prompt_password(format!("Password for {}: ", email))
        .context("Failed to read password")?;

    let client = ApiClient::new(config.api_base_url()?, config.request_timeout(), session)?;
    match client.login(&Credentials::new(email.clone(), password)).await {
        Ok(data) => {
            println!("✓ Successfully logged in as {}", data.display_name());
            if let Err(e) = remember_email(&email) {
                warn!(error = %e, "Failed to save config");
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(ApiError::LoginFailed(message)) => {
            eprintln!("✗ {}", message);
            Ok(ExitCode::FAILURE)
        }
        Err(e) => {
            debug!(error = %e, "Login request failed");
            eprintln!("✗ Something went wrong: {}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Persist the email to the config file without baking in env overrides
fn remember_email(email: &str) -> Result<()> {
    let mut file_config = Config::load_file()?;
    file_config.last_email = Some(email.to_string());
    file_config.save()
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let value = line.trim().to_string();
    if value.is_empty() {
        bail!("No input given");
    }
    Ok(value)
}

fn print_status(config: &Config, session: &SessionStore) {
    match session.snapshot().filter(|_| session.is_authenticated()) {
        Some(data) => {
            let age = Utc::now() - data.created_at;
            println!("Logged in as {} <{}>", data.display_name(), data.email);
            println!("Session age: {}h {}m", age.num_hours(), age.num_minutes() % 60);
            if let Some(refreshed) = data.refreshed_at {
                println!("Token refreshed: {}", refreshed.format("%Y-%m-%d %H:%M UTC"));
            }
        }
        None => println!("Not logged in"),
    }
    println!("Session storage: {}", config.session_backend);
}

fn run_config(cmd: &ConfigCommand, config: &Config) -> Result<()> {
    match cmd {
        ConfigCommand::Show => {
            let or_unset = |v: Option<&str>| v.unwrap_or("(not set)").to_string();
            println!("api_base_url         = {}", or_unset(config.api_base_url.as_deref()));
            println!("property_id          = {}", or_unset(config.property_id.as_deref()));
            println!("last_email           = {}", or_unset(config.last_email.as_deref()));
            println!("session_backend      = {}", config.session_backend);
            println!("request_timeout_secs = {}", config.request_timeout_secs);
            println!("session_max_age_days = {}", config.session_max_age_days);
        }
        ConfigCommand::Set { key, value } => {
            let mut file_config = Config::load_file()?;
            file_config.set(key, value)?;
            file_config.save().context("Failed to save configuration")?;
            println!("Set {}", key);
        }
    }
    Ok(())
}
