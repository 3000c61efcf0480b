use clap::{Parser, Subcommand};

/// Ratekeeper - set nightly listing prices from the terminal
#[derive(Parser, Debug)]
#[command(name = "ratekeeper")]
#[command(version)]
#[command(about = "Update nightly listing prices through the pricing API", long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Log in and store the session
    Login {
        /// Account email (defaults to the last one used)
        #[arg(long)]
        email: Option<String>,
    },

    /// End the current session
    Logout,

    /// Show who is logged in
    Status,

    /// Set the nightly rate for a single date
    SetPrice {
        /// Date as YYYY-MM-DD
        date: String,

        /// Nightly rate (whole number greater than 0)
        #[arg(allow_negative_numbers = true)]
        rate: i64,
    },

    /// Set the nightly rate for every date in a range, both ends included
    SetRange {
        /// First date as YYYY-MM-DD
        start: String,

        /// Last date as YYYY-MM-DD
        end: String,

        /// Nightly rate (whole number greater than 0)
        #[arg(allow_negative_numbers = true)]
        rate: i64,
    },

    /// View or change configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,

    /// Set a configuration value
    Set { key: String, value: String },
}

impl Command {
    /// Commands that may only run with an active session
    pub fn requires_session(&self) -> bool {
        matches!(self, Command::SetPrice { .. } | Command::SetRange { .. })
    }
}
