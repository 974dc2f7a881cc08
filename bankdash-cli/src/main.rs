//! bankdash CLI - linked bank accounts and transactions in your terminal

use std::process::ExitCode;
use std::sync::Once;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use bankdash_core::services::LogEvent;
use commands::{accounts, config, institution, link, logs, transfer, user};

/// bankdash - linked bank accounts and transactions in your terminal
#[derive(Parser)]
#[command(name = "bankdash", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show all linked accounts with balances
    Accounts {
        /// User id (defaults to the logged-in user)
        #[arg(long)]
        user: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one account and its transactions
    Account {
        /// Bank link id
        link_id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show institution metadata
    Institution {
        /// Aggregator institution id, e.g. ins_109508
        institution_id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage users and the session
    User {
        #[command(subcommand)]
        command: user::UserCommands,
    },

    /// Manage bank links
    Link {
        #[command(subcommand)]
        command: link::LinkCommands,
    },

    /// Record transfers between linked banks
    Transfer {
        #[command(subcommand)]
        command: transfer::TransferCommands,
    },

    /// Show or edit settings
    Config {
        #[command(subcommand)]
        command: config::ConfigCommands,
    },

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Accounts { .. } => "accounts",
            Commands::Account { .. } => "account",
            Commands::Institution { .. } => "institution",
            Commands::User { .. } => "user",
            Commands::Link { .. } => "link",
            Commands::Transfer { .. } => "transfer",
            Commands::Config { .. } => "config",
            Commands::Logs { .. } => "logs",
        }
    }

    /// Bank link the command targets, if any
    fn link_id(&self) -> Option<&str> {
        match self {
            Commands::Account { link_id, .. } => Some(link_id.as_str()),
            _ => None,
        }
    }
}

static TRACING_INIT: Once = Once::new();

/// Console logging to stderr, filtered by RUST_LOG
fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("bankdash_core=info,bankdash=info"));

        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    });
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let command = cli.command.name();
    let link_id = cli.command.link_id().map(str::to_string);
    let logger = commands::get_logger();

    // Event log entries carry the command and link id only
    let event = |name: &str| {
        let mut event = LogEvent::new(name).with_command(command);
        if let Some(id) = &link_id {
            event = event.with_link(id.clone());
        }
        event
    };
    commands::log_event(&logger, event("command_executed"));

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let logged = match e.downcast_ref::<bankdash_core::Error>() {
                Some(core) => event("command_failed").with_core_error(core),
                None => event("command_failed").with_error(e.to_string()),
            };
            commands::log_event(&logger, logged);
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Accounts { user, json } => accounts::run_list(user, json),
        Commands::Account { link_id, json } => accounts::run_detail(&link_id, json),
        Commands::Institution { institution_id, json } => institution::run(&institution_id, json),
        Commands::User { command } => user::run(command),
        Commands::Link { command } => link::run(command),
        Commands::Transfer { command } => transfer::run(command),
        Commands::Config { command } => config::run(command),
        Commands::Logs { command } => logs::run(command),
    }
}
