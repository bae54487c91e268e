//! `expense`: command-line client for Expense Explorer.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use eyre::{eyre, Result, WrapErr};
use expense_core::api::Currency;
use expense_core::{ClientConfig, ExpenseClient, API_URL_ENV, DEFAULT_API_URL};

mod commands;

/// Sign in, upload bank statements and inspect the spending dashboard.
#[derive(Parser, Debug)]
#[command(name = "expense", version)]
struct Cli {
    /// API root, e.g. `https://expenses.example.com/api`
    #[arg(long, global = true, env = API_URL_ENV, default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Where the access and refresh tokens are kept between runs
    #[arg(long, global = true, env = "EXPENSE_EXPLORER_SESSION_FILE")]
    session_file: Option<PathBuf>,

    /// Log more (`-v` debug, `-vv` trace); `RUST_LOG` takes precedence
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and store the session
    Login {
        /// Account email
        email: String,
        /// Account password
        #[arg(long, env = "EXPENSE_EXPLORER_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account, then sign in
    Register {
        /// Account email
        email: String,
        /// Display handle
        #[arg(long)]
        username: String,
        /// Chosen password
        #[arg(long, env = "EXPENSE_EXPLORER_PASSWORD", hide_env_values = true)]
        password: String,
        /// Password confirmation (defaults to `--password`)
        #[arg(long)]
        confirm_password: Option<String>,
        /// Given name
        #[arg(long)]
        first_name: Option<String>,
        /// Family name
        #[arg(long)]
        last_name: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Show whether a usable session is stored
    Status,

    /// Show the signed-in user
    Profile,

    /// Request a password reset email
    ResetPassword {
        /// Account email
        email: String,
    },

    /// Set a new password with the token from the reset email
    ConfirmReset {
        /// Reset token
        token: String,
        /// New password
        #[arg(long, env = "EXPENSE_EXPLORER_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Manage uploaded statements
    #[command(subcommand)]
    Statements(StatementsCommand),

    /// Upload a CSV or PDF bank statement
    Upload {
        /// Statement file (`.csv` or `.pdf`)
        path: PathBuf,
        /// Currency the statement is recorded in
        #[arg(long, default_value_t = Currency::Usd)]
        currency: Currency,
        /// Load the dashboard of the uploaded statement afterwards
        #[arg(long)]
        show: bool,
    },

    /// List transactions
    Transactions {
        /// Only this statement
        #[arg(long)]
        statement: Option<i64>,
        /// Only this category
        #[arg(long)]
        category: Option<i64>,
        /// Earliest date, `YYYY-MM-DD`
        #[arg(long)]
        from: Option<String>,
        /// Latest date, `YYYY-MM-DD`
        #[arg(long)]
        to: Option<String>,
    },

    /// List spending categories
    Categories,

    /// Load the dashboard (newest statement unless `--statement` is given)
    Dashboard {
        /// Statement to analyse
        #[arg(long)]
        statement: Option<i64>,
        /// Also list the transactions of this category
        #[arg(long)]
        category: Option<i64>,
    },
}

#[derive(Subcommand, Debug)]
enum StatementsCommand {
    /// List statements, newest first
    List,
    /// Show one statement
    Show {
        /// Statement id
        id: i64,
    },
    /// Delete a statement and its transactions
    Delete {
        /// Statement id
        id: i64,
    },
}

fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "expense=debug,expense_core=debug,warn",
        _ => "trace",
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn default_session_file() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("expense-explorer").join("session.json"))
        .ok_or_else(|| eyre!("no config directory on this system, pass --session-file"))
}

fn build_client(cli: &Cli) -> Result<ExpenseClient> {
    let config = ClientConfig::new(&cli.api_url)?;
    let session_file = match &cli.session_file {
        Some(path) => path.clone(),
        None => default_session_file()?,
    };
    tracing::debug!(api = %config.base_url(), session = %session_file.display(), "starting client");

    let client = ExpenseClient::with_session_file(&config, &session_file)
        .wrap_err_with(|| format!("cannot open session file {}", session_file.display()))?;
    client.session().start();
    Ok(client)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let client = build_client(&cli)?;
    let output = commands::run(&client, cli.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_upload() {
        let cli = Cli::try_parse_from([
            "expense",
            "--api-url",
            "https://expenses.example.com/api",
            "upload",
            "january.csv",
            "--currency",
            "eur",
        ])
        .unwrap();

        assert_eq!(cli.api_url, "https://expenses.example.com/api");
        match cli.command {
            Command::Upload {
                path,
                currency,
                show,
            } => {
                assert_eq!(path, PathBuf::from("january.csv"));
                assert_eq!(currency, Currency::Eur);
                assert!(!show);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_statement_subcommands() {
        let cli = Cli::try_parse_from(["expense", "statements", "delete", "4", "-v"]).unwrap();
        assert_eq!(cli.verbose, 1);
        assert!(matches!(
            cli.command,
            Command::Statements(StatementsCommand::Delete { id: 4 })
        ));
    }

    #[test]
    fn test_rejects_unknown_currency() {
        assert!(Cli::try_parse_from(["expense", "upload", "a.csv", "--currency", "XYZ"]).is_err());
    }
}
