//! gmassist CLI
//!
//! Conversational Gmail assistant: account management plus a chat loop that
//! routes free-text commands to the Gmail tools.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use gmassist_core::config::{Config, CONFIG_PATH_ENV};
use gmassist_core::router::COMMAND_EXAMPLES;
use gmassist_core::Assistant;

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_REDIRECT_URI: &str = "http://localhost";

#[derive(Parser)]
#[command(name = "gmassist")]
#[command(about = "gmassist - conversational Gmail assistant")]
#[command(long_about = "gmassist drafts, sends, finds, analyzes and labels Gmail messages from \
plain-text commands. Several Gmail accounts can be configured; commands act on the active one.

QUICK START:
  1. Add an account:   gmassist account add --name work --client-id ... --client-secret ...
  2. Select it:        gmassist account use work
  3. Authorize:        gmassist account login
  4. Chat:             gmassist chat

COMMANDS INSIDE CHAT:
  Run 'gmassist commands' for the list of command templates.")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config.toml
    #[arg(long, global = true, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,

    /// Also write logs to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Add, select, authorize and remove Gmail accounts
    Account {
        #[command(subcommand)]
        command: AccountCommands,
    },
    /// Interactive session: one command per line, 'exit' to quit
    Chat,
    /// Run a single command, e.g. gmassist run "list labels"
    Run {
        /// Command text
        #[arg(required = true, num_args = 1..)]
        command: Vec<String>,
    },
    /// Show the command templates understood by chat and run
    Commands,
}

#[derive(Subcommand)]
enum AccountCommands {
    /// Register an account's OAuth client. Missing values are prompted for.
    Add {
        /// Account name (unique)
        #[arg(long)]
        name: Option<String>,
        /// OAuth client ID
        #[arg(long)]
        client_id: Option<String>,
        /// OAuth client secret
        #[arg(long)]
        client_secret: Option<String>,
        #[arg(long, default_value = DEFAULT_AUTH_URI)]
        auth_uri: String,
        #[arg(long, default_value = DEFAULT_TOKEN_URI)]
        token_uri: String,
        #[arg(long, default_value = DEFAULT_REDIRECT_URI)]
        redirect_uri: String,
    },
    /// List accounts; the active one is marked
    List,
    /// Make an account active
    Use {
        name: String,
    },
    /// Remove an account and its stored tokens
    Remove {
        name: String,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Authorize an account in the browser (defaults to the active account)
    Login {
        name: Option<String>,
        /// Print the consent URL instead of opening a browser
        #[arg(long)]
        no_browser: bool,
    },
    /// Store the generative API key used for summaries on the active account
    SetKey {
        key: Option<String>,
    },
    /// Remove the generative API key from the active account
    ClearKey,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load().unwrap_or_default(),
    };
    init_logging(&config, cli.verbose)?;

    match cli.command {
        Commands::Account { command } => handle_account_command(command, config).await,
        Commands::Chat => run_chat(config).await,
        Commands::Run { command } => run_once(config, &command.join(" ")).await,
        Commands::Commands => {
            print_commands();
            Ok(())
        }
    }
}

/// Daily rolling log file; stdout carries the conversation
fn init_logging(config: &Config, verbose: bool) -> Result<()> {
    let log_dir = config.logs_dir();
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory {:?}", log_dir))?;

    let file_name = config
        .general
        .log_file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "gmassist.log".to_string());
    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, file_name);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_appender)
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S%.3f".to_string()))
        .with_ansi(false)
        .with_target(false);

    let stderr_layer = verbose.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();
    Ok(())
}

// ============================================================================
// Account Commands
// ============================================================================

async fn handle_account_command(command: AccountCommands, mut config: Config) -> Result<()> {
    if let AccountCommands::Login {
        no_browser: true, ..
    } = command
    {
        config.oauth.open_browser = false;
    }
    let mut assistant = Assistant::from_config(config)?;

    match command {
        AccountCommands::Add {
            name,
            client_id,
            client_secret,
            auth_uri,
            token_uri,
            redirect_uri,
        } => {
            let name = prompt_if_missing(name, "Account name")?;
            let client_id = prompt_if_missing(client_id, "Client ID")?;
            let client_secret = prompt_if_missing(client_secret, "Client secret")?;

            let result = assistant.registry_mut().add(
                &name,
                &client_id,
                &client_secret,
                &auth_uri,
                &token_uri,
                &redirect_uri,
            );
            print_status(result);
        }
        AccountCommands::List => {
            let names = assistant.registry().display_names();
            if names.is_empty() {
                println!("No accounts configured. Add one with 'gmassist account add'.");
            }
            for name in names {
                let status = if assistant.is_authorized(&name).await {
                    "authorized"
                } else {
                    "not authorized"
                };
                println!("{:30} {}", name, status);
            }
        }
        AccountCommands::Use { name } => {
            let result = assistant.registry_mut().set_active(&name).map(|names| {
                let active = names
                    .iter()
                    .find_map(|n| n.strip_suffix(gmassist_core::ACTIVE_SUFFIX))
                    .unwrap_or(name.as_str())
                    .to_string();
                format!("Switched to account: {}", active)
            });
            print_status(result);
        }
        AccountCommands::Remove { name, yes } => {
            let confirmed = yes
                || dialoguer::Confirm::new()
                    .with_prompt(format!("Remove account '{}' and its stored tokens?", name))
                    .default(false)
                    .interact()?;
            if !confirmed {
                println!("Cancelled.");
                return Ok(());
            }
            print_status(assistant.remove_account(&name).await);
        }
        AccountCommands::Login { name, .. } => {
            let name = match name {
                Some(name) => name,
                None => match assistant.registry().get_active() {
                    Some(account) => account.name.clone(),
                    None => {
                        println!("{}", gmassist_core::assistant::NO_ACCOUNT);
                        return Ok(());
                    }
                },
            };
            println!("Authorizing '{}', waiting for the browser callback...", name);
            print_status(assistant.login(&name).await);
        }
        AccountCommands::SetKey { key } => {
            let key = prompt_if_missing(key, "Generative API key")?;
            print_status(assistant.registry_mut().set_summary_api_key(&key));
        }
        AccountCommands::ClearKey => {
            print_status(assistant.registry_mut().clear_summary_api_key());
        }
    }

    Ok(())
}

fn prompt_if_missing(value: Option<String>, prompt: &str) -> Result<String> {
    match value {
        Some(value) => Ok(value),
        None => Ok(dialoguer::Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()?),
    }
}

/// Print a registry outcome as `Success: ...` or `Error: ...`
fn print_status(result: gmassist_core::Result<String>) {
    match result {
        Ok(message) => println!("Success: {}", message),
        Err(e) => {
            error!("{}", e);
            let (status, _) = e.status_pair();
            println!("{}: {}", status, e.user_message());
        }
    }
}

// ============================================================================
// Conversation
// ============================================================================

async fn run_chat(config: Config) -> Result<()> {
    let mut assistant = Assistant::from_config(config)?;
    info!("Chat session started");

    println!("gmassist - type a command, 'commands' for templates, 'exit' to quit.");
    match assistant.registry().get_active() {
        Some(account) => println!("Active account: {}", account.name),
        None => println!("{}", gmassist_core::assistant::NO_ACCOUNT),
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        match line {
            "" => continue,
            "exit" | "quit" => break,
            "commands" | "help" => print_commands(),
            _ => println!("{}\n", assistant.handle(line).await),
        }
    }

    info!("Chat session ended");
    Ok(())
}

async fn run_once(config: Config, command: &str) -> Result<()> {
    let mut assistant = Assistant::from_config(config)?;
    println!("{}", assistant.handle(command).await);
    Ok(())
}

fn print_commands() {
    let width = COMMAND_EXAMPLES
        .iter()
        .map(|(title, _)| title.len())
        .max()
        .unwrap_or(0);
    for (title, template) in COMMAND_EXAMPLES {
        println!("{:width$}  {}", title, template, width = width);
    }
}
