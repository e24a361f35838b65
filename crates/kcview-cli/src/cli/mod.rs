//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use kcview_core::config;
use kcview_core::logging::{self, LogTarget};

mod commands;

#[derive(Parser)]
#[command(name = "kcview")]
#[command(version)]
#[command(about = "Inspect a Keycloak session and call protected endpoints")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Open the interactive view (default)
    Tui,

    /// Mount the view headlessly, call one endpoint and print the message
    Call {
        /// Endpoint path appended to the API base URL (e.g. /public)
        #[arg(value_name = "ENDPOINT")]
        endpoint: String,

        /// Use this access token instead of the Keycloak session
        #[arg(long, env = "KCVIEW_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },

    /// Log in through the browser and print the access token
    Login,

    /// Run the demo resource server
    Serve {
        /// Address to listen on (overrides `server.bind`)
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

impl Commands {
    /// The interactive view owns the terminal, so it logs to a file.
    /// Config commands print plain output and don't log at all.
    fn log_target(&self) -> Option<LogTarget> {
        match self {
            Commands::Tui => Some(LogTarget::File),
            Commands::Config { .. } => None,
            Commands::Call { .. } | Commands::Login | Commands::Serve { .. } => {
                Some(LogTarget::Stderr)
            }
        }
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Tui);

    let _log_guard = command.log_target().map(logging::init).transpose()?;

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
    rt.block_on(dispatch(command))
}

async fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Tui => commands::tui::run(&load_config()?),
        Commands::Call { endpoint, token } => {
            commands::call::run(&load_config()?, &endpoint, token).await
        }
        Commands::Login => commands::login::run(&load_config()?).await,
        Commands::Serve { bind } => commands::serve::run(&load_config()?, bind.as_deref()).await,
        // Config commands must work even when the file fails to parse.
        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
        },
    }
}

fn load_config() -> Result<config::Config> {
    config::Config::load().context("load config")
}
