use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod cmd;

#[derive(Parser)]
#[command(name = "authflow")]
#[command(version, about = "Walk a user through authorizing external services one at a time")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Log output format on stderr
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Authorize services one after another
    Connect {
        /// Services to connect, in order (comma-separated; defaults to all configured)
        #[arg(short, long, value_delimiter = ',')]
        services: Vec<String>,

        /// User the authorization is performed for. Overrides authflow.toml and AUTHFLOW_USER_ID.
        #[arg(long)]
        user_id: Option<String>,

        /// Skip failed services instead of prompting
        #[arg(long)]
        yes: bool,
    },
    /// List configured services and their login targets
    Services,
    /// Show the last recorded outcome per service
    Status,
    /// Report a completion to a running flow
    Report {
        /// Service the report is for
        service: String,

        /// Report a provider error with this text instead of a success
        #[arg(long)]
        error: Option<String>,

        /// Callback URL printed by `authflow connect`
        #[arg(long)]
        callback_url: String,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default authflow.toml file
    Init,
}

/// Install the global subscriber. The returned guard flushes the log file on drop.
fn init_tracing(cli: &Cli, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let default_level = if cli.verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let stderr_layer = match cli.log_format {
        LogFormat::Text => fmt::layer().with_writer(std::io::stderr).boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(std::io::stderr).boxed(),
    };

    let appender = log_dir.and_then(|dir| {
        RollingFileAppender::builder()
            .rotation(Rotation::NEVER)
            .filename_prefix("authflow.log")
            .build(dir)
            .map_err(|e| eprintln!("Warning: file logging disabled: {}", e))
            .ok()
    });
    let (file_layer, guard) = match appender {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    // Only a flow run writes a log file; inspection commands leave the project untouched.
    let log_dir = matches!(cli.command, Commands::Connect { .. })
        .then(|| project_dir.join(authflow::config::CONFIG_DIR).join("logs"));
    let _log_guard = init_tracing(&cli, log_dir.as_deref());

    match &cli.command {
        Commands::Connect {
            services,
            user_id,
            yes,
        } => {
            cmd::cmd_connect(&cli, project_dir, services, user_id.clone(), *yes).await?;
        }
        Commands::Services => cmd::cmd_services(&project_dir)?,
        Commands::Status => cmd::cmd_status(&project_dir)?,
        Commands::Report {
            service,
            error,
            callback_url,
        } => {
            cmd::cmd_report(service, error.as_deref(), callback_url).await?;
        }
        Commands::Config { command } => cmd::cmd_config(&project_dir, command.clone())?,
    }

    Ok(())
}
