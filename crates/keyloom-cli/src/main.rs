//! Keyloom CLI: read, write, and watch the three storage backends.
//!
//! ```text
//! keyloom set fast demo_mmkv_value Hello
//! keyloom get fast demo_mmkv_value
//! keyloom set durable count 3 --as number
//! keyloom keys durable
//! keyloom demo
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use keyloom_cache::CacheSynchronizer;
use keyloom_config::{Config, ResolvedConfig};
use keyloom_core::{BackendId, StorageError};

mod commands;
mod config_bridge;
mod formatter;
mod theme;

use commands::storage::ValueKind;
use formatter::OutputFormat;
use theme::Theme;

/// Keyloom: one async key-value contract over fast, durable, and secure storage
#[derive(Parser)]
#[command(name = "keyloom")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file layered over the user config
    #[arg(short, long, global = true, env = "KEYLOOM_CONFIG")]
    config: Option<PathBuf>,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Pretty)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read a key
    Get {
        /// Backend: fast, durable, or secure
        backend: BackendId,
        /// Logical key
        key: String,
        /// Decode the stored value as
        #[arg(long = "as", value_enum, default_value_t = ValueKind::Text)]
        kind: ValueKind,
    },
    /// Write a key
    Set {
        /// Backend: fast, durable, or secure
        backend: BackendId,
        /// Logical key
        key: String,
        /// Value text
        value: String,
        /// Interpret the value text as
        #[arg(long = "as", value_enum, default_value_t = ValueKind::Text)]
        kind: ValueKind,
    },
    /// Remove a key (absent keys are fine)
    Rm {
        /// Backend: fast, durable, or secure
        backend: BackendId,
        /// Logical key
        key: String,
    },
    /// List a backend's keys
    Keys {
        /// Backend: fast or durable
        backend: BackendId,
    },
    /// Remove everything a backend owns
    Reset {
        /// Backend: fast, durable, or secure
        backend: BackendId,
    },
    /// Run the reference scenarios against in-memory backends
    Demo,
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the resolved configuration and its sources
    Show,
    /// Show the config and data paths
    Paths,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let format = cli.format;

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e, format);
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli) -> Result<()> {
    let resolved = Config::load(cli.config.as_deref())?;
    init_logging(&resolved, cli.verbose);
    let config = &resolved.config;

    match cli.command {
        Commands::Demo => {
            let sync = config_bridge::synchronizer(config, config_bridge::memory_facade(config)?);
            commands::demo::run_demo(&sync, cli.format).await
        },
        Commands::Config { command } => match command.unwrap_or(ConfigCommands::Show) {
            ConfigCommands::Show => commands::config::show_config(&resolved, cli.format),
            ConfigCommands::Paths => commands::config::show_paths(&resolved, cli.format),
        },
        Commands::Get { backend, key, kind } => {
            let sync = open(config).await?;
            commands::storage::get(&sync, backend, &key, kind, cli.format).await
        },
        Commands::Set {
            backend,
            key,
            value,
            kind,
        } => {
            let sync = open(config).await?;
            commands::storage::set(&sync, backend, &key, &value, kind, cli.format).await
        },
        Commands::Rm { backend, key } => {
            let sync = open(config).await?;
            commands::storage::remove(&sync, backend, &key, cli.format).await
        },
        Commands::Keys { backend } => {
            let sync = open(config).await?;
            commands::storage::keys(&sync, backend, cli.format).await
        },
        Commands::Reset { backend } => {
            let sync = open(config).await?;
            commands::storage::reset(&sync, backend, cli.format).await
        },
    }
}

/// The configured backends behind a synchronizer.
async fn open(config: &Config) -> Result<CacheSynchronizer> {
    let facade = config_bridge::build_facade(config).await?;
    Ok(config_bridge::synchronizer(config, facade))
}

fn init_logging(resolved: &ResolvedConfig, verbose: u8) {
    let log_config = config_bridge::to_log_config(&resolved.config, verbose)
        .unwrap_or_else(|_| keyloom_telemetry::LogConfig::from_verbosity(verbose));
    if let Err(e) = keyloom_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }
}

/// Storage errors print their kind so scripts can branch on it.
fn error_kind(error: &anyhow::Error) -> &'static str {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<StorageError>())
        .map_or("Error", |e| e.kind().as_str())
}

fn report_error(error: &anyhow::Error, format: OutputFormat) {
    let kind = error_kind(error);
    if format.is_json() {
        let body = serde_json::json!({ "error": { "kind": kind, "message": format!("{error:#}") } });
        eprintln!("{body}");
    } else {
        eprintln!("{}", Theme::error(&format!("{kind}: {error:#}")));
    }
}
