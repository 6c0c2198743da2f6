// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaigner - quota-bounded batch dispatch for bulk email campaigns.
//!
//! This is the binary entry point: configuration loading, logging setup, and
//! the operator subcommands.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod app;
mod campaign;
mod doctor;
mod serve;
mod shutdown;
mod suppress;

use std::path::PathBuf;

use campaigner_config::model::CampaignerConfig;
use campaigner_core::{CampaignerError, DeliveryEventKind};
use clap::{Parser, Subcommand};

/// Campaigner - quota-bounded batch dispatch for bulk email campaigns.
#[derive(Parser, Debug)]
#[command(name = "campaigner", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the dispatcher on an interval until SIGINT/SIGTERM.
    Serve,
    /// Run a single dispatcher tick and print its report.
    Tick {
        #[arg(long)]
        json: bool,
    },
    /// Schedule a campaign for now and dispatch it immediately.
    SendNow {
        id: String,
        #[arg(long)]
        json: bool,
    },
    /// Manage campaigns.
    Campaign {
        #[command(subcommand)]
        command: campaign::CampaignCommand,
    },
    /// Manage the suppression list.
    Suppress {
        #[command(subcommand)]
        command: suppress::SuppressCommand,
    },
    /// Record a provider delivery event (delivered, bounced, complained).
    Event {
        provider_message_id: String,
        kind: DeliveryEventKind,
    },
    /// Show today's quota usage.
    Quota {
        #[arg(long)]
        json: bool,
    },
    /// Run diagnostic checks.
    Doctor {
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
    /// Inspect the effective configuration.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print the merged configuration as TOML (secrets redacted).
    Show,
}

fn load_config(path: Option<&std::path::Path>) -> CampaignerConfig {
    let loaded = match path {
        Some(path) => campaigner_config::load_and_validate_path(path),
        None => campaigner_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            campaigner_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

/// Initialize the tracing subscriber; `RUST_LOG` takes precedence over config.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("campaigner={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());
    init_tracing(&config.service.log_level);

    if let Err(e) = run(cli.command, config).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Option<Commands>, config: CampaignerConfig) -> Result<(), CampaignerError> {
    match command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Tick { json }) => campaign::run_tick(&config, json).await,
        Some(Commands::SendNow { id, json }) => campaign::run_send_now(&config, &id, json).await,
        Some(Commands::Campaign { command }) => campaign::run_campaign(&config, command).await,
        Some(Commands::Suppress { command }) => suppress::run_suppress(&config, command).await,
        Some(Commands::Event {
            provider_message_id,
            kind,
        }) => suppress::run_event(&config, &provider_message_id, kind).await,
        Some(Commands::Quota { json }) => campaign::run_quota(&config, json).await,
        Some(Commands::Doctor { plain }) => doctor::run_doctor(&config, plain).await,
        Some(Commands::Config {
            command: ConfigCommand::Show,
        }) => {
            print!("{}", render_config(&config)?);
            Ok(())
        }
        None => {
            println!("campaigner: use --help for available commands");
            Ok(())
        }
    }
}

/// Render the configuration as TOML with the provider key masked.
fn render_config(config: &CampaignerConfig) -> Result<String, CampaignerError> {
    let mut shown = config.clone();
    if shown.provider.api_key.is_some() {
        shown.provider.api_key = Some("********".into());
    }
    toml::to_string_pretty(&shown)
        .map_err(|e| CampaignerError::Internal(format!("failed to render config: {e}")))
}
