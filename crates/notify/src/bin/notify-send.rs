//! Send a notification through the configured channels.
//!
//! Run `notify-send --help` for usage information.

// CLI binaries legitimately need println! for user output
#![allow(clippy::disallowed_macros)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use notify_dispatch::{
    ManagerConfig, Notification, NotificationManager, NotificationResponse, SlackChannel,
};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "notify-send")]
#[command(about = "Send a notification through the configured channels")]
#[command(version)]
struct Cli {
    /// Message text
    message: String,

    /// TOML file with channels and groups (defaults to environment variables)
    #[arg(short, long, env = "NOTIFY_CONFIG")]
    config: Option<PathBuf>,

    /// Preferred channel; falls back to the best ready channel
    #[arg(long)]
    channel: Option<String>,

    /// Notification title
    #[arg(short, long)]
    title: Option<String>,

    /// Recipient address, number or target
    #[arg(short, long)]
    recipient: Option<String>,

    /// Output format: json, text
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn build_manager(cli: &Cli) -> Result<NotificationManager> {
    match &cli.config {
        Some(path) => {
            let config = ManagerConfig::load(path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            let mut manager = NotificationManager::from_config(&config);
            manager.register_factory("slack", SlackChannel::factory());
            manager
                .load_config(&config)
                .context("Failed to build channels from config")?;
            Ok(manager)
        }
        None => {
            let config = ManagerConfig::from_env();
            let mut manager = NotificationManager::from_config(&config);
            manager.register_channel("slack", Arc::new(SlackChannel::from_env()));
            Ok(manager)
        }
    }
}

fn print_response(format: OutputFormat, response: &NotificationResponse) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(response)?),
        OutputFormat::Text => {
            if response.success {
                println!(
                    "{}: {}",
                    response.status,
                    response.message_id.as_deref().unwrap_or("-")
                );
            } else {
                println!(
                    "{}: {}",
                    response.status,
                    response.error.as_deref().unwrap_or("unknown error")
                );
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let manager = build_manager(&cli)?;
    info!(ready = ?manager.ready_channels(), "Channels resolved");

    let mut notification = Notification::text(cli.message.as_str());
    if let Some(title) = &cli.title {
        notification = notification.with_title(title.as_str());
    }
    if let Some(recipient) = &cli.recipient {
        notification = notification.with_recipient(recipient.as_str());
    }

    let response = manager
        .send(cli.channel.as_deref(), &notification)
        .await
        .context("Notification was not sent")?;
    print_response(cli.format, &response)?;

    Ok(if response.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
