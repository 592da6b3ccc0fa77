//! chatbridge CLI: run the webhook server or push one message through the pipeline.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use chatbridge::app::build_composer;
use chatbridge::composer::InboundMessage;
use chatbridge::config::BridgeConfig;
use chatbridge::logging;
use chatbridge::webhook::{self, AppState};

/// WhatsApp front end for a knowledge-base backend.
#[derive(Debug, Parser)]
#[command(name = "chatbridge", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the Twilio webhook server.
    Serve {
        /// Bind address (overrides config).
        #[arg(long)]
        host: Option<String>,
        /// Listen port (overrides config and `PORT`).
        #[arg(long)]
        port: Option<u16>,
    },
    /// Send one message through the pipeline and print the reply.
    Ask {
        /// Message text.
        #[arg(long, default_value = "")]
        text: String,
        /// Attachment URL.
        #[arg(long, requires = "media_type")]
        media_url: Option<String>,
        /// Attachment MIME type, e.g. `audio/ogg`.
        #[arg(long, requires = "media_url")]
        media_type: Option<String>,
        /// Sender identifier.
        #[arg(long, default_value = "cli")]
        sender: String,
    },
    /// Load and validate configuration, then print a redacted summary.
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve { host, port } => serve(host, port).await,
        Command::Ask {
            text,
            media_url,
            media_type,
            sender,
        } => ask(text, media_url, media_type, sender).await,
        Command::CheckConfig => check_config(),
    }
}

async fn serve(host: Option<String>, port: Option<u16>) -> Result<()> {
    let (mut config, report) = BridgeConfig::load().context("failed to load configuration")?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let _guard = match &config.logging.dir {
        Some(dir) => Some(logging::init_production(dir, &config.logging.level)?),
        None => {
            logging::init_cli(&config.logging.level);
            None
        }
    };
    report.log();

    config.validate()?;
    info!(version = env!("CARGO_PKG_VERSION"), "chatbridge starting");

    let composer = build_composer(&config)?;
    let state = AppState {
        composer: Arc::new(composer),
    };

    webhook::serve(&config.server, state, shutdown_signal()).await?;
    info!("chatbridge stopped");
    Ok(())
}

async fn ask(
    text: String,
    media_url: Option<String>,
    media_type: Option<String>,
    sender: String,
) -> Result<()> {
    let (config, report) = BridgeConfig::load().context("failed to load configuration")?;
    logging::init_cli(&config.logging.level);
    report.log();
    config.validate()?;

    let composer = build_composer(&config)?;
    let mut message = InboundMessage::text(sender, text);
    if let (Some(url), Some(mime)) = (media_url, media_type) {
        message = message.with_media(url, mime);
    }

    let reply = composer.compose(&message).await;
    println!("{}", reply.text);
    if let Some(media_url) = reply.media_url {
        println!("media: {media_url}");
    }
    Ok(())
}

fn check_config() -> Result<()> {
    let (config, report) = BridgeConfig::load().context("failed to load configuration")?;
    logging::init_cli(&config.logging.level);
    report.log();
    config.validate()?;
    println!("server: {}:{}", config.server.host, config.server.port);
    println!(
        "openai: {} (transcription: {}, vision: {})",
        config.openai.base_url, config.openai.transcription_model, config.openai.vision_model
    );
    println!("twilio: account {}", config.twilio.account_sid);
    println!(
        "rag: {} as {} (session {})",
        config.rag.base_url, config.rag.email, config.rag.session_id
    );
    println!("configuration OK");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c, shutting down");
    }
    info!("shutdown signal received");
}
