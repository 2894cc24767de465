//! Nevara - Telegram bot for text-to-image generation
//!
//! Users pick a backend, send a prompt, and receive the generated image.
//! Each user's conversation is a small state machine driven by chat events.

mod cache;
mod config;
mod delivery;
mod generation;
mod menu;
mod orchestrator;
mod retry;
mod session;
mod transport;

use config::BotConfig;
use generation::GeneratorRegistry;
use orchestrator::{Dispatcher, Orchestrator};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transport::telegram::{TelegramClient, TelegramPoller};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nevara_bot=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = BotConfig::from_env()?;

    // Initialize generation backends
    let generators = Arc::new(GeneratorRegistry::new(&config.generation));
    if generators.has_backends() {
        tracing::info!(backends = ?generators.available(), "Generation backends initialized");
    } else {
        tracing::warn!(
            "No generation backends configured. \
             Set KANDINSKY_API_KEY and KANDINSKY_SECRET_KEY, or HUGGINGFACE_API_TOKEN."
        );
    }

    let telegram = Arc::new(TelegramClient::new(
        &config.telegram_api_url,
        &config.bot_token,
    )?);
    let orchestrator = Arc::new(Orchestrator::new(generators, Arc::clone(&telegram)));
    let dispatcher = Dispatcher::new(orchestrator);

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                return;
            }
            tracing::info!("Shutdown requested");
            cancel.cancel();
        }
    });

    let mut poller = TelegramPoller::new(telegram);
    if let Err(e) = poller.skip_pending().await {
        tracing::warn!(error = %e, "Could not skip pending updates");
    }
    poller.run(&dispatcher, cancel).await;

    dispatcher.shutdown().await;
    Ok(())
}
