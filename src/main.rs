//! # Main Entry Point
//!
//! Wires the relay together:
//! - Domain: Configuration, Types and Traits
//! - Infrastructure: Twitch chat, backend HTTP client
//! - Application: Router, Admission, Forwarder, Membership sync
//! - Interface: Command Handlers
//!

mod application;
mod domain;
mod infrastructure;
mod interface;
mod strings;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::application::forwarder::GenerationForwarder;
use crate::application::membership::{ChannelSynchronizer, SyncTrigger};
use crate::application::router::CommandRouter;
use crate::application::state::{RelayState, run_cooldown_sweep};
use crate::domain::config::{AppConfig, Cli};
use crate::domain::traits::{ChatTransport, RelayApi};
use crate::infrastructure::api::HttpRelayApi;
use crate::infrastructure::twitch::TwitchClient;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load Configuration (fatal before any network activity)
    let cli = Cli::parse();
    let config = AppConfig::load(cli).context("Invalid configuration")?;

    // 2. Logging Setup
    let _guard = application::logging::init(Path::new(&config.log_dir))?;
    tracing::info!(username = %config.twitch.username, "Starting cuhz-relay...");

    // 3. Infrastructure
    let api: Arc<dyn RelayApi> =
        Arc::new(HttpRelayApi::new(&config.api).context("Failed to build HTTP client")?);
    let (twitch, mut inbound) = TwitchClient::spawn(config.twitch.clone());
    let chat: Arc<dyn ChatTransport> = Arc::new(twitch.clone());

    // 4. Application Components
    let tuning = &config.tuning;
    let dashboard_url = config.api.dashboard_url.clone();
    let state = RelayState::shared(tuning);
    let trigger = SyncTrigger::new();

    let forwarder = Arc::new(GenerationForwarder::new(
        api.clone(),
        chat.clone(),
        state.clone(),
        config.api.webhook_token.clone(),
        dashboard_url.clone(),
    ));
    let synchronizer = Arc::new(ChannelSynchronizer::new(
        chat.clone(),
        api.clone(),
        trigger.clone(),
        dashboard_url.clone(),
        tuning,
    ));
    let router = Arc::new(CommandRouter::new(
        state.clone(),
        chat.clone(),
        api.clone(),
        forwarder,
        trigger,
        dashboard_url,
    ));

    // 5. Wait for login, then start the background loops
    tokio::select! {
        res = twitch.wait_connected() => {
            res.context("Chat connection task stopped before login")?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
            twitch.quit().await;
            return Ok(());
        }
    }

    tokio::spawn(
        synchronizer
            .clone()
            .run_join_queue(Duration::from_millis(tuning.join_delay_ms)),
    );
    tokio::spawn(
        synchronizer
            .clone()
            .run_polling(Duration::from_millis(tuning.poll_interval_ms)),
    );
    tokio::spawn(run_cooldown_sweep(
        state.clone(),
        Duration::from_millis(tuning.sweep_interval_ms),
        tuning.default_cooldown_ms,
    ));

    // 6. Message Loop
    loop {
        tokio::select! {
            message = inbound.recv() => {
                let Some(message) = message else {
                    tracing::error!("chat connection closed");
                    break;
                };
                let router = router.clone();
                tokio::spawn(async move {
                    router.route(&message).await;
                });
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                twitch.quit().await;
                break;
            }
        }
    }

    Ok(())
}
