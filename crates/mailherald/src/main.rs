//! `mailherald` - Gmail campaign dispatch and reply-tracking daemon
//!
//! Runs the engine's scheduled cycle on a fixed interval: dispatch
//! scheduled campaigns, sync replies and bounces, send follow-ups.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod config;

use anyhow::{Context, Result};
use tokio::time::MissedTickBehavior;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mailherald_core::{CredentialManager, Engine, FsBlobStore, OAuthRefresher, Store, Transport};
use mailherald_gmail::GmailClient;
use mailherald_oauth::{OAuthClient, Provider};

use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailherald=info,mailherald_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    info!(
        db = %config.database_path.display(),
        interval_secs = config.cycle_interval.as_secs(),
        "Starting mailherald"
    );

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    let store = Store::connect(&config.database_path)
        .await
        .context("opening database")?;

    let provider = Provider::google().context("building Google provider")?;
    let oauth = OAuthClient::new(config.client_id.clone(), provider)
        .with_client_secret(config.client_secret.clone());
    let credentials = CredentialManager::new(store.credentials.clone(), OAuthRefresher::new(oauth));
    let transport = Transport::new(GmailClient::new(), FsBlobStore::new(&config.blob_root));

    let engine = Engine::new(store, credentials, transport).with_send_delay(config.send_delay);

    let mut ticker = tokio::time::interval(config.cycle_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match engine.run_scheduled_cycle().await {
            Ok(cycle) => {
                if !cycle.errors.is_empty() {
                    for message in &cycle.errors {
                        error!(%message, "cycle error");
                    }
                }
            }
            Err(e) => error!(error = %e, "cycle failed"),
        }
    }
}
