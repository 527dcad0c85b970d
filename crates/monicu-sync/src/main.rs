//! Sync engine entry point
//!
//! Run with:
//! ```bash
//! cargo run -p monicu-sync
//! ```
//!
//! Configuration is loaded from `config.{yaml,toml,json}` and `MONICU__*`
//! environment variables.

use std::sync::Arc;

use anyhow::Context;
use monicu_common::{try_init_tracing, try_init_tracing_with_config, AppConfig, TracingConfig};
use monicu_db::{create_pool, ensure_schema, DatabaseConfig, PgStore};
use monicu_discord::{GatewayClient, GatewayConfig, HttpImageProbe, Intents, RestClient};
use monicu_sync::{EventDispatcher, ScopeFilter, Shutdown, SyncContext};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            if let Err(e) = try_init_tracing() {
                eprintln!("Warning: Failed to initialize tracing: {e}");
            }
            error!(error = %e, "Failed to load configuration");
            std::process::exit(1);
        }
    };

    if let Err(e) = try_init_tracing_with_config(TracingConfig::from(&config.logging)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    if let Err(e) = run(config).await {
        error!(error = %e, "Sync engine failed");
        std::process::exit(1);
    }
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    info!("Starting sync engine...");

    let token = config.discord.require_token()?.to_string();
    let scope = ScopeFilter::from_config(&config.discord, &config.posts)?;
    info!(
        communities = config.discord.communities.len(),
        channels = scope.channels().len(),
        "Configuration loaded"
    );

    let pool = create_pool(&DatabaseConfig::from(&config.storage))
        .await
        .context("Failed to connect to the database")?;
    ensure_schema(&pool)
        .await
        .context("Failed to prepare the schema")?;

    let api = RestClient::new(&config.discord.api_url, &token)?;
    let probe = HttpImageProbe::new(config.sync.image_probe_timeout())?;
    let shutdown = Shutdown::new();

    let ctx = SyncContext::builder()
        .store(Arc::new(PgStore::new(pool)))
        .api(Arc::new(api))
        .probe(Arc::new(probe))
        .scope(scope)
        .pending_window(config.sync.pending_edit_window())
        .shutdown(shutdown.clone())
        .build()?;

    let sweeper = ctx.pending().spawn_sweeper(shutdown.clone());

    let (events_tx, events_rx) = mpsc::channel(config.sync.event_buffer);
    let gateway = GatewayClient::new(
        GatewayConfig {
            url: config.discord.gateway_url.clone(),
            token,
            intents: Intents::mirror(),
        },
        events_tx,
    );
    let mut gateway_task = tokio::spawn(gateway.run(shutdown.subscribe()));
    let dispatcher_task = tokio::spawn(EventDispatcher::new(ctx).run(events_rx));

    let gateway_result = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!(error = %e, "Failed to listen for ctrl-c");
            }
            info!("Shutdown signal received");
            None
        }
        joined = &mut gateway_task => Some(joined),
    };

    shutdown.trigger();
    let gateway_result = match gateway_result {
        Some(joined) => joined,
        None => gateway_task.await,
    };
    dispatcher_task.await.context("Dispatcher task panicked")?;
    sweeper.await.context("Sweeper task panicked")?;

    gateway_result
        .context("Gateway task panicked")?
        .context("Gateway connection failed")?;

    info!("Sync engine stopped");
    Ok(())
}
