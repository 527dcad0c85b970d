//! Read API entry point
//!
//! Run with:
//! ```bash
//! cargo run -p monicu-api
//! ```
//!
//! Configuration is loaded from `config.{yaml,toml,json}` and `MONICU__*`
//! environment variables.

use monicu_common::{try_init_tracing, try_init_tracing_with_config, AppConfig, TracingConfig};
use tracing::{error, info};

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

    info!(address = %config.api.address(), "Starting read API...");

    if let Err(e) = monicu_api::server::run(config).await {
        error!(error = %e, "Server failed");
        std::process::exit(1);
    }
}
