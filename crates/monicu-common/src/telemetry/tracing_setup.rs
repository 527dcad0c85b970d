//! Subscriber setup shared by both binaries
//!
//! `RUST_LOG` wins when set. Otherwise the configured level applies to our
//! crates while the driver and transport crates stay at `warn`, since sqlx
//! logs every statement and tungstenite every frame at `debug`.

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

const QUIET_DEPENDENCIES: &[&str] = &["sqlx", "tungstenite", "tokio_tungstenite", "hyper", "reqwest"];

#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub level: Level,
    /// One JSON object per line instead of human-readable text
    pub json: bool,
    pub file_line: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json: false,
            file_line: false,
        }
    }
}

impl TracingConfig {
    /// Directive used when `RUST_LOG` is unset
    pub fn default_directive(&self) -> String {
        let mut directive = self.level.to_string().to_lowercase();
        for krate in QUIET_DEPENDENCIES {
            directive.push_str(&format!(",{krate}=warn"));
        }
        directive
    }
}

impl From<&LoggingConfig> for TracingConfig {
    fn from(config: &LoggingConfig) -> Self {
        let level = config.level.parse().unwrap_or(Level::INFO);
        Self {
            level,
            json: config.json,
            file_line: level >= Level::DEBUG,
        }
    }
}

/// Install a text subscriber at `info`
///
/// Used before configuration is loaded, so config errors are still logged.
pub fn try_init_tracing() -> Result<(), TracingError> {
    try_init_tracing_with_config(TracingConfig::default())
}

pub fn try_init_tracing_with_config(config: TracingConfig) -> Result<(), TracingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_directive()));

    let layer = fmt::layer()
        .with_file(config.file_line)
        .with_line_number(config.file_line);
    let layer = if config.json {
        layer.json().with_current_span(true).boxed()
    } else {
        layer.boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .map_err(|_| TracingError::AlreadyInitialized)
}

#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("A global tracing subscriber is already installed")]
    AlreadyInitialized,
}
