//! Application configuration structs
//!
//! Loads configuration from an optional `config.{yaml,toml,json}` file in the
//! working directory, overridden by `MONICU__SECTION__KEY` environment
//! variables (after `.env` is loaded).

use monicu_core::Snowflake;
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::fmt;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub posts: PostsConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub api: ServerConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Gateway credentials and the tracked allow-lists
#[derive(Clone, Deserialize)]
pub struct DiscordConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub communities: Vec<Snowflake>,
    #[serde(default)]
    pub channels: Vec<Snowflake>,
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

impl DiscordConfig {
    /// Return the bot token, failing if none is configured
    pub fn require_token(&self) -> Result<&str, ConfigError> {
        if self.token.trim().is_empty() {
            return Err(ConfigError::MissingVar("discord.token"));
        }
        Ok(&self.token)
    }
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            communities: Vec::new(),
            channels: Vec::new(),
            gateway_url: default_gateway_url(),
            api_url: default_api_url(),
        }
    }
}

impl fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("token", &"<redacted>")
            .field("communities", &self.communities)
            .field("channels", &self.channels)
            .field("gateway_url", &self.gateway_url)
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// Post filtering configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostsConfig {
    /// Messages whose content matches this pattern are never mirrored
    #[serde(default)]
    pub ignore_pattern: Option<String>,
}

impl PostsConfig {
    /// Compile the exclusion pattern
    pub fn ignore_regex(&self) -> Result<Option<Regex>, ConfigError> {
        match self.ignore_pattern.as_deref() {
            None | Some("") => Ok(None),
            Some(pattern) => Regex::new(pattern)
                .map(Some)
                .map_err(|e| ConfigError::InvalidValue("posts.ignore_pattern", e.to_string())),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub database_url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// HTTP server configuration for the read API
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Sync engine tuning
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Timeout for the HEAD request that sizes an embed image
    #[serde(default = "default_image_probe_timeout")]
    pub image_probe_timeout_secs: u64,
    /// How long an attachment-less message waits for an edit adding embeds
    #[serde(default = "default_pending_edit_window")]
    pub pending_edit_window_secs: u64,
    /// Capacity of the gateway event channel
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl SyncConfig {
    #[must_use]
    pub fn image_probe_timeout(&self) -> Duration {
        Duration::from_secs(self.image_probe_timeout_secs)
    }

    #[must_use]
    pub fn pending_edit_window(&self) -> Duration {
        Duration::from_secs(self.pending_edit_window_secs)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            image_probe_timeout_secs: default_image_probe_timeout(),
            pending_edit_window_secs: default_pending_edit_window(),
            event_buffer: default_event_buffer(),
        }
    }
}

// Default value functions
fn default_gateway_url() -> String {
    "wss://gateway.discord.gg/?v=10&encoding=json".to_string()
}

fn default_api_url() -> String {
    "https://discord.com/api/v10".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_image_probe_timeout() -> u64 {
    3
}

fn default_pending_edit_window() -> u64 {
    10
}

fn default_event_buffer() -> usize {
    256
}

impl AppConfig {
    /// Environment variable prefix, e.g. `MONICU__DISCORD__TOKEN`
    pub const ENV_PREFIX: &'static str = "MONICU";

    /// Load configuration from the config file and environment
    ///
    /// # Errors
    /// Returns an error if a required value is missing or a value is malformed
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let mut builder = ::config::Config::builder()
            .add_source(::config::File::with_name("config").required(false))
            .add_source(
                ::config::Environment::with_prefix(Self::ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("discord.communities")
                    .with_list_parse_key("discord.channels")
                    .try_parsing(true),
            );

        if let Ok(url) = env::var("DATABASE_URL") {
            builder = builder.set_default("storage.database_url", url)?;
        }

        Self::from_config(builder.build()?)
    }

    /// Deserialize and validate an already assembled configuration
    pub fn from_config(source: ::config::Config) -> Result<Self, ConfigError> {
        let config: Self = source.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that deserialize fine but are unusable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.database_url.trim().is_empty() {
            return Err(ConfigError::MissingVar("storage.database_url"));
        }
        self.posts.ignore_regex()?;
        if self.sync.event_buffer == 0 {
            return Err(ConfigError::InvalidValue(
                "sync.event_buffer",
                "must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration value: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),

    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),
}
