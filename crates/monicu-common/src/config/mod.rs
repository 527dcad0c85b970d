//! Configuration structs

mod app_config;

pub use app_config::{
    AppConfig, ConfigError, DiscordConfig, LoggingConfig, PostsConfig, ServerConfig,
    StorageConfig, SyncConfig,
};
