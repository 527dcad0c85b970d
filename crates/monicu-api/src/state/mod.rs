//! Application state
//!
//! Holds the shared state for the Axum application: the read-side query port
//! and the configuration.

use std::sync::Arc;

use monicu_common::AppConfig;
use monicu_core::PostQuery;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    posts: Arc<dyn PostQuery>,
    config: Option<Arc<AppConfig>>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(posts: Arc<dyn PostQuery>, config: AppConfig) -> Self {
        Self {
            posts,
            config: Some(Arc::new(config)),
        }
    }

    /// State without configuration, for tests and embedding
    pub fn from_query(posts: Arc<dyn PostQuery>) -> Self {
        Self {
            posts,
            config: None,
        }
    }

    /// Get the post query port
    pub fn posts(&self) -> &dyn PostQuery {
        self.posts.as_ref()
    }

    /// Get the application configuration, if the state was built from one
    pub fn config(&self) -> Option<&AppConfig> {
        self.config.as_deref()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("posts", &"PostQuery")
            .field("config", &self.config.is_some())
            .finish()
    }
}
