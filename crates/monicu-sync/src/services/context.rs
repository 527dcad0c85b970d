//! Sync context - dependency container for the reconcilers
//!
//! Holds the store, the Discord collaborators, and the write-once state the
//! engine shares across events.

use std::sync::Arc;
use std::time::Duration;

use monicu_core::Store;
use monicu_discord::{DiscordApi, ImageProbe};

use super::cache::ChannelCommunityCache;
use super::error::{SyncError, SyncResult};
use super::pending::PendingEdits;
use super::scope::ScopeFilter;
use super::shutdown::Shutdown;

/// Default deferred-edit window
const DEFAULT_PENDING_WINDOW: Duration = Duration::from_secs(10);

/// Sync context containing all dependencies
///
/// Cheap to clone; every clone shares the same store, cache, pending table,
/// and shutdown signal.
#[derive(Clone)]
pub struct SyncContext {
    store: Arc<dyn Store>,
    api: Arc<dyn DiscordApi>,
    probe: Arc<dyn ImageProbe>,
    scope: Arc<ScopeFilter>,
    cache: Arc<ChannelCommunityCache>,
    pending: PendingEdits,
    shutdown: Shutdown,
}

impl SyncContext {
    #[must_use]
    pub fn builder() -> SyncContextBuilder {
        SyncContextBuilder::new()
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn api(&self) -> &dyn DiscordApi {
        self.api.as_ref()
    }

    pub fn probe(&self) -> &dyn ImageProbe {
        self.probe.as_ref()
    }

    pub fn scope(&self) -> &ScopeFilter {
        &self.scope
    }

    pub fn cache(&self) -> &ChannelCommunityCache {
        &self.cache
    }

    pub fn pending(&self) -> &PendingEdits {
        &self.pending
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }
}

impl std::fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncContext")
            .field("store", &"dyn Store")
            .field("api", &"dyn DiscordApi")
            .field("scope", &self.scope)
            .field("cache_built", &self.cache.is_built())
            .field("pending", &self.pending.len())
            .finish()
    }
}

/// Builder for [`SyncContext`]
pub struct SyncContextBuilder {
    store: Option<Arc<dyn Store>>,
    api: Option<Arc<dyn DiscordApi>>,
    probe: Option<Arc<dyn ImageProbe>>,
    scope: Option<ScopeFilter>,
    cache: Option<Arc<ChannelCommunityCache>>,
    pending_window: Duration,
    shutdown: Option<Shutdown>,
}

impl SyncContextBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            api: None,
            probe: None,
            scope: None,
            cache: None,
            pending_window: DEFAULT_PENDING_WINDOW,
            shutdown: None,
        }
    }

    pub fn store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn api(mut self, api: Arc<dyn DiscordApi>) -> Self {
        self.api = Some(api);
        self
    }

    pub fn probe(mut self, probe: Arc<dyn ImageProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn scope(mut self, scope: ScopeFilter) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Use a prebuilt cache instead of building one on READY
    pub fn cache(mut self, cache: ChannelCommunityCache) -> Self {
        self.cache = Some(Arc::new(cache));
        self
    }

    pub fn pending_window(mut self, window: Duration) -> Self {
        self.pending_window = window;
        self
    }

    pub fn shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Build the SyncContext
    ///
    /// # Errors
    /// Returns `SyncError::MissingDependency` if a required part is missing
    pub fn build(self) -> SyncResult<SyncContext> {
        Ok(SyncContext {
            store: self.store.ok_or(SyncError::MissingDependency("store"))?,
            api: self.api.ok_or(SyncError::MissingDependency("api"))?,
            probe: self.probe.ok_or(SyncError::MissingDependency("probe"))?,
            scope: Arc::new(self.scope.ok_or(SyncError::MissingDependency("scope"))?),
            cache: self.cache.unwrap_or_default(),
            pending: PendingEdits::new(self.pending_window),
            shutdown: self.shutdown.unwrap_or_default(),
        })
    }
}

impl Default for SyncContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{FakeDiscord, FakeProbe};
    use monicu_db::MemoryStore;

    #[test]
    fn test_builder_requires_store() {
        let err = SyncContext::builder()
            .api(Arc::new(FakeDiscord::new()))
            .probe(Arc::new(FakeProbe::default()))
            .scope(ScopeFilter::new([], [], None))
            .build()
            .unwrap_err();
        assert!(matches!(err, SyncError::MissingDependency("store")));
    }

    #[test]
    fn test_builder_defaults() {
        let ctx = SyncContext::builder()
            .store(Arc::new(MemoryStore::new()))
            .api(Arc::new(FakeDiscord::new()))
            .probe(Arc::new(FakeProbe::default()))
            .scope(ScopeFilter::new([], [], None))
            .build()
            .unwrap();
        assert!(!ctx.cache().is_built());
        assert_eq!(ctx.pending().window(), DEFAULT_PENDING_WINDOW);
        assert!(!ctx.shutdown().is_triggered());
    }
}
