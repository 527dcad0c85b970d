//! Channel to community lookup
//!
//! Some payloads (edits, REST-fetched history) omit the community ID. The
//! cache is filled once from the REST API and is read-only afterwards.

use std::collections::HashMap;

use monicu_core::Snowflake;
use monicu_discord::DiscordApi;
use tokio::sync::OnceCell;
use tracing::{info, warn};

/// Write-once map from channel ID to owning community ID
#[derive(Debug, Default)]
pub struct ChannelCommunityCache {
    map: OnceCell<HashMap<Snowflake, Snowflake>>,
}

impl ChannelCommunityCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache that is already built
    pub fn from_entries(entries: impl IntoIterator<Item = (Snowflake, Snowflake)>) -> Self {
        Self {
            map: OnceCell::new_with(Some(entries.into_iter().collect())),
        }
    }

    /// Resolve the community of every channel
    ///
    /// Runs at most once; concurrent callers wait for the first build. A
    /// channel that cannot be resolved is logged and left out.
    pub async fn build(&self, api: &dyn DiscordApi, channels: &[Snowflake]) -> usize {
        let map = self
            .map
            .get_or_init(|| async {
                let mut map = HashMap::with_capacity(channels.len());
                for &channel in channels {
                    match api.channel(channel).await {
                        Ok(info) => match info.guild_id {
                            Some(community) => {
                                map.insert(channel, community);
                            }
                            None => warn!(channel_id = %channel, "Channel has no community"),
                        },
                        Err(e) => {
                            warn!(channel_id = %channel, error = %e, "Failed to resolve channel");
                        }
                    }
                }
                info!(resolved = map.len(), configured = channels.len(), "Channel cache built");
                map
            })
            .await;
        map.len()
    }

    /// Community of a channel, `None` when unknown or not built yet
    #[must_use]
    pub fn lookup(&self, channel: Snowflake) -> Option<Snowflake> {
        self.map.get().and_then(|m| m.get(&channel).copied())
    }

    #[must_use]
    pub fn is_built(&self) -> bool {
        self.map.initialized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::FakeDiscord;

    #[tokio::test]
    async fn test_build_skips_unresolvable_channels() {
        let api = FakeDiscord::new()
            .with_channel(Snowflake::new(222), Some(Snowflake::new(333)))
            .with_channel(Snowflake::new(224), None);
        let cache = ChannelCommunityCache::new();
        assert!(!cache.is_built());
        assert_eq!(cache.lookup(Snowflake::new(222)), None);

        let resolved = cache
            .build(
                &api,
                &[Snowflake::new(222), Snowflake::new(223), Snowflake::new(224)],
            )
            .await;

        assert_eq!(resolved, 1);
        assert!(cache.is_built());
        assert_eq!(cache.lookup(Snowflake::new(222)), Some(Snowflake::new(333)));
        assert_eq!(cache.lookup(Snowflake::new(223)), None);
        assert_eq!(cache.lookup(Snowflake::new(224)), None);
    }

    #[tokio::test]
    async fn test_build_runs_once() {
        let api = FakeDiscord::new().with_channel(Snowflake::new(222), Some(Snowflake::new(333)));
        let cache = ChannelCommunityCache::new();
        cache.build(&api, &[Snowflake::new(222)]).await;
        cache.build(&api, &[Snowflake::new(222)]).await;
        assert_eq!(api.channel_calls(), 1);
    }

    #[test]
    fn test_from_entries() {
        let cache = ChannelCommunityCache::from_entries([(Snowflake::new(1), Snowflake::new(2))]);
        assert!(cache.is_built());
        assert_eq!(cache.lookup(Snowflake::new(1)), Some(Snowflake::new(2)));
    }
}
