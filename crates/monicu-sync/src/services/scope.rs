//! Allow-list and content exclusion

use std::collections::HashSet;

use monicu_common::{ConfigError, DiscordConfig, PostsConfig};
use monicu_core::Snowflake;
use regex::Regex;

/// Decides whether an event is inside the configured scope
///
/// Immutable after construction.
#[derive(Debug, Clone)]
pub struct ScopeFilter {
    communities: HashSet<Snowflake>,
    channels: Vec<Snowflake>,
    channel_set: HashSet<Snowflake>,
    exclude: Option<Regex>,
}

impl ScopeFilter {
    pub fn new(
        communities: impl IntoIterator<Item = Snowflake>,
        channels: impl IntoIterator<Item = Snowflake>,
        exclude: Option<Regex>,
    ) -> Self {
        let mut ordered = Vec::new();
        let mut channel_set = HashSet::new();
        for channel in channels {
            if channel_set.insert(channel) {
                ordered.push(channel);
            }
        }
        Self {
            communities: communities.into_iter().collect(),
            channels: ordered,
            channel_set,
            exclude,
        }
    }

    /// Build from configuration; a malformed exclusion pattern is an error
    pub fn from_config(discord: &DiscordConfig, posts: &PostsConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            discord.communities.iter().copied(),
            discord.channels.iter().copied(),
            posts.ignore_regex()?,
        ))
    }

    /// Community and channel are both allowed and the content is not excluded
    #[must_use]
    pub fn is_in_scope(&self, community: Snowflake, channel: Snowflake, content: &str) -> bool {
        self.allows(community, channel) && !self.is_excluded(content)
    }

    /// Community and channel are both allowed
    #[must_use]
    pub fn allows(&self, community: Snowflake, channel: Snowflake) -> bool {
        self.communities.contains(&community) && self.channel_set.contains(&channel)
    }

    #[must_use]
    pub fn is_excluded(&self, content: &str) -> bool {
        self.exclude.as_ref().is_some_and(|re| re.is_match(content))
    }

    /// Configured channels, in configuration order
    #[must_use]
    pub fn channels(&self) -> &[Snowflake] {
        &self.channels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> ScopeFilter {
        ScopeFilter::new(
            [Snowflake::new(333)],
            [Snowflake::new(222), Snowflake::new(223), Snowflake::new(222)],
            Some(Regex::new("^!nomirror").unwrap()),
        )
    }

    #[test]
    fn test_in_scope() {
        let scope = filter();
        assert!(scope.is_in_scope(Snowflake::new(333), Snowflake::new(222), "look"));
        assert!(!scope.is_in_scope(Snowflake::new(334), Snowflake::new(222), "look"));
        assert!(!scope.is_in_scope(Snowflake::new(333), Snowflake::new(999), "look"));
        assert!(!scope.is_in_scope(Snowflake::new(333), Snowflake::new(222), "!nomirror pls"));
    }

    #[test]
    fn test_allows_ignores_content() {
        let scope = filter();
        assert!(scope.allows(Snowflake::new(333), Snowflake::new(223)));
        assert!(!scope.allows(Snowflake::new(0), Snowflake::new(223)));
    }

    #[test]
    fn test_channels_are_deduplicated_in_order() {
        assert_eq!(
            filter().channels(),
            &[Snowflake::new(222), Snowflake::new(223)]
        );
    }

    #[test]
    fn test_without_pattern_nothing_is_excluded() {
        let scope = ScopeFilter::new([Snowflake::new(1)], [Snowflake::new(2)], None);
        assert!(!scope.is_excluded(""));
        assert!(scope.is_in_scope(Snowflake::new(1), Snowflake::new(2), "anything"));
    }

    #[test]
    fn test_from_config_rejects_bad_pattern() {
        let posts = PostsConfig {
            ignore_pattern: Some("([".to_string()),
        };
        assert!(ScopeFilter::from_config(&DiscordConfig::default(), &posts).is_err());
    }
}
