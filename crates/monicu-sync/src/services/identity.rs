//! External ID to surrogate key resolution

use monicu_core::{
    ChannelRepository, CommunityRepository, RepoResult, Snowflake, UnitOfWork, UserRepository,
};
use tracing::instrument;

/// Lazily creates community, channel, and user rows inside a unit of work
///
/// Find-or-create is race-safe in the store: two units of work resolving the
/// same external ID converge on one key.
pub struct IdentityResolver<'t> {
    tx: &'t mut dyn UnitOfWork,
}

impl<'t> IdentityResolver<'t> {
    pub fn new(tx: &'t mut dyn UnitOfWork) -> Self {
        Self { tx }
    }

    #[instrument(skip(self))]
    pub async fn community(&mut self, community: Snowflake) -> RepoResult<i64> {
        self.tx.find_or_create_community(community).await
    }

    /// Channel key, creating the channel under `community_key` if absent
    #[instrument(skip(self))]
    pub async fn channel(&mut self, channel: Snowflake, community_key: i64) -> RepoResult<i64> {
        self.tx.find_or_create_channel(channel, community_key).await
    }

    #[instrument(skip(self))]
    pub async fn user(&mut self, user: Snowflake) -> RepoResult<i64> {
        self.tx.find_or_create_user(user).await
    }

    /// Resolve a community and one of its channels, returning the channel key
    pub async fn channel_in(&mut self, community: Snowflake, channel: Snowflake) -> RepoResult<i64> {
        let community_key = self.community(community).await?;
        self.channel(channel, community_key).await
    }
}
