//! Read-only Discord REST queries used by the sync engine

use async_trait::async_trait;
use monicu_core::{EmojiRef, Snowflake};

use crate::error::DiscordResult;
use crate::events::{ChannelInfo, Message, UserPayload};

#[async_trait]
pub trait DiscordApi: Send + Sync {
    /// `GET /channels/{channel}`
    async fn channel(&self, channel: Snowflake) -> DiscordResult<ChannelInfo>;

    /// `GET /channels/{channel}/messages`, newest first, strictly older than `before`
    async fn channel_messages(
        &self,
        channel: Snowflake,
        before: Option<Snowflake>,
        limit: u8,
    ) -> DiscordResult<Vec<Message>>;

    /// `GET /channels/{channel}/messages/{message}/reactions/{emoji}`, users
    /// with IDs strictly greater than `after`
    async fn message_reactions(
        &self,
        channel: Snowflake,
        message: Snowflake,
        emoji: &EmojiRef,
        after: Option<Snowflake>,
        limit: u8,
    ) -> DiscordResult<Vec<UserPayload>>;

    /// `GET /channels/{channel}/messages/{message}`
    async fn channel_message(
        &self,
        channel: Snowflake,
        message: Snowflake,
    ) -> DiscordResult<Message>;
}
