//! Post entity - the persisted form of a tracked message

use crate::value_objects::Snowflake;

/// Post entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub id: i64,
    pub discord_id: Snowflake,
    pub channel_id: i64,
    pub user_id: i64,
    pub content: String,
}

/// Insert payload for a post whose channel and author rows already exist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub discord_id: Snowflake,
    pub channel_id: i64,
    pub user_id: i64,
    pub content: String,
}

impl NewPost {
    /// Create a new post payload
    pub fn new(discord_id: Snowflake, channel_id: i64, user_id: i64, content: impl Into<String>) -> Self {
        Self {
            discord_id,
            channel_id,
            user_id,
            content: content.into(),
        }
    }

    /// Materialize the row once the store has assigned its surrogate key
    pub fn into_post(self, id: i64) -> Post {
        Post {
            id,
            discord_id: self.discord_id,
            channel_id: self.channel_id,
            user_id: self.user_id,
            content: self.content,
        }
    }
}
