//! Read-side projection of a post for the query API

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::Image;
use crate::value_objects::Snowflake;

/// A post with its images and reaction tallies
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostSummary {
    pub id: Snowflake,
    pub channel: Snowflake,
    pub community: Snowflake,
    pub user: Snowflake,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub images: Vec<Image>,
    pub reactions: Vec<ReactionTally>,
    /// Distinct users who reacted with any emoji
    pub reaction_count: i64,
}

/// Number of users who reacted with one emoji
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReactionTally {
    pub emoji: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji_id: Option<Snowflake>,
    pub count: i64,
}
