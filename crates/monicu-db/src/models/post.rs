//! Post and image database models

use sqlx::FromRow;

/// Database model for post table
#[derive(Debug, Clone, FromRow)]
pub struct PostModel {
    pub id: i64,
    pub discord_id: i64,
    pub channel_id: i64,
    pub user_id: i64,
    pub content: String,
}

/// Database model for image table
#[derive(Debug, Clone, FromRow)]
pub struct ImageModel {
    pub id: i64,
    pub post_id: i64,
    pub url: String,
    pub width: i64,
    pub height: i64,
    pub size: i64,
}

/// Post joined with its channel, community, and author (from listing query)
#[derive(Debug, Clone, FromRow)]
pub struct PostSummaryModel {
    pub id: i64,
    pub discord_id: i64,
    pub channel_discord_id: i64,
    pub community_discord_id: i64,
    pub user_discord_id: i64,
    pub content: String,
    pub reaction_count: i64,
}
