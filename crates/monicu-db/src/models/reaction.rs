//! Emoji and reaction database models

use sqlx::FromRow;

/// Database model for emoji table
#[derive(Debug, Clone, FromRow)]
pub struct EmojiModel {
    pub id: i64,
    pub discord_id: Option<i64>,
    pub name: String,
}

/// Database model for reaction table
#[derive(Debug, Clone, FromRow)]
pub struct ReactionModel {
    pub id: i64,
    pub post_id: i64,
    pub emoji_id: i64,
}

/// Per-emoji reactor count for a post (from listing query)
#[derive(Debug, Clone, FromRow)]
pub struct ReactionTallyModel {
    pub post_id: i64,
    pub emoji_discord_id: Option<i64>,
    pub emoji_name: String,
    pub count: i64,
}
