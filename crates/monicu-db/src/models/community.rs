//! Community, channel, and user database models

use sqlx::FromRow;

/// Database model for community table
#[derive(Debug, Clone, FromRow)]
pub struct CommunityModel {
    pub id: i64,
    pub discord_id: i64,
}

/// Database model for channel table
#[derive(Debug, Clone, FromRow)]
pub struct ChannelModel {
    pub id: i64,
    pub discord_id: i64,
    pub community_id: i64,
}

/// Database model for "user" table
#[derive(Debug, Clone, FromRow)]
pub struct UserModel {
    pub id: i64,
    pub discord_id: i64,
}
