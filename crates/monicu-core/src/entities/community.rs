//! Community and channel entities
//!
//! A community is what the platform calls a guild. Both rows are created
//! lazily the first time a tracked message references them.

use crate::value_objects::Snowflake;

/// Community entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Community {
    pub id: i64,
    pub discord_id: Snowflake,
}

/// Channel entity, owned by exactly one community
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channel {
    pub id: i64,
    pub discord_id: Snowflake,
    pub community_id: i64,
}

impl Channel {
    /// Check if the channel belongs to the given community row
    #[inline]
    pub fn belongs_to(&self, community: &Community) -> bool {
        self.community_id == community.id
    }
}
