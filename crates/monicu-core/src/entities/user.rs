//! User entity - a message author or reactor

use crate::value_objects::Snowflake;

/// User entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub discord_id: Snowflake,
}
