//! Reaction aggregate and per-user reaction rows
//!
//! A `Reaction` is the (post, emoji) aggregate; each person who reacted with
//! that emoji is one `UserReaction` pointing at it. Counts are always derived
//! by joining user reactions, so an emptied aggregate is harmless.

/// Reaction aggregate entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reaction {
    pub id: i64,
    pub post_id: i64,
    pub emoji_id: i64,
}

/// Per-user reaction junction entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserReaction {
    pub id: i64,
    pub reaction_id: i64,
    pub user_id: i64,
}
