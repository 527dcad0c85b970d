//! Repository traits (ports) - define the interface for data access
//!
//! Every mutation happens inside a unit of work obtained from [`Store::begin`].
//! The per-entity traits take `&mut self` so an implementation can route all
//! statements through one open transaction; [`UnitOfWork`] ties them together
//! with `commit`/`rollback`.
//!
//! Dropping a unit of work without committing rolls it back.

use async_trait::async_trait;

use crate::entities::{
    Channel, Community, Emoji, EmojiRef, Image, NewImage, NewPost, Post, Reaction, User,
};
use crate::error::DomainError;
use crate::value_objects::Snowflake;

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

// ============================================================================
// Store
// ============================================================================

#[async_trait]
pub trait Store: Send + Sync {
    /// Open a new unit of work
    async fn begin(&self) -> RepoResult<Box<dyn UnitOfWork>>;
}

#[async_trait]
pub trait UnitOfWork:
    CommunityRepository
    + ChannelRepository
    + UserRepository
    + PostRepository
    + ImageRepository
    + EmojiRepository
    + ReactionRepository
    + UserReactionRepository
    + Send
{
    /// Make every change in this unit of work visible
    async fn commit(&mut self) -> RepoResult<()>;

    /// Discard every change in this unit of work
    async fn rollback(&mut self) -> RepoResult<()>;
}

// ============================================================================
// Community Repository
// ============================================================================

#[async_trait]
pub trait CommunityRepository: Send {
    /// Find community by external ID
    async fn find_community(&mut self, discord_id: Snowflake) -> RepoResult<Option<Community>>;

    /// Return the surrogate key for the external ID, creating the row if absent
    async fn find_or_create_community(&mut self, discord_id: Snowflake) -> RepoResult<i64>;
}

// ============================================================================
// Channel Repository
// ============================================================================

#[async_trait]
pub trait ChannelRepository: Send {
    /// Find channel by external ID
    async fn find_channel(&mut self, discord_id: Snowflake) -> RepoResult<Option<Channel>>;

    /// Return the surrogate key for the external ID, creating the row under
    /// `community_id` if absent
    async fn find_or_create_channel(
        &mut self,
        discord_id: Snowflake,
        community_id: i64,
    ) -> RepoResult<i64>;
}

// ============================================================================
// User Repository
// ============================================================================

#[async_trait]
pub trait UserRepository: Send {
    /// Find user by external ID
    async fn find_user(&mut self, discord_id: Snowflake) -> RepoResult<Option<User>>;

    /// Return the surrogate key for the external ID, creating the row if absent
    async fn find_or_create_user(&mut self, discord_id: Snowflake) -> RepoResult<i64>;
}

// ============================================================================
// Post Repository
// ============================================================================

#[async_trait]
pub trait PostRepository: Send {
    /// Find post by external message ID
    async fn find_post(&mut self, discord_id: Snowflake) -> RepoResult<Option<Post>>;

    /// Create a post
    ///
    /// Fails with [`DomainError::PostAlreadyExists`] when the message is
    /// already mirrored.
    async fn create_post(&mut self, post: NewPost) -> RepoResult<Post>;

    /// Replace the stored text content
    async fn update_post_content(&mut self, post_id: i64, content: &str) -> RepoResult<()>;

    /// Delete a post (cascading to images and reactions)
    ///
    /// Returns `false` when no such post exists.
    async fn delete_post(&mut self, discord_id: Snowflake) -> RepoResult<bool>;

    /// Check whether any post exists in the channel
    async fn channel_has_posts(&mut self, channel_id: i64) -> RepoResult<bool>;

    /// Count posts in the channel
    async fn count_channel_posts(&mut self, channel_id: i64) -> RepoResult<i64>;
}

// ============================================================================
// Image Repository
// ============================================================================

#[async_trait]
pub trait ImageRepository: Send {
    /// Create an image
    async fn create_image(&mut self, image: NewImage) -> RepoResult<Image>;

    /// List the images of a post in insertion order
    async fn find_images(&mut self, post_id: i64) -> RepoResult<Vec<Image>>;

    /// Delete every image of a post, returning how many were removed
    async fn delete_images(&mut self, post_id: i64) -> RepoResult<u64>;
}

// ============================================================================
// Emoji Repository
// ============================================================================

#[async_trait]
pub trait EmojiRepository: Send {
    /// Find emoji by key (custom emoji by ID, standard emoji by name)
    async fn find_emoji(&mut self, emoji: &EmojiRef) -> RepoResult<Option<Emoji>>;

    /// Return the surrogate key for the emoji, creating the row if absent
    async fn find_or_create_emoji(&mut self, emoji: &EmojiRef) -> RepoResult<i64>;
}

// ============================================================================
// Reaction Repository
// ============================================================================

#[async_trait]
pub trait ReactionRepository: Send {
    /// Find the aggregate for (post, emoji)
    async fn find_reaction(&mut self, post_id: i64, emoji_id: i64) -> RepoResult<Option<Reaction>>;

    /// Return the aggregate key for (post, emoji), creating the row if absent
    async fn find_or_create_reaction(&mut self, post_id: i64, emoji_id: i64) -> RepoResult<i64>;

    /// Delete every aggregate of a post (cascading to user reactions)
    async fn delete_reactions(&mut self, post_id: i64) -> RepoResult<u64>;
}

// ============================================================================
// UserReaction Repository
// ============================================================================

#[async_trait]
pub trait UserReactionRepository: Send {
    /// Record that a user reacted
    ///
    /// Returns `false` when the (reaction, user) pair already exists.
    async fn create_user_reaction(&mut self, reaction_id: i64, user_id: i64) -> RepoResult<bool>;

    /// Remove a user's reaction, returning `false` when it did not exist
    async fn delete_user_reaction(&mut self, reaction_id: i64, user_id: i64) -> RepoResult<bool>;

    /// Count users behind an aggregate
    async fn count_user_reactions(&mut self, reaction_id: i64) -> RepoResult<i64>;
}
