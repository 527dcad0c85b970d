//! # monicu-core
//!
//! Domain layer containing the mirrored entities, the `Snowflake` value object,
//! and the storage traits implemented by `monicu-db`.
//! This crate has zero dependencies on infrastructure (database, HTTP, gateway).

pub mod entities;
pub mod error;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    Channel, Community, Emoji, EmojiRef, Image, NewImage, NewPost, Post, PostSummary, Reaction,
    ReactionTally, User, UserReaction,
};
pub use error::DomainError;
pub use traits::{
    ChannelRepository, CommunityRepository, EmojiRepository, ImageRepository, PostQuery,
    PostRepository, ReactionRepository, RepoResult, Store, UnitOfWork, UserReactionRepository,
    UserRepository,
};
pub use value_objects::{Snowflake, SnowflakeParseError};
