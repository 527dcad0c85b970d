//! Storage traits (ports)

mod query;
mod repositories;

pub use query::PostQuery;
pub use repositories::{
    ChannelRepository, CommunityRepository, EmojiRepository, ImageRepository, PostRepository,
    ReactionRepository, RepoResult, Store, UnitOfWork, UserReactionRepository, UserRepository,
};
