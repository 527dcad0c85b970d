//! Database models - SQLx-compatible structs for PostgreSQL tables

mod community;
mod post;
mod reaction;

pub use community::{ChannelModel, CommunityModel, UserModel};
pub use post::{ImageModel, PostModel, PostSummaryModel};
pub use reaction::{EmojiModel, ReactionModel, ReactionTallyModel};
