//! Domain entities - the mirrored rows and their read-side projections

mod community;
mod emoji;
mod image;
mod post;
mod reaction;
mod summary;
mod user;

pub use community::{Channel, Community};
pub use emoji::{Emoji, EmojiRef};
pub use image::{Image, NewImage};
pub use post::{NewPost, Post};
pub use reaction::{Reaction, UserReaction};
pub use summary::{PostSummary, ReactionTally};
pub use user::User;
