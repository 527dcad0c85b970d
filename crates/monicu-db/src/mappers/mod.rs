//! Entity <-> model mappers
//!
//! Snowflakes cross the boundary through `Snowflake::{to_db, from_db}`;
//! image dimensions are stored as BIGINT and clamp to zero if negative.

use monicu_core::entities::{
    Channel, Community, Emoji, Image, Post, Reaction, ReactionTally, User,
};
use monicu_core::value_objects::Snowflake;

use crate::models::{
    ChannelModel, CommunityModel, EmojiModel, ImageModel, PostModel, ReactionModel,
    ReactionTallyModel, UserModel,
};

impl From<CommunityModel> for Community {
    fn from(model: CommunityModel) -> Self {
        Community {
            id: model.id,
            discord_id: Snowflake::from_db(model.discord_id),
        }
    }
}

impl From<ChannelModel> for Channel {
    fn from(model: ChannelModel) -> Self {
        Channel {
            id: model.id,
            discord_id: Snowflake::from_db(model.discord_id),
            community_id: model.community_id,
        }
    }
}

impl From<UserModel> for User {
    fn from(model: UserModel) -> Self {
        User {
            id: model.id,
            discord_id: Snowflake::from_db(model.discord_id),
        }
    }
}

impl From<PostModel> for Post {
    fn from(model: PostModel) -> Self {
        Post {
            id: model.id,
            discord_id: Snowflake::from_db(model.discord_id),
            channel_id: model.channel_id,
            user_id: model.user_id,
            content: model.content,
        }
    }
}

impl From<ImageModel> for Image {
    fn from(model: ImageModel) -> Self {
        Image {
            id: model.id,
            post_id: model.post_id,
            url: model.url,
            width: u32::try_from(model.width).unwrap_or(0),
            height: u32::try_from(model.height).unwrap_or(0),
            size: u64::try_from(model.size).unwrap_or(0),
        }
    }
}

impl From<EmojiModel> for Emoji {
    fn from(model: EmojiModel) -> Self {
        Emoji {
            id: model.id,
            discord_id: model.discord_id.map(Snowflake::from_db),
            name: model.name,
        }
    }
}

impl From<ReactionModel> for Reaction {
    fn from(model: ReactionModel) -> Self {
        Reaction {
            id: model.id,
            post_id: model.post_id,
            emoji_id: model.emoji_id,
        }
    }
}

impl From<ReactionTallyModel> for ReactionTally {
    fn from(model: ReactionTallyModel) -> Self {
        ReactionTally {
            emoji: model.emoji_name,
            emoji_id: model.emoji_discord_id.map(Snowflake::from_db),
            count: model.count,
        }
    }
}
