//! # monicu-discord
//!
//! Everything that talks to Discord:
//!
//! - `protocol`: gateway op codes, close codes, frames, and client payloads
//! - `events`: the closed set of dispatch events the sync engine consumes
//! - `gateway`: a gateway client with heartbeating and resume/reconnect
//! - `rest`: the REST query surface (`DiscordApi`) and the image size probe

pub mod error;
pub mod events;
pub mod gateway;
pub mod protocol;
pub mod rest;

pub use error::{DiscordError, DiscordResult};
pub use events::{
    Attachment, ChannelInfo, Embed, EmbedImage, GatewayEvent, Message, MessageDeleteBulkEvent,
    MessageDeleteEvent, MessageReactionEvent, MessageReactionRemoveAllEvent, PartialEmoji,
    ReactionCount, ReadyEvent, UserPayload,
};
pub use gateway::{GatewayClient, GatewayConfig};
pub use protocol::Intents;
pub use rest::{DiscordApi, HttpImageProbe, ImageProbe, RestClient, REST_PAGE_LIMIT};
