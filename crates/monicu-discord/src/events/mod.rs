//! Gateway events
//!
//! The dispatch events the sync engine consumes, decoded into a closed sum
//! type. Every other dispatch is ignored by the client.

mod event_types;
mod gateway_event;
mod payloads;

pub use event_types::GatewayEventType;
pub use gateway_event::GatewayEvent;
pub use payloads::{
    Attachment, ChannelInfo, Embed, EmbedImage, Message, MessageDeleteBulkEvent,
    MessageDeleteEvent, MessageReactionEvent, MessageReactionRemoveAllEvent, PartialEmoji,
    ReactionCount, ReadyEvent, UserPayload,
};
