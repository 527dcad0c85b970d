//! Typed gateway events

use serde_json::Value;

use super::{
    GatewayEventType, Message, MessageDeleteBulkEvent, MessageDeleteEvent, MessageReactionEvent,
    MessageReactionRemoveAllEvent, ReadyEvent,
};

/// The dispatch events the sync engine handles
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    Ready(ReadyEvent),
    MessageCreate(Message),
    MessageUpdate(Message),
    MessageDelete(MessageDeleteEvent),
    MessageDeleteBulk(MessageDeleteBulkEvent),
    ReactionAdd(MessageReactionEvent),
    ReactionRemove(MessageReactionEvent),
    ReactionRemoveAll(MessageReactionRemoveAllEvent),
}

impl GatewayEvent {
    /// Decode a dispatch payload
    ///
    /// Returns `Ok(None)` for dispatch types that are not handled.
    pub fn decode(event_type: &str, data: Value) -> Result<Option<Self>, serde_json::Error> {
        let Some(kind) = GatewayEventType::from_name(event_type) else {
            return Ok(None);
        };

        let event = match kind {
            GatewayEventType::Ready => Self::Ready(serde_json::from_value(data)?),
            GatewayEventType::Resumed => return Ok(None),
            GatewayEventType::MessageCreate => Self::MessageCreate(serde_json::from_value(data)?),
            GatewayEventType::MessageUpdate => Self::MessageUpdate(serde_json::from_value(data)?),
            GatewayEventType::MessageDelete => Self::MessageDelete(serde_json::from_value(data)?),
            GatewayEventType::MessageDeleteBulk => {
                Self::MessageDeleteBulk(serde_json::from_value(data)?)
            }
            GatewayEventType::MessageReactionAdd => {
                Self::ReactionAdd(serde_json::from_value(data)?)
            }
            GatewayEventType::MessageReactionRemove => {
                Self::ReactionRemove(serde_json::from_value(data)?)
            }
            GatewayEventType::MessageReactionRemoveAll => {
                Self::ReactionRemoveAll(serde_json::from_value(data)?)
            }
        };
        Ok(Some(event))
    }

    /// Dispatch name of this event
    #[must_use]
    pub fn event_type(&self) -> GatewayEventType {
        match self {
            Self::Ready(_) => GatewayEventType::Ready,
            Self::MessageCreate(_) => GatewayEventType::MessageCreate,
            Self::MessageUpdate(_) => GatewayEventType::MessageUpdate,
            Self::MessageDelete(_) => GatewayEventType::MessageDelete,
            Self::MessageDeleteBulk(_) => GatewayEventType::MessageDeleteBulk,
            Self::ReactionAdd(_) => GatewayEventType::MessageReactionAdd,
            Self::ReactionRemove(_) => GatewayEventType::MessageReactionRemove,
            Self::ReactionRemoveAll(_) => GatewayEventType::MessageReactionRemoveAll,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use monicu_core::Snowflake;
    use serde_json::json;

    #[test]
    fn test_decode_known_events() {
        let event = GatewayEvent::decode(
            "MESSAGE_DELETE_BULK",
            json!({"ids": ["1", "2"], "channel_id": "222", "guild_id": "333"}),
        )
        .unwrap()
        .unwrap();
        match event {
            GatewayEvent::MessageDeleteBulk(e) => {
                assert_eq!(e.ids, vec![Snowflake::new(1), Snowflake::new(2)]);
            }
            other => panic!("unexpected event {other:?}"),
        }

        let event = GatewayEvent::decode(
            "MESSAGE_REACTION_REMOVE_ALL",
            json!({"channel_id": "222", "message_id": "111"}),
        )
        .unwrap()
        .unwrap();
        assert_eq!(event.event_type(), GatewayEventType::MessageReactionRemoveAll);
    }

    #[test]
    fn test_decode_ignores_unhandled_events() {
        assert!(GatewayEvent::decode("TYPING_START", json!({})).unwrap().is_none());
        assert!(GatewayEvent::decode("RESUMED", json!({})).unwrap().is_none());
    }

    #[test]
    fn test_decode_rejects_malformed_payload() {
        assert!(GatewayEvent::decode("MESSAGE_DELETE", json!({"id": "abc"})).is_err());
    }
}
