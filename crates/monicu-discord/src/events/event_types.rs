//! Dispatch names (the `t` field) this client decodes

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayEventType {
    Ready,
    Resumed,
    MessageCreate,
    /// Also sent when Discord attaches link-preview embeds after the fact
    MessageUpdate,
    MessageDelete,
    MessageDeleteBulk,
    MessageReactionAdd,
    MessageReactionRemove,
    MessageReactionRemoveAll,
}

const NAMES: [(GatewayEventType, &str); 9] = [
    (GatewayEventType::Ready, "READY"),
    (GatewayEventType::Resumed, "RESUMED"),
    (GatewayEventType::MessageCreate, "MESSAGE_CREATE"),
    (GatewayEventType::MessageUpdate, "MESSAGE_UPDATE"),
    (GatewayEventType::MessageDelete, "MESSAGE_DELETE"),
    (GatewayEventType::MessageDeleteBulk, "MESSAGE_DELETE_BULK"),
    (GatewayEventType::MessageReactionAdd, "MESSAGE_REACTION_ADD"),
    (GatewayEventType::MessageReactionRemove, "MESSAGE_REACTION_REMOVE"),
    (GatewayEventType::MessageReactionRemoveAll, "MESSAGE_REACTION_REMOVE_ALL"),
];

impl GatewayEventType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        NAMES
            .iter()
            .find(|(kind, _)| *kind == self)
            .map_or("UNKNOWN", |(_, name)| name)
    }

    /// `None` for dispatches the mirror does not consume
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        NAMES.iter().find(|(_, n)| *n == name).map(|(kind, _)| *kind)
    }
}

impl fmt::Display for GatewayEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
