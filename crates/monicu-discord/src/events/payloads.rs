//! Event payload definitions
//!
//! Only the fields the sync engine reads are modelled; everything else in
//! Discord's payloads is ignored during deserialization. The same [`Message`]
//! shape serves MESSAGE_CREATE, MESSAGE_UPDATE (where most fields may be
//! missing), and the REST message endpoints.

use monicu_core::{EmojiRef, Snowflake};
use serde::{Deserialize, Serialize};

// === Connection Events ===

/// READY event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyEvent {
    /// Gateway protocol version
    pub v: u8,

    /// The bot user
    pub user: UserPayload,

    /// Session ID for resuming
    pub session_id: String,

    /// Gateway URL to use when resuming
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_gateway_url: Option<String>,
}

// === Users and Channels ===

/// User data included in events and REST responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPayload {
    pub id: Snowflake,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub bot: bool,
}

/// Channel object from `GET /channels/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    #[serde(default)]
    pub name: Option<String>,
}

// === Messages ===

/// A message from MESSAGE_CREATE, MESSAGE_UPDATE, or the REST API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<UserPayload>,
    /// Missing from updates that only touch embeds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// `None` when an update left the attachments untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
    /// `None` when an update left the embeds untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embeds: Option<Vec<Embed>>,
    #[serde(default)]
    pub reactions: Vec<ReactionCount>,
}

impl Message {
    /// Text content, empty when the payload carried none
    #[must_use]
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }

    /// Attachments that are images (nonzero width and height)
    pub fn image_attachments(&self) -> impl Iterator<Item = &Attachment> {
        self.attachments.iter().flatten().filter(|a| a.is_image())
    }

    /// Embed images
    pub fn embed_images(&self) -> impl Iterator<Item = &EmbedImage> {
        self.embeds.iter().flatten().filter_map(|e| e.image.as_ref())
    }

    /// Whether the message carries at least one image attachment or embed image
    #[must_use]
    pub fn has_images(&self) -> bool {
        self.image_attachments().next().is_some() || self.embed_images().next().is_some()
    }

    /// Whether the message carries no attachments and no embeds at all
    #[must_use]
    pub fn is_bare(&self) -> bool {
        self.attachments.as_ref().map_or(true, Vec::is_empty)
            && self.embeds.as_ref().map_or(true, Vec::is_empty)
    }

    /// Whether the payload says anything about the message's images
    ///
    /// Embed-only updates omit `attachments`; such a payload cannot tell
    /// whether the attachment images are still there.
    #[must_use]
    pub fn carries_attachments(&self) -> bool {
        self.attachments.is_some()
    }

    /// Fold a later update into this snapshot
    ///
    /// Fields the update carries replace the snapshot's; missing ones are kept.
    pub fn merge_update(&mut self, update: Message) {
        if update.guild_id.is_some() {
            self.guild_id = update.guild_id;
        }
        if update.author.is_some() {
            self.author = update.author;
        }
        if update.content.is_some() {
            self.content = update.content;
        }
        if update.attachments.is_some() {
            self.attachments = update.attachments;
        }
        if update.embeds.is_some() {
            self.embeds = update.embeds;
        }
        if !update.reactions.is_empty() {
            self.reactions = update.reactions;
        }
    }
}

/// Message attachment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: Snowflake,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub proxy_url: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

impl Attachment {
    /// Images are the attachments with both dimensions nonzero
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.width.unwrap_or(0) != 0 && self.height.unwrap_or(0) != 0
    }

    /// URL to mirror, preferring the media proxy
    #[must_use]
    pub fn image_url(&self) -> &str {
        if self.proxy_url.is_empty() {
            &self.url
        } else {
            &self.proxy_url
        }
    }
}

/// Rich embed; only the image is of interest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedImage>,
}

/// Embed image
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedImage {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

impl EmbedImage {
    /// URL to mirror, preferring the media proxy
    #[must_use]
    pub fn image_url(&self) -> &str {
        self.proxy_url.as_deref().unwrap_or(&self.url)
    }
}

/// Reaction summary attached to a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionCount {
    #[serde(default)]
    pub count: u32,
    pub emoji: PartialEmoji,
}

/// Emoji descriptor: custom emoji carry an id, standard emoji only a name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialEmoji {
    #[serde(default)]
    pub id: Option<Snowflake>,
    #[serde(default)]
    pub name: Option<String>,
}

impl PartialEmoji {
    /// Storage key for this emoji, `None` when it has neither id nor name
    #[must_use]
    pub fn to_ref(&self) -> Option<EmojiRef> {
        EmojiRef::from_parts(self.id, self.name.as_deref())
    }
}

// === Deletes and Reactions ===

/// MESSAGE_DELETE event payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDeleteEvent {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
}

/// MESSAGE_DELETE_BULK event payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDeleteBulkEvent {
    pub ids: Vec<Snowflake>,
    pub channel_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
}

/// MESSAGE_REACTION_ADD / MESSAGE_REACTION_REMOVE event payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReactionEvent {
    pub user_id: Snowflake,
    pub channel_id: Snowflake,
    pub message_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    pub emoji: PartialEmoji,
}

/// MESSAGE_REACTION_REMOVE_ALL event payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReactionRemoveAllEvent {
    pub channel_id: Snowflake,
    pub message_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
}
