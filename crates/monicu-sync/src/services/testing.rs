//! In-process fakes for the Discord collaborators

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use monicu_core::{EmojiRef, Snowflake};
use monicu_db::MemoryStore;
use monicu_discord::{
    Attachment, ChannelInfo, DiscordApi, DiscordError, DiscordResult, Embed, EmbedImage,
    ImageProbe, Message, PartialEmoji, ReactionCount, UserPayload,
};

use super::{ChannelCommunityCache, ScopeFilter, SyncContext};

/// Scripted [`DiscordApi`]
#[derive(Debug, Default)]
pub struct FakeDiscord {
    channels: HashMap<Snowflake, Option<Snowflake>>,
    /// Channel history, newest first
    history: HashMap<Snowflake, Vec<Message>>,
    messages: HashMap<Snowflake, Message>,
    reactors: HashMap<(Snowflake, EmojiRef), Vec<Snowflake>>,
    fail_reactions: bool,
    channel_calls: AtomicUsize,
    history_calls: AtomicUsize,
    reaction_calls: AtomicUsize,
    message_calls: AtomicUsize,
}

impl FakeDiscord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `GET /channels/{channel}` answers with `community`
    #[must_use]
    pub fn with_channel(mut self, channel: Snowflake, community: Option<Snowflake>) -> Self {
        self.channels.insert(channel, community);
        self
    }

    /// Channel history; sorted newest first before being served
    #[must_use]
    pub fn with_history(mut self, channel: Snowflake, mut messages: Vec<Message>) -> Self {
        messages.sort_by(|a, b| b.id.cmp(&a.id));
        for message in &messages {
            self.messages.insert(message.id, message.clone());
        }
        self.history.insert(channel, messages);
        self
    }

    /// A message served by `channel_message`
    #[must_use]
    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.insert(message.id, message);
        self
    }

    /// Users who reacted to `message` with `emoji`
    #[must_use]
    pub fn with_reactors(
        mut self,
        message: Snowflake,
        emoji: EmojiRef,
        mut users: Vec<Snowflake>,
    ) -> Self {
        users.sort();
        self.reactors.insert((message, emoji), users);
        self
    }

    /// Make every reactor lookup fail
    #[must_use]
    pub fn failing_reactions(mut self) -> Self {
        self.fail_reactions = true;
        self
    }

    pub fn channel_calls(&self) -> usize {
        self.channel_calls.load(Ordering::SeqCst)
    }

    pub fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }

    pub fn reaction_calls(&self) -> usize {
        self.reaction_calls.load(Ordering::SeqCst)
    }

    pub fn message_calls(&self) -> usize {
        self.message_calls.load(Ordering::SeqCst)
    }

    fn not_found(what: &str) -> DiscordError {
        DiscordError::Api {
            status: 404,
            message: format!("Unknown {what}"),
        }
    }
}

#[async_trait]
impl DiscordApi for FakeDiscord {
    async fn channel(&self, channel: Snowflake) -> DiscordResult<ChannelInfo> {
        self.channel_calls.fetch_add(1, Ordering::SeqCst);
        let guild_id = *self
            .channels
            .get(&channel)
            .ok_or_else(|| Self::not_found("Channel"))?;
        Ok(ChannelInfo {
            id: channel,
            guild_id,
            name: None,
        })
    }

    async fn channel_messages(
        &self,
        channel: Snowflake,
        before: Option<Snowflake>,
        limit: u8,
    ) -> DiscordResult<Vec<Message>> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        let history = self.history.get(&channel).map(Vec::as_slice).unwrap_or_default();
        Ok(history
            .iter()
            .filter(|m| before.map_or(true, |b| m.id < b))
            .take(usize::from(limit))
            .map(|m| Message {
                guild_id: None,
                ..m.clone()
            })
            .collect())
    }

    async fn message_reactions(
        &self,
        _channel: Snowflake,
        message: Snowflake,
        emoji: &EmojiRef,
        after: Option<Snowflake>,
        limit: u8,
    ) -> DiscordResult<Vec<UserPayload>> {
        self.reaction_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_reactions {
            return Err(DiscordError::Api {
                status: 500,
                message: "Internal Server Error".to_string(),
            });
        }
        let users = self
            .reactors
            .get(&(message, emoji.clone()))
            .map(Vec::as_slice)
            .unwrap_or_default();
        Ok(users
            .iter()
            .filter(|u| after.map_or(true, |a| **u > a))
            .take(usize::from(limit))
            .map(|&id| UserPayload {
                id,
                username: String::new(),
                bot: false,
            })
            .collect())
    }

    async fn channel_message(
        &self,
        _channel: Snowflake,
        message: Snowflake,
    ) -> DiscordResult<Message> {
        self.message_calls.fetch_add(1, Ordering::SeqCst);
        self.messages
            .get(&message)
            .cloned()
            .ok_or_else(|| Self::not_found("Message"))
    }
}

/// [`ImageProbe`] answering from a fixed table; unknown URLs fail
#[derive(Debug, Default, Clone)]
pub struct FakeProbe {
    sizes: Arc<HashMap<String, u64>>,
}

impl FakeProbe {
    pub fn new(sizes: impl IntoIterator<Item = (&'static str, u64)>) -> Self {
        Self {
            sizes: Arc::new(
                sizes
                    .into_iter()
                    .map(|(url, size)| (url.to_string(), size))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl ImageProbe for FakeProbe {
    async fn content_length(&self, url: &str) -> DiscordResult<u64> {
        self.sizes
            .get(url)
            .copied()
            .ok_or_else(|| DiscordError::MissingContentLength(url.to_string()))
    }
}

// === Engine harness ===

/// Community allowed by [`Harness`]
pub const COMMUNITY: u64 = 333;
/// Channel allowed by [`Harness`]
pub const CHANNEL: u64 = 222;
/// Content prefix [`Harness`] excludes
pub const EXCLUDE_PREFIX: &str = "!nomirror";

/// A [`SyncContext`] over a [`MemoryStore`] and fake collaborators
///
/// Scope: community 333, channel 222, content starting with `!nomirror`
/// excluded. The channel cache is prebuilt with 222 → 333.
pub struct Harness {
    pub ctx: SyncContext,
    pub store: MemoryStore,
    pub api: Arc<FakeDiscord>,
}

impl Harness {
    pub fn new(api: FakeDiscord, probe: FakeProbe) -> Self {
        Self::with_cache(
            api,
            probe,
            Some(ChannelCommunityCache::from_entries([(
                Snowflake::new(CHANNEL),
                Snowflake::new(COMMUNITY),
            )])),
        )
    }

    /// Like [`Harness::new`]; `None` leaves the cache to be built on READY
    pub fn with_cache(
        api: FakeDiscord,
        probe: FakeProbe,
        cache: Option<ChannelCommunityCache>,
    ) -> Self {
        let store = MemoryStore::new();
        let api = Arc::new(api);
        let scope = ScopeFilter::new(
            [Snowflake::new(COMMUNITY)],
            [Snowflake::new(CHANNEL)],
            Regex::new(&format!("^{EXCLUDE_PREFIX}")).ok(),
        );
        let mut builder = SyncContext::builder()
            .store(Arc::new(store.clone()))
            .api(api.clone())
            .probe(Arc::new(probe))
            .scope(scope);
        if let Some(cache) = cache {
            builder = builder.cache(cache);
        }
        let ctx = match builder.build() {
            Ok(ctx) => ctx,
            Err(e) => panic!("harness context: {e}"),
        };
        Self { ctx, store, api }
    }
}

// === Message builders ===

/// A message in `channel`/`community` by `author` with no media
pub fn message(id: u64, channel: u64, community: u64, author: u64) -> Message {
    Message {
        id: Snowflake::new(id),
        channel_id: Snowflake::new(channel),
        guild_id: Some(Snowflake::new(community)),
        author: Some(UserPayload {
            id: Snowflake::new(author),
            username: format!("user{author}"),
            bot: false,
        }),
        content: Some(String::new()),
        attachments: Some(Vec::new()),
        embeds: Some(Vec::new()),
        ..Default::default()
    }
}

/// An image attachment with the given size
pub fn image_attachment(id: u64, url: &str, width: u32, height: u32, size: u64) -> Attachment {
    Attachment {
        id: Snowflake::new(id),
        filename: format!("{id}.png"),
        url: url.to_string(),
        proxy_url: url.to_string(),
        size,
        width: Some(width),
        height: Some(height),
    }
}

/// A rich embed carrying an image
pub fn image_embed(url: &str, width: u32, height: u32) -> Embed {
    Embed {
        image: Some(EmbedImage {
            url: url.to_string(),
            proxy_url: None,
            width: Some(width),
            height: Some(height),
        }),
    }
}

/// A reaction summary for `emoji`
pub fn reaction(emoji: &EmojiRef, count: u32) -> ReactionCount {
    ReactionCount {
        count,
        emoji: PartialEmoji {
            id: emoji.discord_id(),
            name: Some(emoji.name().to_string()),
        },
    }
}

pub fn standard(name: &str) -> EmojiRef {
    EmojiRef::Standard {
        name: name.to_string(),
    }
}

pub fn custom(id: u64, name: &str) -> EmojiRef {
    EmojiRef::Custom {
        id: Snowflake::new(id),
        name: name.to_string(),
    }
}
