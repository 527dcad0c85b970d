//! Test fixtures and data generators

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use monicu_core::Snowflake;
use monicu_discord::Message;
use monicu_sync::services::testing::{image_attachment, image_embed, message};
use serde::Deserialize;

/// Counter for unique test data
static COUNTER: AtomicU64 = AtomicU64::new(1);

/// Snowflake unlikely to collide with rows left by earlier runs
///
/// Built from the current time like a real Discord ID, so IDs from one run
/// sort after those of the previous run.
pub fn unique_snowflake() -> Snowflake {
    let millis = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
    let since_epoch = millis.saturating_sub(Snowflake::EPOCH);
    Snowflake::new((since_epoch << 22) | (COUNTER.fetch_add(1, Ordering::SeqCst) & 0x3F_FFFF))
}

/// A gallery post: text plus one uploaded image
pub fn upload(id: u64, channel: u64, community: u64, author: u64, text: &str) -> Message {
    let mut m = message(id, channel, community, author);
    m.content = Some(text.to_string());
    m.attachments = Some(vec![image_attachment(id, &format!("https://media/{id}.png"), 800, 600, 4096)]);
    m
}

/// A link whose preview embed carries an image
pub fn link_preview(id: u64, channel: u64, community: u64, author: u64, url: &str) -> Message {
    let mut m = message(id, channel, community, author);
    m.content = Some(url.to_string());
    m.embeds = Some(vec![image_embed(url, 1200, 630)]);
    m
}

/// Post as returned by the listings
#[derive(Debug, Deserialize)]
pub struct PostJson {
    pub id: String,
    pub channel: String,
    pub community: String,
    pub user: String,
    pub content: String,
    pub images: Vec<ImageJson>,
    pub reactions: Vec<ReactionJson>,
    pub reaction_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct ImageJson {
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub size: u64,
}

#[derive(Debug, Deserialize)]
pub struct ReactionJson {
    pub emoji: String,
    pub count: i64,
}

/// Error body returned by the API
#[derive(Debug, Deserialize)]
pub struct ErrorJson {
    pub error: ErrorDetailJson,
}

#[derive(Debug, Deserialize)]
pub struct ErrorDetailJson {
    pub code: String,
    pub message: String,
}
