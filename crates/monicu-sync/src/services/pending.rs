//! Deferred-edit-await
//!
//! A message created without attachments or embeds may gain a link preview
//! through a later edit. Such messages are held here for a short window; an
//! edit that brings images promotes the snapshot to a regular create.

use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use monicu_core::Snowflake;
use monicu_discord::Message;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use super::shutdown::Shutdown;

/// Outcome of offering an edit to the pending table
#[derive(Debug)]
pub enum Promotion {
    /// The merged snapshot now carries images
    Ready(Message),
    /// The message is still held; the edit was merged into it
    StillPending,
    /// The message was not held (or its window had passed); the edit is
    /// handed back untouched
    NotPending(Message),
}

#[derive(Debug)]
struct PendingEntry {
    message: Message,
    deadline: Instant,
}

/// Message ID → (snapshot, deadline), expired by a single sweeper task
#[derive(Clone, Debug)]
pub struct PendingEdits {
    entries: Arc<DashMap<Snowflake, PendingEntry>>,
    window: Duration,
}

impl PendingEdits {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            window,
        }
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Hold a message until the window passes; `false` if already held
    pub fn hold(&self, message: Message) -> bool {
        match self.entries.entry(message.id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                debug!(message_id = %message.id, window_ms = self.window.as_millis() as u64, "Holding message for edits");
                slot.insert(PendingEntry {
                    message,
                    deadline: Instant::now() + self.window,
                });
                true
            }
        }
    }

    /// Merge an edit into a held message
    pub fn promote(&self, update: Message) -> Promotion {
        let Entry::Occupied(mut slot) = self.entries.entry(update.id) else {
            return Promotion::NotPending(update);
        };
        if slot.get().deadline <= Instant::now() {
            slot.remove();
            return Promotion::NotPending(update);
        }

        slot.get_mut().message.merge_update(update);
        if slot.get().message.has_images() {
            let entry = slot.remove();
            debug!(message_id = %entry.message.id, "Held message gained images");
            Promotion::Ready(entry.message)
        } else {
            Promotion::StillPending
        }
    }

    /// Remove a held message (e.g. when it is deleted)
    pub fn take(&self, id: Snowflake) -> Option<Message> {
        self.entries.remove(&id).map(|(_, entry)| entry.message)
    }

    /// Drop every entry whose window has passed, returning how many went
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|id, entry| {
            let keep = entry.deadline > now;
            if !keep {
                debug!(message_id = %id, "Held message expired untracked");
            }
            keep
        });
        before.saturating_sub(self.entries.len())
    }

    #[must_use]
    pub fn contains(&self, id: Snowflake) -> bool {
        self.entries.contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sweep periodically until shutdown
    pub fn spawn_sweeper(&self, shutdown: Shutdown) -> JoinHandle<()> {
        let pending = self.clone();
        let period = (self.window / 2).max(Duration::from_millis(100));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        pending.sweep();
                    }
                }
            }
            debug!(held = pending.len(), "Pending edit sweeper stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use monicu_discord::{Embed, EmbedImage};

    fn bare(id: u64) -> Message {
        Message {
            id: Snowflake::new(id),
            channel_id: Snowflake::new(222),
            content: Some("https://example.com/cat".to_string()),
            ..Default::default()
        }
    }

    fn embed_update(id: u64) -> Message {
        Message {
            id: Snowflake::new(id),
            channel_id: Snowflake::new(222),
            embeds: Some(vec![Embed {
                image: Some(EmbedImage {
                    url: "https://example.com/cat.png".to_string(),
                    ..Default::default()
                }),
            }]),
            ..Default::default()
        }
    }

    #[test]
    fn test_hold_once() {
        let pending = PendingEdits::new(Duration::from_secs(10));
        assert!(pending.hold(bare(1)));
        assert!(!pending.hold(bare(1)));
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test]
    async fn test_promote_with_images() {
        let pending = PendingEdits::new(Duration::from_secs(10));
        pending.hold(bare(1));

        match pending.promote(embed_update(1)) {
            Promotion::Ready(message) => {
                assert!(message.has_images());
                assert_eq!(message.text(), "https://example.com/cat");
            }
            other => panic!("unexpected promotion {other:?}"),
        }
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_edit_without_images_keeps_waiting() {
        let pending = PendingEdits::new(Duration::from_secs(10));
        pending.hold(bare(1));

        let mut update = bare(1);
        update.content = Some("edited".to_string());
        assert!(matches!(pending.promote(update), Promotion::StillPending));
        assert!(pending.contains(Snowflake::new(1)));
        assert_eq!(pending.take(Snowflake::new(1)).unwrap().text(), "edited");
    }

    #[tokio::test]
    async fn test_expired_entries_are_not_promoted() {
        let pending = PendingEdits::new(Duration::ZERO);
        pending.hold(bare(1));
        assert!(matches!(pending.promote(embed_update(1)), Promotion::NotPending(_)));
        assert!(pending.is_empty());
        assert!(matches!(pending.promote(embed_update(2)), Promotion::NotPending(_)));
    }

    #[tokio::test]
    async fn test_sweep() {
        let pending = PendingEdits::new(Duration::ZERO);
        pending.hold(bare(1));
        pending.hold(bare(2));
        assert_eq!(pending.sweep(), 2);
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_sweeper_stops_on_shutdown() {
        let pending = PendingEdits::new(Duration::from_millis(10));
        let shutdown = Shutdown::new();
        pending.hold(bare(1));
        let handle = pending.spawn_sweeper(shutdown.clone());

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(pending.is_empty());

        shutdown.trigger();
        handle.await.unwrap();
    }
}
