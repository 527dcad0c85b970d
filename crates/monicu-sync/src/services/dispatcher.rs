//! Gateway event dispatcher
//!
//! Routes each decoded gateway event to its reconciler, one event at a time.
//! Backfills started on READY run alongside in their own tasks.

use monicu_core::Snowflake;
use monicu_discord::{GatewayEvent, ReadyEvent};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

use super::backfill::{BackfillCoordinator, BackfillReport};
use super::context::SyncContext;
use super::error::{SyncError, SyncResult};
use super::identity::IdentityResolver;
use super::post::{PostReconciler, Reconciled};
use super::reaction::ReactionReconciler;
use super::transaction::run_in_transaction;

/// Dispatch gateway events to the reconcilers
pub struct EventDispatcher {
    ctx: SyncContext,
    ready_seen: bool,
    backfills: JoinSet<SyncResult<BackfillReport>>,
}

impl EventDispatcher {
    pub fn new(ctx: SyncContext) -> Self {
        Self {
            ctx,
            ready_seen: false,
            backfills: JoinSet::new(),
        }
    }

    pub fn context(&self) -> &SyncContext {
        &self.ctx
    }

    /// Apply one event
    pub async fn dispatch(&mut self, event: GatewayEvent) -> SyncResult<()> {
        let kind = event.event_type();
        let outcome = match event {
            GatewayEvent::Ready(ready) => {
                self.on_ready(&ready).await?;
                return Ok(());
            }
            GatewayEvent::MessageCreate(message) => {
                PostReconciler::new(&self.ctx).create_live(message).await?
            }
            GatewayEvent::MessageUpdate(message) => {
                PostReconciler::new(&self.ctx).update_post(message).await?
            }
            GatewayEvent::MessageDelete(event) => {
                PostReconciler::new(&self.ctx).delete_post(event.id).await?
            }
            GatewayEvent::MessageDeleteBulk(event) => {
                let deleted = PostReconciler::new(&self.ctx)
                    .delete_posts_bulk(&event.ids)
                    .await?;
                if deleted > 0 {
                    Reconciled::Deleted
                } else {
                    Reconciled::Ignored
                }
            }
            GatewayEvent::ReactionAdd(event) => {
                ReactionReconciler::new(&self.ctx).add_reaction(&event).await?
            }
            GatewayEvent::ReactionRemove(event) => {
                ReactionReconciler::new(&self.ctx)
                    .remove_reaction(&event)
                    .await?
            }
            GatewayEvent::ReactionRemoveAll(event) => {
                ReactionReconciler::new(&self.ctx)
                    .remove_all_reactions(&event)
                    .await?
            }
        };
        debug!(event = %kind, outcome = ?outcome, "Event applied");
        Ok(())
    }

    /// Apply one event, logging instead of returning failures
    pub async fn handle(&mut self, event: GatewayEvent) {
        let kind = event.event_type();
        match self.dispatch(event).await {
            Ok(()) => {}
            Err(e) if e.is_cancelled() => debug!(event = %kind, "Event cancelled by shutdown"),
            Err(e) => error!(event = %kind, code = e.error_code(), error = %e, "Event dropped"),
        }
    }

    /// Build the channel cache, create rows for the tracked channels, and
    /// start backfills; only the first READY of the process backfills
    #[instrument(skip(self, ready), fields(session_id = %ready.session_id))]
    async fn on_ready(&mut self, ready: &ReadyEvent) -> SyncResult<()> {
        let resolved = self
            .ctx
            .cache()
            .build(self.ctx.api(), self.ctx.scope().channels())
            .await;
        if self.ready_seen {
            debug!("Session re-established, backfill already started");
            return Ok(());
        }
        self.ready_seen = true;

        let targets: Vec<(Snowflake, Snowflake)> = self
            .ctx
            .scope()
            .channels()
            .iter()
            .filter_map(|&channel| {
                let community = self.ctx.cache().lookup(channel)?;
                if self.ctx.scope().allows(community, channel) {
                    Some((channel, community))
                } else {
                    warn!(channel_id = %channel, community_id = %community, "Channel outside tracked communities");
                    None
                }
            })
            .collect();

        let rows = targets.clone();
        run_in_transaction(self.ctx.store(), self.ctx.shutdown(), move |tx| {
            Box::pin(async move {
                let mut identities = IdentityResolver::new(tx);
                for (channel, community) in rows {
                    identities.channel_in(community, channel).await?;
                }
                Ok::<_, SyncError>(())
            })
        })
        .await?;

        info!(resolved, backfilling = targets.len(), "Ready");
        self.backfills = BackfillCoordinator::new(self.ctx.clone()).spawn(targets);
        Ok(())
    }

    fn record_backfill(
        joined: Result<SyncResult<BackfillReport>, tokio::task::JoinError>,
    ) -> Option<BackfillReport> {
        match joined {
            Ok(Ok(report)) => Some(report),
            Ok(Err(e)) if e.is_cancelled() => {
                debug!("Backfill cancelled by shutdown");
                None
            }
            Ok(Err(e)) => {
                error!(code = e.error_code(), error = %e, "Backfill aborted");
                None
            }
            Err(e) => {
                error!(error = %e, "Backfill task failed");
                None
            }
        }
    }

    /// Wait for every running backfill to finish
    pub async fn wait_for_backfills(&mut self) -> Vec<BackfillReport> {
        let mut reports = Vec::new();
        while let Some(joined) = self.backfills.join_next().await {
            reports.extend(Self::record_backfill(joined));
        }
        reports
    }

    /// Consume events until the channel closes or shutdown fires
    pub async fn run(mut self, mut events: mpsc::Receiver<GatewayEvent>) {
        let shutdown = self.ctx.shutdown().clone();
        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => {
                    info!("Shutdown requested, stopping dispatcher");
                    break;
                }
                Some(joined) = self.backfills.join_next(), if !self.backfills.is_empty() => {
                    Self::record_backfill(joined);
                }
                event = events.recv() => match event {
                    Some(event) => self.handle(event).await,
                    None => {
                        info!("Event stream closed");
                        break;
                    }
                },
            }
        }

        let reports = self.wait_for_backfills().await;
        info!(backfills = reports.len(), "Dispatcher stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{
        image_attachment, message, standard, FakeDiscord, FakeProbe, Harness, CHANNEL, COMMUNITY,
    };
    use monicu_discord::{
        Message, MessageDeleteBulkEvent, MessageDeleteEvent, MessageReactionEvent, PartialEmoji,
        UserPayload,
    };

    fn ready() -> GatewayEvent {
        GatewayEvent::Ready(ReadyEvent {
            v: 10,
            user: UserPayload {
                id: Snowflake::new(1),
                username: "mirror".to_string(),
                bot: true,
            },
            session_id: "session".to_string(),
            resume_gateway_url: None,
        })
    }

    fn tracked(id: u64) -> Message {
        let mut m = message(id, CHANNEL, COMMUNITY, 444);
        m.attachments = Some(vec![image_attachment(id, "u", 10, 10, 1)]);
        m
    }

    fn uncached(api: FakeDiscord) -> Harness {
        Harness::with_cache(api, FakeProbe::default(), None)
    }

    #[tokio::test]
    async fn test_ready_builds_cache_and_backfills() {
        let api = FakeDiscord::new()
            .with_channel(Snowflake::new(CHANNEL), Some(Snowflake::new(COMMUNITY)))
            .with_history(Snowflake::new(CHANNEL), vec![tracked(1), tracked(2)]);
        let h = uncached(api);
        let mut dispatcher = EventDispatcher::new(h.ctx.clone());

        dispatcher.dispatch(ready()).await.unwrap();
        let reports = dispatcher.wait_for_backfills().await;

        assert!(h.ctx.cache().is_built());
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].created, 2);
        let counts = h.store.counts().await;
        assert_eq!((counts.communities, counts.channels, counts.posts), (1, 1, 2));
    }

    #[tokio::test]
    async fn test_second_ready_does_not_backfill_again() {
        let api = FakeDiscord::new()
            .with_channel(Snowflake::new(CHANNEL), Some(Snowflake::new(COMMUNITY)))
            .with_history(Snowflake::new(CHANNEL), vec![tracked(1)]);
        let h = uncached(api);
        let mut dispatcher = EventDispatcher::new(h.ctx.clone());

        dispatcher.dispatch(ready()).await.unwrap();
        dispatcher.wait_for_backfills().await;
        dispatcher.dispatch(ready()).await.unwrap();
        let reports = dispatcher.wait_for_backfills().await;

        assert!(reports.is_empty());
        assert_eq!(h.api.history_calls(), 1);
        assert_eq!(h.api.channel_calls(), 1);
    }

    #[tokio::test]
    async fn test_unresolved_channel_is_not_backfilled() {
        let h = uncached(FakeDiscord::new());
        let mut dispatcher = EventDispatcher::new(h.ctx.clone());

        dispatcher.dispatch(ready()).await.unwrap();

        assert!(dispatcher.wait_for_backfills().await.is_empty());
        assert_eq!(h.store.counts().await.channels, 0);
    }

    #[tokio::test]
    async fn test_events_are_routed() {
        let h = Harness::new(FakeDiscord::new(), FakeProbe::default());
        let mut dispatcher = EventDispatcher::new(h.ctx.clone());

        dispatcher
            .dispatch(GatewayEvent::MessageCreate(tracked(1)))
            .await
            .unwrap();
        dispatcher
            .dispatch(GatewayEvent::MessageCreate(tracked(2)))
            .await
            .unwrap();
        dispatcher
            .dispatch(GatewayEvent::ReactionAdd(MessageReactionEvent {
                user_id: Snowflake::new(5),
                channel_id: Snowflake::new(CHANNEL),
                message_id: Snowflake::new(1),
                guild_id: None,
                emoji: PartialEmoji {
                    id: None,
                    name: Some(standard("👍").name().to_string()),
                },
            }))
            .await
            .unwrap();
        assert_eq!(h.store.counts().await.user_reactions, 1);

        dispatcher
            .dispatch(GatewayEvent::MessageDelete(MessageDeleteEvent {
                id: Snowflake::new(1),
                channel_id: Snowflake::new(CHANNEL),
                guild_id: None,
            }))
            .await
            .unwrap();
        dispatcher
            .dispatch(GatewayEvent::MessageDeleteBulk(MessageDeleteBulkEvent {
                ids: vec![Snowflake::new(2), Snowflake::new(3)],
                channel_id: Snowflake::new(CHANNEL),
                guild_id: None,
            }))
            .await
            .unwrap();

        let counts = h.store.counts().await;
        assert_eq!((counts.posts, counts.user_reactions), (0, 0));
    }

    #[tokio::test]
    async fn test_run_stops_on_closed_stream() {
        let h = Harness::new(FakeDiscord::new(), FakeProbe::default());
        let (tx, rx) = mpsc::channel(4);
        tx.send(GatewayEvent::MessageCreate(tracked(1))).await.unwrap();
        drop(tx);

        EventDispatcher::new(h.ctx.clone()).run(rx).await;

        assert_eq!(h.store.counts().await.posts, 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let h = Harness::new(FakeDiscord::new(), FakeProbe::default());
        let (_tx, rx) = mpsc::channel::<GatewayEvent>(4);
        let task = tokio::spawn(EventDispatcher::new(h.ctx.clone()).run(rx));

        h.ctx.shutdown().trigger();
        task.await.unwrap();
    }
}
