//! Channel history backfill
//!
//! On the first READY every tracked channel without any mirrored post has
//! its history walked newest to oldest, one page at a time. Each message goes
//! through the same create path as live traffic, so overlap with live events
//! is harmless.

use monicu_core::{PostRepository, Snowflake};
use monicu_discord::REST_PAGE_LIMIT;
use tokio::task::JoinSet;
use tracing::{error, info, instrument, warn};

use super::context::SyncContext;
use super::error::{SyncError, SyncResult};
use super::identity::IdentityResolver;
use super::post::{PostReconciler, Reconciled};
use super::transaction::run_in_transaction;

/// Outcome of backfilling one channel
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackfillReport {
    pub channel: Snowflake,
    /// The channel already had posts
    pub skipped: bool,
    pub pages: usize,
    pub messages: usize,
    pub created: usize,
    pub failed: usize,
}

/// Runs channel backfills, one task per channel
#[derive(Debug, Clone)]
pub struct BackfillCoordinator {
    ctx: SyncContext,
}

impl BackfillCoordinator {
    pub fn new(ctx: SyncContext) -> Self {
        Self { ctx }
    }

    /// Backfill each `(channel, community)` concurrently
    pub fn spawn(
        &self,
        targets: Vec<(Snowflake, Snowflake)>,
    ) -> JoinSet<SyncResult<BackfillReport>> {
        let mut tasks = JoinSet::new();
        for (channel, community) in targets {
            let coordinator = self.clone();
            tasks.spawn(async move { coordinator.backfill_channel(channel, community).await });
        }
        tasks
    }

    /// Walk one channel's history
    ///
    /// A message that fails is logged and counted, and the walk continues.
    /// Only shutdown or a failed page fetch ends it early.
    #[instrument(skip(self))]
    pub async fn backfill_channel(
        &self,
        channel: Snowflake,
        community: Snowflake,
    ) -> SyncResult<BackfillReport> {
        let mut report = BackfillReport {
            channel,
            ..Default::default()
        };

        let has_posts = run_in_transaction(self.ctx.store(), self.ctx.shutdown(), move |tx| {
            Box::pin(async move {
                let key = IdentityResolver::new(&mut *tx)
                    .channel_in(community, channel)
                    .await?;
                Ok::<_, SyncError>(tx.channel_has_posts(key).await?)
            })
        })
        .await?;
        if has_posts {
            info!("Channel already mirrored, skipping backfill");
            report.skipped = true;
            return Ok(report);
        }

        let reconciler = PostReconciler::new(&self.ctx);
        let mut before = None;
        loop {
            let page = self
                .ctx
                .shutdown()
                .guard(self.ctx.api().channel_messages(channel, before, REST_PAGE_LIMIT))
                .await?;
            report.pages += 1;
            report.messages += page.len();

            let full = page.len() >= usize::from(REST_PAGE_LIMIT);
            before = page.iter().map(|m| m.id).min();

            for mut message in page {
                message.guild_id.get_or_insert(community);
                match reconciler.create_post(&message).await {
                    Ok(Reconciled::Created) => report.created += 1,
                    Ok(_) => {}
                    Err(e) if e.is_cancelled() => return Err(e),
                    Err(e) => {
                        report.failed += 1;
                        warn!(message_id = %message.id, error = %e, "Failed to mirror message");
                    }
                }
            }

            if !full || before.is_none() {
                break;
            }
        }

        if report.failed > 0 {
            error!(failed = report.failed, "Backfill finished with failures");
        }
        info!(
            pages = report.pages,
            messages = report.messages,
            created = report.created,
            "Backfill complete"
        );
        Ok(report)
    }
}
