//! Reaction reconciler

use monicu_core::{
    EmojiRef, EmojiRepository, PostRepository, ReactionRepository, Snowflake, UnitOfWork,
    UserReactionRepository, UserRepository,
};
use monicu_discord::{MessageReactionEvent, MessageReactionRemoveAllEvent, REST_PAGE_LIMIT};
use tracing::{debug, info, instrument};

use super::context::SyncContext;
use super::error::{SyncError, SyncResult};
use super::identity::IdentityResolver;
use super::post::Reconciled;
use super::transaction::run_in_transaction;

/// One emoji and everyone who reacted with it
#[derive(Debug, Clone)]
pub(crate) struct ReactionPlan {
    pub emoji: EmojiRef,
    pub users: Vec<Snowflake>,
}

/// State of a message's reaction aggregate before an add
enum AddTarget {
    /// The message is not mirrored
    Untracked,
    /// Mirrored, but this emoji has never been recorded on it
    FirstSeen,
    /// Aggregate exists; only the event's user needs linking
    Known,
}

/// Every user who reacted to `message` with `emoji`, in ID order
///
/// Pages through the reactor list with an `after` cursor until a short page.
#[instrument(skip(ctx, emoji), fields(emoji = %emoji.api_name()))]
pub(crate) async fn fetch_reactors(
    ctx: &SyncContext,
    channel: Snowflake,
    message: Snowflake,
    emoji: &EmojiRef,
) -> SyncResult<Vec<Snowflake>> {
    let mut users = Vec::new();
    let mut after = None;
    loop {
        let page = ctx
            .shutdown()
            .guard(ctx.api().message_reactions(
                channel,
                message,
                emoji,
                after,
                REST_PAGE_LIMIT,
            ))
            .await?;
        let full = page.len() >= usize::from(REST_PAGE_LIMIT);
        after = page.iter().map(|u| u.id).max();
        users.extend(page.into_iter().map(|u| u.id));
        if !full || after.is_none() {
            break;
        }
    }
    debug!(count = users.len(), "Fetched reactors");
    Ok(users)
}

/// Record `users` under the `emoji` aggregate of `post_key`
///
/// Returns how many user links were new.
pub(crate) async fn write_reaction(
    tx: &mut dyn UnitOfWork,
    post_key: i64,
    emoji: &EmojiRef,
    users: &[Snowflake],
) -> SyncResult<usize> {
    let emoji_key = tx.find_or_create_emoji(emoji).await?;
    let reaction_key = tx.find_or_create_reaction(post_key, emoji_key).await?;

    let mut added = 0;
    for &user in users {
        let user_key = IdentityResolver::new(&mut *tx).user(user).await?;
        if tx.create_user_reaction(reaction_key, user_key).await? {
            added += 1;
        }
    }
    Ok(added)
}

/// Reaction reconciler
pub struct ReactionReconciler<'a> {
    ctx: &'a SyncContext,
}

impl<'a> ReactionReconciler<'a> {
    /// Create a new ReactionReconciler
    pub fn new(ctx: &'a SyncContext) -> Self {
        Self { ctx }
    }

    /// Community and channel pass the allow-lists
    fn in_scope(&self, channel: Snowflake, guild: Option<Snowflake>) -> bool {
        guild
            .or_else(|| self.ctx.cache().lookup(channel))
            .is_some_and(|community| self.ctx.scope().allows(community, channel))
    }

    /// Record one user's reaction
    ///
    /// The first reaction seen for an emoji on a post fetches the full
    /// reactor list, since earlier reactions may have been missed.
    #[instrument(skip(self, event), fields(message_id = %event.message_id, user_id = %event.user_id))]
    pub async fn add_reaction(&self, event: &MessageReactionEvent) -> SyncResult<Reconciled> {
        if !self.in_scope(event.channel_id, event.guild_id) {
            return Ok(Reconciled::Ignored);
        }
        let Some(emoji) = event.emoji.to_ref() else {
            debug!("Reaction without emoji");
            return Ok(Reconciled::Ignored);
        };

        let message_id = event.message_id;
        let probe = emoji.clone();
        let target = run_in_transaction(self.ctx.store(), self.ctx.shutdown(), move |tx| {
            Box::pin(read_target(tx, message_id, probe))
        })
        .await?;

        let mut users = match target {
            AddTarget::Untracked => {
                debug!("Reaction on untracked message");
                return Ok(Reconciled::Ignored);
            }
            AddTarget::FirstSeen => {
                fetch_reactors(self.ctx, event.channel_id, message_id, &emoji).await?
            }
            AddTarget::Known => Vec::new(),
        };
        if !users.contains(&event.user_id) {
            users.push(event.user_id);
        }

        let plan = ReactionPlan { emoji, users };
        let outcome = run_in_transaction(self.ctx.store(), self.ctx.shutdown(), move |tx| {
            Box::pin(apply_add(tx, message_id, plan))
        })
        .await?;

        debug!(outcome = ?outcome, "Reaction added");
        Ok(outcome)
    }

    /// Remove one user's reaction; the emoji aggregate is kept even if empty
    #[instrument(skip(self, event), fields(message_id = %event.message_id, user_id = %event.user_id))]
    pub async fn remove_reaction(&self, event: &MessageReactionEvent) -> SyncResult<Reconciled> {
        if !self.in_scope(event.channel_id, event.guild_id) {
            return Ok(Reconciled::Ignored);
        }
        let Some(emoji) = event.emoji.to_ref() else {
            debug!("Reaction without emoji");
            return Ok(Reconciled::Ignored);
        };

        let (message_id, user_id) = (event.message_id, event.user_id);
        let outcome = run_in_transaction(self.ctx.store(), self.ctx.shutdown(), move |tx| {
            Box::pin(apply_remove(tx, message_id, emoji, user_id))
        })
        .await?;

        debug!(outcome = ?outcome, "Reaction removal applied");
        Ok(outcome)
    }

    /// Drop every reaction aggregate on a message
    #[instrument(skip(self, event), fields(message_id = %event.message_id))]
    pub async fn remove_all_reactions(
        &self,
        event: &MessageReactionRemoveAllEvent,
    ) -> SyncResult<Reconciled> {
        if !self.in_scope(event.channel_id, event.guild_id) {
            return Ok(Reconciled::Ignored);
        }

        let message_id = event.message_id;
        let removed = run_in_transaction(self.ctx.store(), self.ctx.shutdown(), move |tx| {
            Box::pin(async move {
                let Some(post) = tx.find_post(message_id).await? else {
                    return Ok::<_, SyncError>(None);
                };
                Ok(Some(tx.delete_reactions(post.id).await?))
            })
        })
        .await?;

        match removed {
            Some(count) => {
                info!(count, "Reactions cleared");
                Ok(Reconciled::Deleted)
            }
            None => {
                debug!("Reactions cleared on untracked message");
                Ok(Reconciled::Ignored)
            }
        }
    }
}

async fn read_target(
    tx: &mut dyn UnitOfWork,
    message_id: Snowflake,
    emoji: EmojiRef,
) -> SyncResult<AddTarget> {
    let Some(post) = tx.find_post(message_id).await? else {
        return Ok(AddTarget::Untracked);
    };
    let Some(emoji) = tx.find_emoji(&emoji).await? else {
        return Ok(AddTarget::FirstSeen);
    };
    match tx.find_reaction(post.id, emoji.id).await? {
        Some(_) => Ok(AddTarget::Known),
        None => Ok(AddTarget::FirstSeen),
    }
}

async fn apply_add(
    tx: &mut dyn UnitOfWork,
    message_id: Snowflake,
    plan: ReactionPlan,
) -> SyncResult<Reconciled> {
    // Deleted between the read and the write
    let Some(post) = tx.find_post(message_id).await? else {
        return Ok(Reconciled::Ignored);
    };
    let added = write_reaction(tx, post.id, &plan.emoji, &plan.users).await?;
    Ok(if added > 0 {
        Reconciled::Created
    } else {
        Reconciled::Unchanged
    })
}

async fn apply_remove(
    tx: &mut dyn UnitOfWork,
    message_id: Snowflake,
    emoji: EmojiRef,
    user_id: Snowflake,
) -> SyncResult<Reconciled> {
    let Some(post) = tx.find_post(message_id).await? else {
        debug!("Removal on untracked message");
        return Ok(Reconciled::Ignored);
    };
    let Some(emoji) = tx.find_emoji(&emoji).await? else {
        debug!("Removal of unknown emoji");
        return Ok(Reconciled::Ignored);
    };
    let Some(reaction) = tx.find_reaction(post.id, emoji.id).await? else {
        debug!("Removal without aggregate");
        return Ok(Reconciled::Ignored);
    };
    let Some(user) = tx.find_user(user_id).await? else {
        debug!("Removal by unknown user");
        return Ok(Reconciled::Ignored);
    };

    if tx.delete_user_reaction(reaction.id, user.id).await? {
        Ok(Reconciled::Deleted)
    } else {
        Ok(Reconciled::Ignored)
    }
}
