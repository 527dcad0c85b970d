//! Post reconciler
//!
//! Applies message create/update/delete events to the store. External data a
//! write needs (embed image sizes, reactor lists, re-fetched messages) is
//! gathered first; the unit of work then covers store writes only, so a
//! failed fetch leaves nothing behind.

use monicu_core::{
    DomainError, ImageRepository, NewImage, NewPost, Post, PostRepository, Snowflake, UnitOfWork,
};
use monicu_discord::Message;
use tracing::{debug, error, info, instrument};

use super::context::SyncContext;
use super::error::{SyncError, SyncResult};
use super::identity::IdentityResolver;
use super::pending::Promotion;
use super::reaction::{fetch_reactors, write_reaction, ReactionPlan};
use super::transaction::run_in_transaction;

/// What a reconciliation step did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// New rows were written
    Created,
    /// Existing rows were replaced
    Updated,
    /// Rows were removed
    Deleted,
    /// The target was already in the desired state
    Unchanged,
    /// The message is waiting for an edit that may add images
    Held,
    /// Out of scope, untracked, or nothing to act on
    Ignored,
}

/// Image row to write
#[derive(Debug, Clone, PartialEq, Eq)]
struct ImagePlan {
    url: String,
    width: u32,
    height: u32,
    size: u64,
}

impl ImagePlan {
    fn into_new(self, post_id: i64) -> NewImage {
        NewImage {
            post_id,
            url: self.url,
            width: self.width,
            height: self.height,
            size: self.size,
        }
    }
}

/// How an edit changes a post's image rows
#[derive(Debug)]
enum ImageChange {
    /// The payload lists the full image set
    Replace(Vec<ImagePlan>),
    /// The payload omitted attachments; stored images stay and new embed
    /// images are added
    Extend(Vec<ImagePlan>),
}

/// Everything needed to mirror one message
#[derive(Debug)]
struct CreatePlan {
    message_id: Snowflake,
    community: Snowflake,
    channel: Snowflake,
    author: Snowflake,
    content: String,
    images: Vec<ImagePlan>,
    reactions: Vec<ReactionPlan>,
}

/// Post reconciler
pub struct PostReconciler<'a> {
    ctx: &'a SyncContext,
}

impl<'a> PostReconciler<'a> {
    /// Create a new PostReconciler
    pub fn new(ctx: &'a SyncContext) -> Self {
        Self { ctx }
    }

    /// Community of a message: its own, else the channel cache
    fn community_of(&self, message: &Message) -> Option<Snowflake> {
        message
            .guild_id
            .or_else(|| self.ctx.cache().lookup(message.channel_id))
    }

    /// Carries an image and passes the scope filter
    pub fn is_trackable(&self, message: &Message, community: Snowflake) -> bool {
        message.has_images()
            && self
                .ctx
                .scope()
                .is_in_scope(community, message.channel_id, message.text())
    }

    /// Mirror a message
    ///
    /// Safe to call repeatedly for the same message: a second call finds the
    /// post already present and writes nothing.
    #[instrument(skip(self, message), fields(message_id = %message.id))]
    pub async fn create_post(&self, message: &Message) -> SyncResult<Reconciled> {
        let Some(community) = self.community_of(message) else {
            debug!(channel_id = %message.channel_id, "No community for message");
            return Ok(Reconciled::Ignored);
        };
        if !self.is_trackable(message, community) {
            debug!("Message not trackable");
            return Ok(Reconciled::Ignored);
        }
        let Some(author) = message.author.as_ref().map(|a| a.id) else {
            debug!("Message has no author");
            return Ok(Reconciled::Ignored);
        };

        let plan = CreatePlan {
            message_id: message.id,
            community,
            channel: message.channel_id,
            author,
            content: message.text().to_string(),
            images: self.plan_images(message).await?,
            reactions: self.plan_reactions(message).await?,
        };
        let (images, reactions) = (plan.images.len(), plan.reactions.len());

        let outcome = run_in_transaction(self.ctx.store(), self.ctx.shutdown(), move |tx| {
            Box::pin(apply_create(tx, plan))
        })
        .await?;

        match outcome {
            Reconciled::Created => info!(images, reactions, "Post created"),
            _ => debug!(outcome = ?outcome, "Post already mirrored"),
        }
        Ok(outcome)
    }

    /// Live MESSAGE_CREATE
    ///
    /// Checks for an existing post before fetching anything, and holds bare
    /// in-scope messages for a possible link-preview edit.
    #[instrument(skip(self, message), fields(message_id = %message.id))]
    pub async fn create_live(&self, message: Message) -> SyncResult<Reconciled> {
        let Some(community) = self.community_of(&message) else {
            debug!(channel_id = %message.channel_id, "No community for message");
            return Ok(Reconciled::Ignored);
        };

        if !self.is_trackable(&message, community) {
            let waits_for_embeds = message.is_bare()
                && message.author.is_some()
                && self
                    .ctx
                    .scope()
                    .is_in_scope(community, message.channel_id, message.text());
            if waits_for_embeds && self.ctx.pending().hold(message) {
                return Ok(Reconciled::Held);
            }
            debug!("Message not trackable");
            return Ok(Reconciled::Ignored);
        }

        if self.find_post(message.id).await?.is_some() {
            debug!("Post already mirrored");
            return Ok(Reconciled::Unchanged);
        }
        self.create_post(&message).await
    }

    /// Apply an edit
    ///
    /// A held message is promoted once an edit gives it images. An edit to a
    /// mirrored post replaces its image set and text, or deletes the post
    /// when it no longer qualifies. An edit to an unknown message that now
    /// qualifies is created from a fresh copy of the message. An update
    /// without attachments only adds embed images and never demotes.
    #[instrument(skip(self, message), fields(message_id = %message.id))]
    pub async fn update_post(&self, message: Message) -> SyncResult<Reconciled> {
        let message = match self.ctx.pending().promote(message) {
            Promotion::Ready(merged) => return self.create_live(merged).await,
            Promotion::StillPending => return Ok(Reconciled::Held),
            Promotion::NotPending(message) => message,
        };

        let Some(community) = self.community_of(&message) else {
            debug!(channel_id = %message.channel_id, "No community for message");
            return Ok(Reconciled::Ignored);
        };

        let Some(existing) = self.find_post(message.id).await? else {
            return self.create_late(message, community).await;
        };

        let text = message.content.as_deref().unwrap_or(&existing.content);
        let in_scope = self
            .ctx
            .scope()
            .is_in_scope(community, message.channel_id, text);
        // Without attachments the payload cannot show the post lost its images
        let trackable = in_scope && (!message.carries_attachments() || message.has_images());
        if !trackable {
            info!("Edited message no longer qualifies");
            return self.delete_post(message.id).await;
        }

        let planned = self.plan_images(&message).await?;
        let images = if message.carries_attachments() {
            ImageChange::Replace(planned)
        } else {
            ImageChange::Extend(planned)
        };
        let message_id = message.id;
        let content = message.content;

        let outcome = run_in_transaction(self.ctx.store(), self.ctx.shutdown(), move |tx| {
            Box::pin(apply_update(tx, message_id, images, content))
        })
        .await?;

        if outcome == Reconciled::Updated {
            info!("Post updated");
        }
        Ok(outcome)
    }

    /// Delete a post; a missing post is not an error
    #[instrument(skip(self))]
    pub async fn delete_post(&self, message_id: Snowflake) -> SyncResult<Reconciled> {
        if self.ctx.pending().take(message_id).is_some() {
            debug!("Dropped held message");
        }

        let deleted = run_in_transaction(self.ctx.store(), self.ctx.shutdown(), move |tx| {
            Box::pin(async move { Ok::<_, SyncError>(tx.delete_post(message_id).await?) })
        })
        .await?;

        if deleted {
            info!("Post deleted");
            Ok(Reconciled::Deleted)
        } else {
            debug!("No post to delete");
            Ok(Reconciled::Ignored)
        }
    }

    /// Delete each post independently, returning how many were removed
    ///
    /// A failure on one ID is logged and does not stop the rest; only
    /// cancellation aborts the batch.
    #[instrument(skip(self, message_ids), fields(count = message_ids.len()))]
    pub async fn delete_posts_bulk(&self, message_ids: &[Snowflake]) -> SyncResult<usize> {
        let mut deleted = 0;
        for &id in message_ids {
            match self.delete_post(id).await {
                Ok(Reconciled::Deleted) => deleted += 1,
                Ok(_) => {}
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => error!(message_id = %id, error = %e, "Failed to delete post"),
            }
        }
        Ok(deleted)
    }

    /// Read-only lookup in its own short unit of work
    async fn find_post(&self, message_id: Snowflake) -> SyncResult<Option<Post>> {
        run_in_transaction(self.ctx.store(), self.ctx.shutdown(), move |tx| {
            Box::pin(async move { Ok::<_, SyncError>(tx.find_post(message_id).await?) })
        })
        .await
    }

    /// An edit made an unknown message qualify
    ///
    /// Edit payloads may lack the author, so the full message is fetched.
    async fn create_late(&self, message: Message, community: Snowflake) -> SyncResult<Reconciled> {
        if !self.is_trackable(&message, community) {
            debug!("Edited message not trackable");
            return Ok(Reconciled::Ignored);
        }

        let fetched = self
            .ctx
            .shutdown()
            .guard(self.ctx.api().channel_message(message.channel_id, message.id))
            .await;
        let mut full = match fetched {
            Ok(full) => full,
            Err(SyncError::Discord(e)) if e.is_not_found() => {
                debug!("Edited message no longer exists");
                return Ok(Reconciled::Ignored);
            }
            Err(e) => return Err(e),
        };
        full.guild_id.get_or_insert(community);

        info!("Creating post from edited message");
        self.create_post(&full).await
    }

    /// Image rows for a message; embed images are sized with a HEAD request
    async fn plan_images(&self, message: &Message) -> SyncResult<Vec<ImagePlan>> {
        let mut images: Vec<ImagePlan> = message
            .image_attachments()
            .map(|a| ImagePlan {
                url: a.image_url().to_string(),
                width: a.width.unwrap_or(0),
                height: a.height.unwrap_or(0),
                size: a.size,
            })
            .collect();

        for embed in message.embed_images() {
            let url = embed.image_url();
            let size = self
                .ctx
                .shutdown()
                .guard(self.ctx.probe().content_length(url))
                .await?;
            images.push(ImagePlan {
                url: url.to_string(),
                width: embed.width.unwrap_or(0),
                height: embed.height.unwrap_or(0),
                size,
            });
        }
        Ok(images)
    }

    /// Reactions already on the message, with their full reactor lists
    async fn plan_reactions(&self, message: &Message) -> SyncResult<Vec<ReactionPlan>> {
        let mut plans = Vec::with_capacity(message.reactions.len());
        for reaction in &message.reactions {
            let Some(emoji) = reaction.emoji.to_ref() else {
                debug!("Skipping reaction without emoji");
                continue;
            };
            let users =
                fetch_reactors(self.ctx, message.channel_id, message.id, &emoji).await?;
            plans.push(ReactionPlan { emoji, users });
        }
        Ok(plans)
    }
}

async fn apply_create(tx: &mut dyn UnitOfWork, plan: CreatePlan) -> SyncResult<Reconciled> {
    let mut identities = IdentityResolver::new(&mut *tx);
    let channel_key = identities.channel_in(plan.community, plan.channel).await?;
    let user_key = identities.user(plan.author).await?;

    let new_post = NewPost::new(plan.message_id, channel_key, user_key, plan.content);
    let post = match tx.create_post(new_post).await {
        Ok(post) => post,
        Err(DomainError::PostAlreadyExists(_)) => return Ok(Reconciled::Unchanged),
        Err(e) => return Err(e.into()),
    };

    for image in plan.images {
        tx.create_image(image.into_new(post.id)).await?;
    }
    for reaction in &plan.reactions {
        write_reaction(&mut *tx, post.id, &reaction.emoji, &reaction.users).await?;
    }
    Ok(Reconciled::Created)
}

async fn apply_update(
    tx: &mut dyn UnitOfWork,
    message_id: Snowflake,
    images: ImageChange,
    content: Option<String>,
) -> SyncResult<Reconciled> {
    // Deleted since the pre-read
    let Some(post) = tx.find_post(message_id).await? else {
        return Ok(Reconciled::Ignored);
    };

    let mut changed = false;
    match images {
        ImageChange::Replace(images) => {
            tx.delete_images(post.id).await?;
            for image in images {
                tx.create_image(image.into_new(post.id)).await?;
            }
            changed = true;
        }
        ImageChange::Extend(images) => {
            let stored = tx.find_images(post.id).await?;
            for image in images {
                if stored.iter().all(|s| s.url != image.url) {
                    tx.create_image(image.into_new(post.id)).await?;
                    changed = true;
                }
            }
        }
    }
    if let Some(content) = content.filter(|c| *c != post.content) {
        tx.update_post_content(post.id, &content).await?;
        changed = true;
    }

    Ok(if changed {
        Reconciled::Updated
    } else {
        Reconciled::Unchanged
    })
}
