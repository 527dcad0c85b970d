//! In-process store
//!
//! Implements the same traits as the PostgreSQL store with the same
//! uniqueness and cascade rules. A unit of work locks the tables for its
//! lifetime and edits a private copy; `commit` publishes the copy, while
//! `rollback` or drop discards it. Used by the sync and API test suites and
//! for running the engine without a database.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use monicu_core::entities::{
    Channel, Community, Emoji, EmojiRef, Image, NewImage, NewPost, Post, PostSummary, Reaction,
    ReactionTally, User, UserReaction,
};
use monicu_core::error::DomainError;
use monicu_core::traits::{
    ChannelRepository, CommunityRepository, EmojiRepository, ImageRepository, PostQuery,
    PostRepository, ReactionRepository, RepoResult, Store, UnitOfWork, UserReactionRepository,
    UserRepository,
};
use monicu_core::value_objects::Snowflake;

#[derive(Debug, Clone, Default)]
struct Tables {
    last_id: i64,
    communities: Vec<Community>,
    channels: Vec<Channel>,
    users: Vec<User>,
    posts: Vec<Post>,
    images: Vec<Image>,
    emojis: Vec<Emoji>,
    reactions: Vec<Reaction>,
    user_reactions: Vec<UserReaction>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn delete_reactions_where(&mut self, keep: impl Fn(&Reaction) -> bool) -> u64 {
        let removed: HashSet<i64> = self
            .reactions
            .iter()
            .filter(|r| !keep(r))
            .map(|r| r.id)
            .collect();
        self.reactions.retain(|r| !removed.contains(&r.id));
        self.user_reactions
            .retain(|ur| !removed.contains(&ur.reaction_id));
        removed.len() as u64
    }

    fn summary(&self, post: &Post) -> Option<PostSummary> {
        let channel = self.channels.iter().find(|c| c.id == post.channel_id)?;
        let community = self
            .communities
            .iter()
            .find(|c| c.id == channel.community_id)?;
        let user = self.users.iter().find(|u| u.id == post.user_id)?;

        let images = self
            .images
            .iter()
            .filter(|i| i.post_id == post.id)
            .cloned()
            .collect();

        let mut reactors = HashSet::new();
        let mut reactions = Vec::new();
        for reaction in self.reactions.iter().filter(|r| r.post_id == post.id) {
            let users: Vec<i64> = self
                .user_reactions
                .iter()
                .filter(|ur| ur.reaction_id == reaction.id)
                .map(|ur| ur.user_id)
                .collect();
            if users.is_empty() {
                continue;
            }
            let Some(emoji) = self.emojis.iter().find(|e| e.id == reaction.emoji_id) else {
                continue;
            };
            reactions.push(ReactionTally {
                emoji: emoji.name.clone(),
                emoji_id: emoji.discord_id,
                count: users.len() as i64,
            });
            reactors.extend(users);
        }
        reactions.sort_by(|a, b| b.count.cmp(&a.count));

        Some(PostSummary {
            id: post.discord_id,
            channel: channel.discord_id,
            community: community.discord_id,
            user: user.discord_id,
            content: post.content.clone(),
            created_at: post.discord_id.created_at(),
            images,
            reactions,
            reaction_count: reactors.len() as i64,
        })
    }
}

/// Row counts per table, for assertions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableCounts {
    pub communities: usize,
    pub channels: usize,
    pub users: usize,
    pub posts: usize,
    pub images: usize,
    pub emojis: usize,
    pub reactions: usize,
    pub user_reactions: usize,
}

/// In-process implementation of Store and PostQuery
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Count committed rows
    pub async fn counts(&self) -> TableCounts {
        let tables = self.tables.lock().await;
        TableCounts {
            communities: tables.communities.len(),
            channels: tables.channels.len(),
            users: tables.users.len(),
            posts: tables.posts.len(),
            images: tables.images.len(),
            emojis: tables.emojis.len(),
            reactions: tables.reactions.len(),
            user_reactions: tables.user_reactions.len(),
        }
    }

    /// Committed summary of one post, if mirrored
    pub async fn post_summary(&self, discord_id: Snowflake) -> Option<PostSummary> {
        let tables = self.tables.lock().await;
        let post = tables.posts.iter().find(|p| p.discord_id == discord_id)?;
        tables.summary(post)
    }

    async fn list(
        &self,
        limit: i64,
        offset: i64,
        order: fn(&PostSummary, &PostSummary) -> std::cmp::Ordering,
    ) -> Vec<PostSummary> {
        let tables = self.tables.lock().await;
        let mut summaries: Vec<PostSummary> = tables
            .posts
            .iter()
            .filter_map(|post| tables.summary(post))
            .collect();
        summaries.sort_by(order);

        let offset = usize::try_from(offset.max(0)).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit.clamp(1, 100)).unwrap_or(100);
        summaries.into_iter().skip(offset).take(limit).collect()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> RepoResult<Box<dyn UnitOfWork>> {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryUnitOfWork {
            guard: Some(guard),
            working,
        }))
    }
}

#[async_trait]
impl PostQuery for MemoryStore {
    async fn recent_posts(&self, limit: i64, offset: i64) -> RepoResult<Vec<PostSummary>> {
        Ok(self
            .list(limit, offset, |a, b| b.id.cmp(&a.id))
            .await)
    }

    async fn top_posts(&self, limit: i64, offset: i64) -> RepoResult<Vec<PostSummary>> {
        Ok(self
            .list(limit, offset, |a, b| {
                b.reaction_count
                    .cmp(&a.reaction_count)
                    .then_with(|| b.id.cmp(&a.id))
            })
            .await)
    }

    async fn count_posts(&self) -> RepoResult<i64> {
        Ok(self.tables.lock().await.posts.len() as i64)
    }

    async fn ping(&self) -> RepoResult<()> {
        Ok(())
    }
}

/// Unit of work over a [`MemoryStore`]
pub struct MemoryUnitOfWork {
    guard: Option<OwnedMutexGuard<Tables>>,
    working: Tables,
}

impl MemoryUnitOfWork {
    fn tables(&mut self) -> RepoResult<&mut Tables> {
        if self.guard.is_none() {
            return Err(DomainError::TransactionFinished);
        }
        Ok(&mut self.working)
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn commit(&mut self) -> RepoResult<()> {
        let mut guard = self.guard.take().ok_or(DomainError::TransactionFinished)?;
        *guard = std::mem::take(&mut self.working);
        Ok(())
    }

    async fn rollback(&mut self) -> RepoResult<()> {
        self.guard.take().ok_or(DomainError::TransactionFinished)?;
        self.working = Tables::default();
        Ok(())
    }
}

#[async_trait]
impl CommunityRepository for MemoryUnitOfWork {
    async fn find_community(&mut self, discord_id: Snowflake) -> RepoResult<Option<Community>> {
        let tables = self.tables()?;
        Ok(tables
            .communities
            .iter()
            .find(|c| c.discord_id == discord_id)
            .copied())
    }

    async fn find_or_create_community(&mut self, discord_id: Snowflake) -> RepoResult<i64> {
        let tables = self.tables()?;
        if let Some(c) = tables.communities.iter().find(|c| c.discord_id == discord_id) {
            return Ok(c.id);
        }
        let id = tables.next_id();
        tables.communities.push(Community { id, discord_id });
        Ok(id)
    }
}

#[async_trait]
impl ChannelRepository for MemoryUnitOfWork {
    async fn find_channel(&mut self, discord_id: Snowflake) -> RepoResult<Option<Channel>> {
        let tables = self.tables()?;
        Ok(tables
            .channels
            .iter()
            .find(|c| c.discord_id == discord_id)
            .copied())
    }

    async fn find_or_create_channel(
        &mut self,
        discord_id: Snowflake,
        community_id: i64,
    ) -> RepoResult<i64> {
        let tables = self.tables()?;
        if let Some(c) = tables.channels.iter().find(|c| c.discord_id == discord_id) {
            return Ok(c.id);
        }
        if !tables.communities.iter().any(|c| c.id == community_id) {
            return Err(DomainError::DatabaseError(format!(
                "channel {discord_id} references missing community {community_id}"
            )));
        }
        let id = tables.next_id();
        tables.channels.push(Channel {
            id,
            discord_id,
            community_id,
        });
        Ok(id)
    }
}

#[async_trait]
impl UserRepository for MemoryUnitOfWork {
    async fn find_user(&mut self, discord_id: Snowflake) -> RepoResult<Option<User>> {
        let tables = self.tables()?;
        Ok(tables
            .users
            .iter()
            .find(|u| u.discord_id == discord_id)
            .copied())
    }

    async fn find_or_create_user(&mut self, discord_id: Snowflake) -> RepoResult<i64> {
        let tables = self.tables()?;
        if let Some(u) = tables.users.iter().find(|u| u.discord_id == discord_id) {
            return Ok(u.id);
        }
        let id = tables.next_id();
        tables.users.push(User { id, discord_id });
        Ok(id)
    }
}

#[async_trait]
impl PostRepository for MemoryUnitOfWork {
    async fn find_post(&mut self, discord_id: Snowflake) -> RepoResult<Option<Post>> {
        let tables = self.tables()?;
        Ok(tables
            .posts
            .iter()
            .find(|p| p.discord_id == discord_id)
            .cloned())
    }

    async fn create_post(&mut self, post: NewPost) -> RepoResult<Post> {
        let tables = self.tables()?;
        if tables.posts.iter().any(|p| p.discord_id == post.discord_id) {
            return Err(DomainError::PostAlreadyExists(post.discord_id));
        }
        if !tables.channels.iter().any(|c| c.id == post.channel_id)
            || !tables.users.iter().any(|u| u.id == post.user_id)
        {
            return Err(DomainError::DatabaseError(format!(
                "post {} references a missing channel or user",
                post.discord_id
            )));
        }
        let id = tables.next_id();
        let post = post.into_post(id);
        tables.posts.push(post.clone());
        Ok(post)
    }

    async fn update_post_content(&mut self, post_id: i64, content: &str) -> RepoResult<()> {
        let tables = self.tables()?;
        if let Some(post) = tables.posts.iter_mut().find(|p| p.id == post_id) {
            post.content = content.to_string();
        }
        Ok(())
    }

    async fn delete_post(&mut self, discord_id: Snowflake) -> RepoResult<bool> {
        let tables = self.tables()?;
        let Some(index) = tables.posts.iter().position(|p| p.discord_id == discord_id) else {
            return Ok(false);
        };
        let post = tables.posts.remove(index);
        tables.images.retain(|i| i.post_id != post.id);
        tables.delete_reactions_where(|r| r.post_id != post.id);
        Ok(true)
    }

    async fn channel_has_posts(&mut self, channel_id: i64) -> RepoResult<bool> {
        let tables = self.tables()?;
        Ok(tables.posts.iter().any(|p| p.channel_id == channel_id))
    }

    async fn count_channel_posts(&mut self, channel_id: i64) -> RepoResult<i64> {
        let tables = self.tables()?;
        Ok(tables
            .posts
            .iter()
            .filter(|p| p.channel_id == channel_id)
            .count() as i64)
    }
}

#[async_trait]
impl ImageRepository for MemoryUnitOfWork {
    async fn create_image(&mut self, image: NewImage) -> RepoResult<Image> {
        let tables = self.tables()?;
        if !tables.posts.iter().any(|p| p.id == image.post_id) {
            return Err(DomainError::DatabaseError(format!(
                "image references missing post {}",
                image.post_id
            )));
        }
        let id = tables.next_id();
        let image = image.into_image(id);
        tables.images.push(image.clone());
        Ok(image)
    }

    async fn find_images(&mut self, post_id: i64) -> RepoResult<Vec<Image>> {
        let tables = self.tables()?;
        Ok(tables
            .images
            .iter()
            .filter(|i| i.post_id == post_id)
            .cloned()
            .collect())
    }

    async fn delete_images(&mut self, post_id: i64) -> RepoResult<u64> {
        let tables = self.tables()?;
        let before = tables.images.len();
        tables.images.retain(|i| i.post_id != post_id);
        Ok((before - tables.images.len()) as u64)
    }
}

fn emoji_matches(emoji: &Emoji, key: &EmojiRef) -> bool {
    match key {
        EmojiRef::Custom { id, .. } => emoji.discord_id == Some(*id),
        EmojiRef::Standard { name } => emoji.discord_id.is_none() && emoji.name == *name,
    }
}

#[async_trait]
impl EmojiRepository for MemoryUnitOfWork {
    async fn find_emoji(&mut self, emoji: &EmojiRef) -> RepoResult<Option<Emoji>> {
        let tables = self.tables()?;
        Ok(tables
            .emojis
            .iter()
            .find(|e| emoji_matches(e, emoji))
            .cloned())
    }

    async fn find_or_create_emoji(&mut self, emoji: &EmojiRef) -> RepoResult<i64> {
        let tables = self.tables()?;
        if let Some(e) = tables.emojis.iter().find(|e| emoji_matches(e, emoji)) {
            return Ok(e.id);
        }
        let id = tables.next_id();
        tables.emojis.push(Emoji {
            id,
            discord_id: emoji.discord_id(),
            name: emoji.name().to_string(),
        });
        Ok(id)
    }
}

#[async_trait]
impl ReactionRepository for MemoryUnitOfWork {
    async fn find_reaction(&mut self, post_id: i64, emoji_id: i64) -> RepoResult<Option<Reaction>> {
        let tables = self.tables()?;
        Ok(tables
            .reactions
            .iter()
            .find(|r| r.post_id == post_id && r.emoji_id == emoji_id)
            .copied())
    }

    async fn find_or_create_reaction(&mut self, post_id: i64, emoji_id: i64) -> RepoResult<i64> {
        let tables = self.tables()?;
        if let Some(r) = tables
            .reactions
            .iter()
            .find(|r| r.post_id == post_id && r.emoji_id == emoji_id)
        {
            return Ok(r.id);
        }
        if !tables.posts.iter().any(|p| p.id == post_id)
            || !tables.emojis.iter().any(|e| e.id == emoji_id)
        {
            return Err(DomainError::DatabaseError(format!(
                "reaction references missing post {post_id} or emoji {emoji_id}"
            )));
        }
        let id = tables.next_id();
        tables.reactions.push(Reaction {
            id,
            post_id,
            emoji_id,
        });
        Ok(id)
    }

    async fn delete_reactions(&mut self, post_id: i64) -> RepoResult<u64> {
        let tables = self.tables()?;
        Ok(tables.delete_reactions_where(|r| r.post_id != post_id))
    }
}

#[async_trait]
impl UserReactionRepository for MemoryUnitOfWork {
    async fn create_user_reaction(&mut self, reaction_id: i64, user_id: i64) -> RepoResult<bool> {
        let tables = self.tables()?;
        if tables
            .user_reactions
            .iter()
            .any(|ur| ur.reaction_id == reaction_id && ur.user_id == user_id)
        {
            return Ok(false);
        }
        if !tables.reactions.iter().any(|r| r.id == reaction_id)
            || !tables.users.iter().any(|u| u.id == user_id)
        {
            return Err(DomainError::DatabaseError(format!(
                "user reaction references missing reaction {reaction_id} or user {user_id}"
            )));
        }
        let id = tables.next_id();
        tables.user_reactions.push(UserReaction {
            id,
            reaction_id,
            user_id,
        });
        Ok(true)
    }

    async fn delete_user_reaction(&mut self, reaction_id: i64, user_id: i64) -> RepoResult<bool> {
        let tables = self.tables()?;
        let before = tables.user_reactions.len();
        tables
            .user_reactions
            .retain(|ur| !(ur.reaction_id == reaction_id && ur.user_id == user_id));
        Ok(tables.user_reactions.len() < before)
    }

    async fn count_user_reactions(&mut self, reaction_id: i64) -> RepoResult<i64> {
        let tables = self.tables()?;
        Ok(tables
            .user_reactions
            .iter()
            .filter(|ur| ur.reaction_id == reaction_id)
            .count() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seed_post(uow: &mut dyn UnitOfWork, message: u64) -> Post {
        let community = uow.find_or_create_community(Snowflake::new(1)).await.unwrap();
        let channel = uow
            .find_or_create_channel(Snowflake::new(2), community)
            .await
            .unwrap();
        let user = uow.find_or_create_user(Snowflake::new(3)).await.unwrap();
        uow.create_post(NewPost::new(Snowflake::new(message), channel, user, "hi"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_commit_publishes_changes() {
        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        seed_post(uow.as_mut(), 100).await;
        uow.commit().await.unwrap();

        let counts = store.counts().await;
        assert_eq!(counts.posts, 1);
        assert_eq!(counts.channels, 1);
        assert!(store.post_summary(Snowflake::new(100)).await.is_some());
    }

    #[tokio::test]
    async fn test_rollback_and_drop_discard_changes() {
        let store = MemoryStore::new();

        let mut uow = store.begin().await.unwrap();
        seed_post(uow.as_mut(), 100).await;
        uow.rollback().await.unwrap();
        assert!(matches!(
            uow.find_post(Snowflake::new(100)).await,
            Err(DomainError::TransactionFinished)
        ));

        {
            let mut uow = store.begin().await.unwrap();
            seed_post(uow.as_mut(), 101).await;
        }

        assert_eq!(store.counts().await, TableCounts::default());
    }

    #[tokio::test]
    async fn test_find_or_create_is_idempotent() {
        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        let a = uow.find_or_create_user(Snowflake::new(5)).await.unwrap();
        let b = uow.find_or_create_user(Snowflake::new(5)).await.unwrap();
        assert_eq!(a, b);
        uow.commit().await.unwrap();
        assert_eq!(store.counts().await.users, 1);
    }

    #[tokio::test]
    async fn test_duplicate_post_is_rejected() {
        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        let post = seed_post(uow.as_mut(), 100).await;
        let err = uow
            .create_post(NewPost::new(post.discord_id, post.channel_id, post.user_id, "again"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::PostAlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_custom_and_standard_emoji_are_distinct() {
        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        let custom = uow
            .find_or_create_emoji(&EmojiRef::Custom {
                id: Snowflake::new(7),
                name: "seven".to_string(),
            })
            .await
            .unwrap();
        let standard = uow
            .find_or_create_emoji(&EmojiRef::Standard {
                name: "seven".to_string(),
            })
            .await
            .unwrap();
        assert_ne!(custom, standard);
    }

    #[tokio::test]
    async fn test_delete_post_cascades() {
        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        let post = seed_post(uow.as_mut(), 100).await;
        uow.create_image(NewImage {
            post_id: post.id,
            url: "https://cdn/x.png".to_string(),
            width: 1,
            height: 1,
            size: 1,
        })
        .await
        .unwrap();
        let emoji = uow
            .find_or_create_emoji(&EmojiRef::Standard {
                name: "👍".to_string(),
            })
            .await
            .unwrap();
        let reaction = uow.find_or_create_reaction(post.id, emoji).await.unwrap();
        assert!(uow.create_user_reaction(reaction, post.user_id).await.unwrap());
        assert!(!uow.create_user_reaction(reaction, post.user_id).await.unwrap());

        assert!(uow.delete_post(post.discord_id).await.unwrap());
        assert!(!uow.delete_post(post.discord_id).await.unwrap());
        uow.commit().await.unwrap();

        let counts = store.counts().await;
        assert_eq!(counts.posts, 0);
        assert_eq!(counts.images, 0);
        assert_eq!(counts.reactions, 0);
        assert_eq!(counts.user_reactions, 0);
        assert_eq!(counts.emojis, 1);
    }

    #[tokio::test]
    async fn test_listing_orders() {
        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        let older = seed_post(uow.as_mut(), 100).await;
        seed_post(uow.as_mut(), 200).await;
        let emoji = uow
            .find_or_create_emoji(&EmojiRef::Standard {
                name: "🔥".to_string(),
            })
            .await
            .unwrap();
        let reaction = uow.find_or_create_reaction(older.id, emoji).await.unwrap();
        uow.create_user_reaction(reaction, older.user_id).await.unwrap();
        uow.commit().await.unwrap();

        let recent = store.recent_posts(10, 0).await.unwrap();
        assert_eq!(recent[0].id, Snowflake::new(200));

        let top = store.top_posts(10, 0).await.unwrap();
        assert_eq!(top[0].id, Snowflake::new(100));
        assert_eq!(top[0].reaction_count, 1);
        assert_eq!(top[0].reactions[0].emoji, "🔥");
        assert_eq!(top[1].reaction_count, 0);

        assert_eq!(store.recent_posts(1, 1).await.unwrap()[0].id, Snowflake::new(100));
        assert_eq!(store.count_posts().await.unwrap(), 2);
    }
}
