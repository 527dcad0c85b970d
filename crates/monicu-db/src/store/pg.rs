//! PostgreSQL unit of work
//!
//! Every repository call on a [`PgUnitOfWork`] runs on the same transaction.
//! After `commit` or `rollback` the unit of work is spent and further calls
//! fail with [`DomainError::TransactionFinished`]. Dropping an unfinished
//! unit of work rolls the transaction back.

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tracing::instrument;

use monicu_core::entities::{
    Channel, Community, Emoji, EmojiRef, Image, NewImage, NewPost, Post, Reaction, User,
};
use monicu_core::error::DomainError;
use monicu_core::traits::{
    ChannelRepository, CommunityRepository, EmojiRepository, ImageRepository, PostRepository,
    ReactionRepository, RepoResult, Store, UnitOfWork, UserReactionRepository, UserRepository,
};
use monicu_core::value_objects::Snowflake;

use crate::models::{
    ChannelModel, CommunityModel, EmojiModel, ImageModel, PostModel, ReactionModel, UserModel,
};

use super::error::map_db_error;

/// PostgreSQL implementation of Store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new PgStore
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    #[instrument(skip(self))]
    async fn begin(&self) -> RepoResult<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await.map_err(map_db_error)?;
        Ok(Box::new(PgUnitOfWork { tx: Some(tx) }))
    }
}

/// One open PostgreSQL transaction
pub struct PgUnitOfWork {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgUnitOfWork {
    fn conn(&mut self) -> RepoResult<&mut PgConnection> {
        self.tx
            .as_deref_mut()
            .ok_or(DomainError::TransactionFinished)
    }

    /// Find-or-create on a table keyed by `discord_id` alone.
    ///
    /// The insert and the lookup share one statement snapshot, so a row
    /// committed concurrently by another transaction is only visible to a
    /// second statement.
    async fn find_or_create_keyed(
        &mut self,
        table: &'static str,
        discord_id: Snowflake,
    ) -> RepoResult<i64> {
        let upsert = format!(
            "WITH ins AS (
                INSERT INTO {table} (discord_id) VALUES ($1)
                ON CONFLICT (discord_id) DO NOTHING
                RETURNING id
            )
            SELECT id FROM ins
            UNION ALL
            SELECT id FROM {table} WHERE discord_id = $1
            LIMIT 1"
        );
        let id = sqlx::query_scalar::<_, i64>(&upsert)
            .bind(discord_id.to_db())
            .fetch_optional(self.conn()?)
            .await
            .map_err(map_db_error)?;
        if let Some(id) = id {
            return Ok(id);
        }

        let select = format!("SELECT id FROM {table} WHERE discord_id = $1");
        sqlx::query_scalar::<_, i64>(&select)
            .bind(discord_id.to_db())
            .fetch_one(self.conn()?)
            .await
            .map_err(map_db_error)
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn commit(&mut self) -> RepoResult<()> {
        let tx = self.tx.take().ok_or(DomainError::TransactionFinished)?;
        tx.commit().await.map_err(map_db_error)
    }

    async fn rollback(&mut self) -> RepoResult<()> {
        let tx = self.tx.take().ok_or(DomainError::TransactionFinished)?;
        tx.rollback().await.map_err(map_db_error)
    }
}

// ============================================================================
// Community / Channel / User
// ============================================================================

#[async_trait]
impl CommunityRepository for PgUnitOfWork {
    #[instrument(skip(self))]
    async fn find_community(&mut self, discord_id: Snowflake) -> RepoResult<Option<Community>> {
        let result = sqlx::query_as::<_, CommunityModel>(
            r#"
            SELECT id, discord_id FROM community WHERE discord_id = $1
            "#,
        )
        .bind(discord_id.to_db())
        .fetch_optional(self.conn()?)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(Community::from))
    }

    #[instrument(skip(self))]
    async fn find_or_create_community(&mut self, discord_id: Snowflake) -> RepoResult<i64> {
        self.find_or_create_keyed("community", discord_id).await
    }
}

#[async_trait]
impl ChannelRepository for PgUnitOfWork {
    #[instrument(skip(self))]
    async fn find_channel(&mut self, discord_id: Snowflake) -> RepoResult<Option<Channel>> {
        let result = sqlx::query_as::<_, ChannelModel>(
            r#"
            SELECT id, discord_id, community_id FROM channel WHERE discord_id = $1
            "#,
        )
        .bind(discord_id.to_db())
        .fetch_optional(self.conn()?)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(Channel::from))
    }

    #[instrument(skip(self))]
    async fn find_or_create_channel(
        &mut self,
        discord_id: Snowflake,
        community_id: i64,
    ) -> RepoResult<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            WITH ins AS (
                INSERT INTO channel (discord_id, community_id) VALUES ($1, $2)
                ON CONFLICT (discord_id) DO NOTHING
                RETURNING id
            )
            SELECT id FROM ins
            UNION ALL
            SELECT id FROM channel WHERE discord_id = $1
            LIMIT 1
            "#,
        )
        .bind(discord_id.to_db())
        .bind(community_id)
        .fetch_optional(self.conn()?)
        .await
        .map_err(map_db_error)?;

        match id {
            Some(id) => Ok(id),
            None => self
                .find_channel(discord_id)
                .await?
                .map(|channel| channel.id)
                .ok_or(DomainError::ChannelNotFound(discord_id)),
        }
    }
}

#[async_trait]
impl UserRepository for PgUnitOfWork {
    #[instrument(skip(self))]
    async fn find_user(&mut self, discord_id: Snowflake) -> RepoResult<Option<User>> {
        let result = sqlx::query_as::<_, UserModel>(
            r#"
            SELECT id, discord_id FROM "user" WHERE discord_id = $1
            "#,
        )
        .bind(discord_id.to_db())
        .fetch_optional(self.conn()?)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(User::from))
    }

    #[instrument(skip(self))]
    async fn find_or_create_user(&mut self, discord_id: Snowflake) -> RepoResult<i64> {
        self.find_or_create_keyed("\"user\"", discord_id).await
    }
}

// ============================================================================
// Post / Image
// ============================================================================

#[async_trait]
impl PostRepository for PgUnitOfWork {
    #[instrument(skip(self))]
    async fn find_post(&mut self, discord_id: Snowflake) -> RepoResult<Option<Post>> {
        let result = sqlx::query_as::<_, PostModel>(
            r#"
            SELECT id, discord_id, channel_id, user_id, content
            FROM post
            WHERE discord_id = $1
            "#,
        )
        .bind(discord_id.to_db())
        .fetch_optional(self.conn()?)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(Post::from))
    }

    #[instrument(skip(self, post), fields(discord_id = %post.discord_id))]
    async fn create_post(&mut self, post: NewPost) -> RepoResult<Post> {
        // DO NOTHING keeps the transaction usable when the post already exists
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO post (discord_id, channel_id, user_id, content)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (discord_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(post.discord_id.to_db())
        .bind(post.channel_id)
        .bind(post.user_id)
        .bind(&post.content)
        .fetch_optional(self.conn()?)
        .await
        .map_err(map_db_error)?;

        match id {
            Some(id) => Ok(post.into_post(id)),
            None => Err(DomainError::PostAlreadyExists(post.discord_id)),
        }
    }

    #[instrument(skip(self, content))]
    async fn update_post_content(&mut self, post_id: i64, content: &str) -> RepoResult<()> {
        sqlx::query(
            r#"
            UPDATE post SET content = $2 WHERE id = $1
            "#,
        )
        .bind(post_id)
        .bind(content)
        .execute(self.conn()?)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_post(&mut self, discord_id: Snowflake) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM post WHERE discord_id = $1
            "#,
        )
        .bind(discord_id.to_db())
        .execute(self.conn()?)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn channel_has_posts(&mut self, channel_id: i64) -> RepoResult<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (SELECT 1 FROM post WHERE channel_id = $1)
            "#,
        )
        .bind(channel_id)
        .fetch_one(self.conn()?)
        .await
        .map_err(map_db_error)
    }

    #[instrument(skip(self))]
    async fn count_channel_posts(&mut self, channel_id: i64) -> RepoResult<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM post WHERE channel_id = $1
            "#,
        )
        .bind(channel_id)
        .fetch_one(self.conn()?)
        .await
        .map_err(map_db_error)
    }
}

#[async_trait]
impl ImageRepository for PgUnitOfWork {
    #[instrument(skip(self, image), fields(post_id = image.post_id))]
    async fn create_image(&mut self, image: NewImage) -> RepoResult<Image> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO image (post_id, url, width, height, size)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(image.post_id)
        .bind(&image.url)
        .bind(i64::from(image.width))
        .bind(i64::from(image.height))
        .bind(i64::try_from(image.size).unwrap_or(i64::MAX))
        .fetch_one(self.conn()?)
        .await
        .map_err(map_db_error)?;

        Ok(image.into_image(id))
    }

    #[instrument(skip(self))]
    async fn find_images(&mut self, post_id: i64) -> RepoResult<Vec<Image>> {
        let results = sqlx::query_as::<_, ImageModel>(
            r#"
            SELECT id, post_id, url, width, height, size
            FROM image
            WHERE post_id = $1
            ORDER BY id
            "#,
        )
        .bind(post_id)
        .fetch_all(self.conn()?)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(Image::from).collect())
    }

    #[instrument(skip(self))]
    async fn delete_images(&mut self, post_id: i64) -> RepoResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM image WHERE post_id = $1
            "#,
        )
        .bind(post_id)
        .execute(self.conn()?)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected())
    }
}

// ============================================================================
// Emoji / Reaction / UserReaction
// ============================================================================

#[async_trait]
impl EmojiRepository for PgUnitOfWork {
    #[instrument(skip(self, emoji), fields(emoji = %emoji))]
    async fn find_emoji(&mut self, emoji: &EmojiRef) -> RepoResult<Option<Emoji>> {
        let query = match emoji {
            EmojiRef::Custom { id, .. } => sqlx::query_as::<_, EmojiModel>(
                r#"
                SELECT id, discord_id, name FROM emoji WHERE discord_id = $1
                "#,
            )
            .bind(id.to_db()),
            EmojiRef::Standard { name } => sqlx::query_as::<_, EmojiModel>(
                r#"
                SELECT id, discord_id, name FROM emoji
                WHERE discord_id IS NULL AND name = $1
                "#,
            )
            .bind(name.clone()),
        };

        let result = query
            .fetch_optional(self.conn()?)
            .await
            .map_err(map_db_error)?;

        Ok(result.map(Emoji::from))
    }

    #[instrument(skip(self, emoji), fields(emoji = %emoji))]
    async fn find_or_create_emoji(&mut self, emoji: &EmojiRef) -> RepoResult<i64> {
        let query = match emoji {
            EmojiRef::Custom { id, name } => sqlx::query_scalar::<_, i64>(
                r#"
                WITH ins AS (
                    INSERT INTO emoji (discord_id, name) VALUES ($1, $2)
                    ON CONFLICT DO NOTHING
                    RETURNING id
                )
                SELECT id FROM ins
                UNION ALL
                SELECT id FROM emoji WHERE discord_id = $1
                LIMIT 1
                "#,
            )
            .bind(Some(id.to_db()))
            .bind(name.clone()),
            EmojiRef::Standard { name } => sqlx::query_scalar::<_, i64>(
                r#"
                WITH ins AS (
                    INSERT INTO emoji (discord_id, name) VALUES ($1, $2)
                    ON CONFLICT DO NOTHING
                    RETURNING id
                )
                SELECT id FROM ins
                UNION ALL
                SELECT id FROM emoji WHERE discord_id IS NULL AND name = $2
                LIMIT 1
                "#,
            )
            .bind(None::<i64>)
            .bind(name.clone()),
        };

        let id = query
            .fetch_optional(self.conn()?)
            .await
            .map_err(map_db_error)?;

        match id {
            Some(id) => Ok(id),
            None => self
                .find_emoji(emoji)
                .await?
                .map(|row| row.id)
                .ok_or_else(|| {
                    DomainError::InternalError(format!("emoji {emoji} vanished after insert"))
                }),
        }
    }
}

#[async_trait]
impl ReactionRepository for PgUnitOfWork {
    #[instrument(skip(self))]
    async fn find_reaction(&mut self, post_id: i64, emoji_id: i64) -> RepoResult<Option<Reaction>> {
        let result = sqlx::query_as::<_, ReactionModel>(
            r#"
            SELECT id, post_id, emoji_id FROM reaction
            WHERE post_id = $1 AND emoji_id = $2
            "#,
        )
        .bind(post_id)
        .bind(emoji_id)
        .fetch_optional(self.conn()?)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(Reaction::from))
    }

    #[instrument(skip(self))]
    async fn find_or_create_reaction(&mut self, post_id: i64, emoji_id: i64) -> RepoResult<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            WITH ins AS (
                INSERT INTO reaction (post_id, emoji_id) VALUES ($1, $2)
                ON CONFLICT (post_id, emoji_id) DO NOTHING
                RETURNING id
            )
            SELECT id FROM ins
            UNION ALL
            SELECT id FROM reaction WHERE post_id = $1 AND emoji_id = $2
            LIMIT 1
            "#,
        )
        .bind(post_id)
        .bind(emoji_id)
        .fetch_optional(self.conn()?)
        .await
        .map_err(map_db_error)?;

        match id {
            Some(id) => Ok(id),
            None => self
                .find_reaction(post_id, emoji_id)
                .await?
                .map(|reaction| reaction.id)
                .ok_or_else(|| {
                    DomainError::InternalError(format!(
                        "reaction ({post_id}, {emoji_id}) vanished after insert"
                    ))
                }),
        }
    }

    #[instrument(skip(self))]
    async fn delete_reactions(&mut self, post_id: i64) -> RepoResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM reaction WHERE post_id = $1
            "#,
        )
        .bind(post_id)
        .execute(self.conn()?)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl UserReactionRepository for PgUnitOfWork {
    #[instrument(skip(self))]
    async fn create_user_reaction(&mut self, reaction_id: i64, user_id: i64) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_reaction (reaction_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (reaction_id, user_id) DO NOTHING
            "#,
        )
        .bind(reaction_id)
        .bind(user_id)
        .execute(self.conn()?)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self))]
    async fn delete_user_reaction(&mut self, reaction_id: i64, user_id: i64) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM user_reaction WHERE reaction_id = $1 AND user_id = $2
            "#,
        )
        .bind(reaction_id)
        .bind(user_id)
        .execute(self.conn()?)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn count_user_reactions(&mut self, reaction_id: i64) -> RepoResult<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM user_reaction WHERE reaction_id = $1
            "#,
        )
        .bind(reaction_id)
        .fetch_one(self.conn()?)
        .await
        .map_err(map_db_error)
    }
}
