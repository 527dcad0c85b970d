//! PostgreSQL implementation of PostQuery

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use monicu_core::entities::{Image, PostSummary, ReactionTally};
use monicu_core::traits::{PostQuery, RepoResult};
use monicu_core::value_objects::Snowflake;

use crate::models::{ImageModel, PostSummaryModel, ReactionTallyModel};

use super::error::map_db_error;

const SUMMARY_SELECT: &str = r#"
    SELECT p.id,
           p.discord_id,
           c.discord_id AS channel_discord_id,
           co.discord_id AS community_discord_id,
           u.discord_id AS user_discord_id,
           p.content,
           (
               SELECT COUNT(DISTINCT ur.user_id)
               FROM reaction r
               JOIN user_reaction ur ON ur.reaction_id = r.id
               WHERE r.post_id = p.id
           ) AS reaction_count
    FROM post p
    JOIN channel c ON c.id = p.channel_id
    JOIN community co ON co.id = c.community_id
    JOIN "user" u ON u.id = p.user_id
"#;

/// PostgreSQL implementation of PostQuery
#[derive(Clone)]
pub struct PgPostQuery {
    pool: PgPool,
}

impl PgPostQuery {
    /// Create a new PgPostQuery
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn list(&self, order_by: &str, limit: i64, offset: i64) -> RepoResult<Vec<PostSummary>> {
        let sql = format!("{SUMMARY_SELECT} ORDER BY {order_by} LIMIT $1 OFFSET $2");
        let rows = sqlx::query_as::<_, PostSummaryModel>(&sql)
            .bind(limit.clamp(1, 100))
            .bind(offset.max(0))
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();

        let images = sqlx::query_as::<_, ImageModel>(
            r#"
            SELECT id, post_id, url, width, height, size
            FROM image
            WHERE post_id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(ids.as_slice())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        let tallies = sqlx::query_as::<_, ReactionTallyModel>(
            r#"
            SELECT r.post_id,
                   e.discord_id AS emoji_discord_id,
                   e.name AS emoji_name,
                   COUNT(ur.id) AS count
            FROM reaction r
            JOIN emoji e ON e.id = r.emoji_id
            LEFT JOIN user_reaction ur ON ur.reaction_id = r.id
            WHERE r.post_id = ANY($1)
            GROUP BY r.id, r.post_id, e.discord_id, e.name
            HAVING COUNT(ur.id) > 0
            ORDER BY count DESC, r.id
            "#,
        )
        .bind(ids.as_slice())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(assemble(rows, images, tallies))
    }
}

fn assemble(
    rows: Vec<PostSummaryModel>,
    images: Vec<ImageModel>,
    tallies: Vec<ReactionTallyModel>,
) -> Vec<PostSummary> {
    let mut images_by_post: HashMap<i64, Vec<Image>> = HashMap::new();
    for image in images {
        images_by_post
            .entry(image.post_id)
            .or_default()
            .push(Image::from(image));
    }

    let mut tallies_by_post: HashMap<i64, Vec<ReactionTally>> = HashMap::new();
    for tally in tallies {
        tallies_by_post
            .entry(tally.post_id)
            .or_default()
            .push(ReactionTally::from(tally));
    }

    rows.into_iter()
        .map(|row| {
            let id = Snowflake::from_db(row.discord_id);
            PostSummary {
                id,
                channel: Snowflake::from_db(row.channel_discord_id),
                community: Snowflake::from_db(row.community_discord_id),
                user: Snowflake::from_db(row.user_discord_id),
                content: row.content,
                created_at: id.created_at(),
                images: images_by_post.remove(&row.id).unwrap_or_default(),
                reactions: tallies_by_post.remove(&row.id).unwrap_or_default(),
                reaction_count: row.reaction_count,
            }
        })
        .collect()
}

#[async_trait]
impl PostQuery for PgPostQuery {
    #[instrument(skip(self))]
    async fn recent_posts(&self, limit: i64, offset: i64) -> RepoResult<Vec<PostSummary>> {
        self.list("p.discord_id DESC", limit, offset).await
    }

    #[instrument(skip(self))]
    async fn top_posts(&self, limit: i64, offset: i64) -> RepoResult<Vec<PostSummary>> {
        self.list("reaction_count DESC, p.discord_id DESC", limit, offset)
            .await
    }

    #[instrument(skip(self))]
    async fn count_posts(&self) -> RepoResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM post")
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    #[instrument(skip(self))]
    async fn ping(&self) -> RepoResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64, discord_id: i64) -> PostSummaryModel {
        PostSummaryModel {
            id,
            discord_id,
            channel_discord_id: 20,
            community_discord_id: 30,
            user_discord_id: 40,
            content: String::new(),
            reaction_count: 0,
        }
    }

    #[test]
    fn test_assemble_groups_children_by_post() {
        let posts = assemble(
            vec![row(1, 100), row(2, 200)],
            vec![ImageModel {
                id: 9,
                post_id: 2,
                url: "https://cdn/x.png".to_string(),
                width: 10,
                height: 20,
                size: 30,
            }],
            vec![ReactionTallyModel {
                post_id: 1,
                emoji_discord_id: None,
                emoji_name: "👍".to_string(),
                count: 2,
            }],
        );

        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].id, Snowflake::new(100));
        assert!(posts[0].images.is_empty());
        assert_eq!(posts[0].reactions[0].count, 2);
        assert_eq!(posts[1].images[0].url, "https://cdn/x.png");
        assert!(posts[1].reactions.is_empty());
        assert_eq!(posts[1].community, Snowflake::new(30));
    }
}
