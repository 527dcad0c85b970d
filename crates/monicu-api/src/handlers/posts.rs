//! Post listing handlers

use axum::{extract::State, Json};
use monicu_core::{Image, PostSummary, ReactionTally, Snowflake};
use serde::Serialize;
use tracing::instrument;

use crate::extractors::Pagination;
use crate::response::ApiResult;
use crate::state::AppState;

/// A mirrored post as returned by the listings
#[derive(Debug, Clone, Serialize)]
pub struct PostResponse {
    pub id: Snowflake,
    pub channel: Snowflake,
    pub community: Snowflake,
    pub user: Snowflake,
    pub content: String,
    pub images: Vec<ImageResponse>,
    pub reactions: Vec<ReactionResponse>,
    pub reaction_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageResponse {
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub size: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReactionResponse {
    pub emoji: String,
    pub count: i64,
}

impl From<Image> for ImageResponse {
    fn from(image: Image) -> Self {
        Self {
            url: image.url,
            width: image.width,
            height: image.height,
            size: image.size,
        }
    }
}

impl From<ReactionTally> for ReactionResponse {
    fn from(tally: ReactionTally) -> Self {
        // Custom emoji render as name:id like the Discord API
        let emoji = match tally.emoji_id {
            Some(id) => format!("{}:{id}", tally.emoji),
            None => tally.emoji,
        };
        Self {
            emoji,
            count: tally.count,
        }
    }
}

impl From<PostSummary> for PostResponse {
    fn from(post: PostSummary) -> Self {
        Self {
            id: post.id,
            channel: post.channel,
            community: post.community,
            user: post.user,
            content: post.content,
            images: post.images.into_iter().map(Into::into).collect(),
            reactions: post.reactions.into_iter().map(Into::into).collect(),
            reaction_count: post.reaction_count,
        }
    }
}

/// Newest posts first
///
/// GET /posts/all
#[instrument(skip(state))]
pub async fn list_recent(
    State(state): State<AppState>,
    pagination: Pagination,
) -> ApiResult<Json<Vec<PostResponse>>> {
    let posts = state
        .posts()
        .recent_posts(pagination.limit, pagination.offset)
        .await?;
    Ok(Json(posts.into_iter().map(Into::into).collect()))
}

/// Most reacted posts first
///
/// GET /posts/reactions
#[instrument(skip(state))]
pub async fn list_top(
    State(state): State<AppState>,
    pagination: Pagination,
) -> ApiResult<Json<Vec<PostResponse>>> {
    let posts = state
        .posts()
        .top_posts(pagination.limit, pagination.offset)
        .await?;
    Ok(Json(posts.into_iter().map(Into::into).collect()))
}
