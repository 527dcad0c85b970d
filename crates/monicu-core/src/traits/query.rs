//! Read-side query port used by the HTTP API

use async_trait::async_trait;

use super::RepoResult;
use crate::entities::PostSummary;

/// Post listing queries
///
/// Runs outside any unit of work; never mutates.
#[async_trait]
pub trait PostQuery: Send + Sync {
    /// Posts ordered by external message ID, newest first
    async fn recent_posts(&self, limit: i64, offset: i64) -> RepoResult<Vec<PostSummary>>;

    /// Posts ordered by distinct reacting users, most first
    async fn top_posts(&self, limit: i64, offset: i64) -> RepoResult<Vec<PostSummary>>;

    /// Total number of mirrored posts
    async fn count_posts(&self) -> RepoResult<i64>;

    /// Check that the backing store is reachable
    async fn ping(&self) -> RepoResult<()>;
}
