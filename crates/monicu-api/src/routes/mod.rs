//! Route definitions

use axum::{routing::get, Router};

use crate::handlers::{health, posts};
use crate::state::AppState;

/// Create the API router
pub fn create_router() -> Router<AppState> {
    Router::new().merge(post_routes()).merge(health_routes())
}

/// Health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
}

/// Post listing routes
fn post_routes() -> Router<AppState> {
    Router::new()
        .route("/posts/all", get(posts::list_recent))
        .route("/posts/reactions", get(posts::list_top))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use monicu_core::{
        ChannelRepository, CommunityRepository, EmojiRef, EmojiRepository, ImageRepository,
        NewImage, NewPost, PostRepository, ReactionRepository, Snowflake, Store,
        UserReactionRepository, UserRepository,
    };
    use monicu_db::MemoryStore;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::server::create_app;
    use crate::state::AppState;

    /// Posts 100 and 200; 100 has one image and one reaction
    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let community = tx.find_or_create_community(Snowflake::new(333)).await.unwrap();
        let channel = tx
            .find_or_create_channel(Snowflake::new(222), community)
            .await
            .unwrap();
        let user = tx.find_or_create_user(Snowflake::new(444)).await.unwrap();
        let older = tx
            .create_post(NewPost::new(Snowflake::new(100), channel, user, "older"))
            .await
            .unwrap();
        tx.create_post(NewPost::new(Snowflake::new(200), channel, user, "newer"))
            .await
            .unwrap();
        tx.create_image(NewImage {
            post_id: older.id,
            url: "https://media/a.png".to_string(),
            width: 100,
            height: 50,
            size: 2048,
        })
        .await
        .unwrap();
        let emoji = tx
            .find_or_create_emoji(&EmojiRef::Standard {
                name: "🔥".to_string(),
            })
            .await
            .unwrap();
        let reaction = tx.find_or_create_reaction(older.id, emoji).await.unwrap();
        tx.create_user_reaction(reaction, user).await.unwrap();
        tx.commit().await.unwrap();
        store
    }

    async fn get(store: MemoryStore, uri: &str) -> (StatusCode, Value) {
        let app = create_app(AppState::from_query(Arc::new(store)));
        let response = app
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_recent_posts() {
        let (status, body) = get(seeded().await, "/posts/all").await;
        assert_eq!(status, StatusCode::OK);

        let posts = body.as_array().unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0]["id"], "200");
        assert_eq!(posts[1]["id"], "100");
        assert_eq!(posts[1]["channel"], "222");
        assert_eq!(posts[1]["community"], "333");
        assert_eq!(posts[1]["user"], "444");
        assert_eq!(posts[1]["content"], "older");
        assert_eq!(posts[1]["images"][0]["url"], "https://media/a.png");
        assert_eq!(posts[1]["images"][0]["size"], 2048);
        assert_eq!(posts[1]["reactions"][0]["emoji"], "🔥");
        assert_eq!(posts[1]["reactions"][0]["count"], 1);
        assert_eq!(posts[1]["reaction_count"], 1);
    }

    #[tokio::test]
    async fn test_top_posts() {
        let (status, body) = get(seeded().await, "/posts/reactions?limit=1").await;
        assert_eq!(status, StatusCode::OK);

        let posts = body.as_array().unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0]["id"], "100");
    }

    #[tokio::test]
    async fn test_offset() {
        let (_, body) = get(seeded().await, "/posts/all?offset=1").await;
        let posts = body.as_array().unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0]["id"], "100");
    }

    #[tokio::test]
    async fn test_invalid_query() {
        let (status, body) = get(seeded().await, "/posts/all?offset=-1").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_QUERY_PARAMETER");

        let (status, body) = get(seeded().await, "/posts/reactions?limit=ten").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["message"].is_string());
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get(MemoryStore::new(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (status, body) = get(MemoryStore::new(), "/health/ready").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["database"], true);
    }
}
