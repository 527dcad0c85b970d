//! End-to-end mirror tests
//!
//! Drive the sync engine with gateway events against fake Discord
//! collaborators, then read the result back through the HTTP API.
//!
//! The PostgreSQL scenarios need `DATABASE_URL` and are skipped without it.
//!
//! Run with: cargo test -p integration-tests --test mirror_tests

use std::sync::Arc;

use integration_tests::{
    assert_json, assert_status, link_preview, test_pool, unique_snowflake, upload, ErrorJson,
    PostJson, TestServer,
};
use monicu_core::{
    EmojiRepository, PostRepository, ReactionRepository, Snowflake, Store,
    UserReactionRepository,
};
use monicu_db::{PgPostQuery, PgStore};
use monicu_discord::{
    GatewayEvent, Message, MessageDeleteEvent, MessageReactionEvent, PartialEmoji, ReadyEvent,
    UserPayload,
};
use monicu_sync::services::testing::{
    custom, reaction, standard, FakeDiscord, FakeProbe, Harness, CHANNEL, COMMUNITY,
};
use monicu_sync::{EventDispatcher, PostReconciler, ReactionReconciler, ScopeFilter, SyncContext};
use reqwest::StatusCode;

const ANN: u64 = 444;
const BOB: u64 = 555;

fn ready() -> GatewayEvent {
    GatewayEvent::Ready(ReadyEvent {
        v: 10,
        user: UserPayload {
            id: Snowflake::new(1),
            username: "mirror".to_string(),
            bot: true,
        },
        session_id: "integration".to_string(),
        resume_gateway_url: None,
    })
}

fn react(user: u64, message: u64, emoji: &monicu_core::EmojiRef) -> GatewayEvent {
    GatewayEvent::ReactionAdd(MessageReactionEvent {
        user_id: Snowflake::new(user),
        channel_id: Snowflake::new(CHANNEL),
        message_id: Snowflake::new(message),
        guild_id: Some(Snowflake::new(COMMUNITY)),
        emoji: PartialEmoji {
            id: emoji.discord_id(),
            name: Some(emoji.name().to_string()),
        },
    })
}

// ============================================================================
// In-memory store
// ============================================================================

#[tokio::test]
async fn test_backfill_then_live_events_are_served() {
    let party = custom(42, "party");
    let mut old = upload(10, CHANNEL, COMMUNITY, ANN, "from the archive");
    old.reactions = vec![reaction(&party, 2)];

    let api = FakeDiscord::new()
        .with_channel(Snowflake::new(CHANNEL), Some(Snowflake::new(COMMUNITY)))
        .with_history(
            Snowflake::new(CHANNEL),
            vec![
                old,
                upload(11, CHANNEL, COMMUNITY, BOB, "!nomirror private"),
                monicu_sync::services::testing::message(12, CHANNEL, COMMUNITY, BOB),
            ],
        )
        .with_reactors(
            Snowflake::new(10),
            party.clone(),
            vec![Snowflake::new(ANN), Snowflake::new(BOB)],
        );
    let probe = FakeProbe::new([("https://x/cat.png", 777)]);
    let h = Harness::with_cache(api, probe, None);
    let mut dispatcher = EventDispatcher::new(h.ctx.clone());

    dispatcher.handle(ready()).await;
    let reports = dispatcher.wait_for_backfills().await;
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].created, 1);

    // Live traffic after the backfill
    dispatcher
        .handle(GatewayEvent::MessageCreate(upload(20, CHANNEL, COMMUNITY, BOB, "new")))
        .await;
    dispatcher
        .handle(GatewayEvent::MessageCreate(link_preview(
            21,
            CHANNEL,
            COMMUNITY,
            ANN,
            "https://x/cat.png",
        )))
        .await;
    dispatcher.handle(react(ANN, 20, &standard("👍"))).await;
    dispatcher.handle(react(BOB, 10, &standard("👍"))).await;

    let server = TestServer::start(Arc::new(h.store.clone())).await.unwrap();

    let response = server.get("/posts/all").await.unwrap();
    let posts: Vec<PostJson> = assert_json(response, StatusCode::OK).await.unwrap();
    let ids: Vec<&str> = posts.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["21", "20", "10"]);

    let archived = &posts[2];
    assert_eq!(archived.channel, CHANNEL.to_string());
    assert_eq!(archived.community, COMMUNITY.to_string());
    assert_eq!(archived.user, ANN.to_string());
    assert_eq!(archived.content, "from the archive");
    assert_eq!(archived.images[0].url, "https://media/10.png");
    assert_eq!((archived.images[0].width, archived.images[0].height), (800, 600));
    assert_eq!(archived.reaction_count, 2);
    assert!(archived.reactions.iter().any(|r| r.emoji == "party:42" && r.count == 2));

    assert_eq!(posts[0].images[0].size, 777);

    let response = server.get("/posts/reactions?limit=1").await.unwrap();
    let top: Vec<PostJson> = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].id, "10");
}

#[tokio::test]
async fn test_edit_and_delete_are_reflected() {
    let h = Harness::new(FakeDiscord::new(), FakeProbe::default());
    let mut dispatcher = EventDispatcher::new(h.ctx.clone());

    dispatcher
        .handle(GatewayEvent::MessageCreate(upload(1, CHANNEL, COMMUNITY, ANN, "first")))
        .await;
    dispatcher
        .handle(GatewayEvent::MessageCreate(upload(2, CHANNEL, COMMUNITY, ANN, "second")))
        .await;

    let mut edit = upload(1, CHANNEL, COMMUNITY, ANN, "first, edited");
    edit.author = None;
    dispatcher.handle(GatewayEvent::MessageUpdate(edit)).await;

    // Removing the image demotes the post
    let mut demoted: Message = upload(2, CHANNEL, COMMUNITY, ANN, "second");
    demoted.attachments = Some(Vec::new());
    dispatcher.handle(GatewayEvent::MessageUpdate(demoted)).await;

    dispatcher
        .handle(GatewayEvent::MessageDelete(MessageDeleteEvent {
            id: Snowflake::new(99),
            channel_id: Snowflake::new(CHANNEL),
            guild_id: Some(Snowflake::new(COMMUNITY)),
        }))
        .await;

    let server = TestServer::start(Arc::new(h.store.clone())).await.unwrap();
    let posts: Vec<PostJson> = assert_json(server.get("/posts/all").await.unwrap(), StatusCode::OK)
        .await
        .unwrap();

    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].id, "1");
    assert_eq!(posts[0].content, "first, edited");
}

#[tokio::test]
async fn test_api_rejects_bad_paging() {
    let server = TestServer::start(Arc::new(monicu_db::MemoryStore::new()))
        .await
        .unwrap();

    let response = server.get("/posts/all?offset=-3").await.unwrap();
    let body: ErrorJson = assert_json(response, StatusCode::BAD_REQUEST).await.unwrap();
    assert_eq!(body.error.code, "INVALID_QUERY_PARAMETER");
    assert!(!body.error.message.is_empty());

    let response = server.get("/health").await.unwrap();
    assert_status(response, StatusCode::OK).await.unwrap();
}

// ============================================================================
// PostgreSQL
// ============================================================================

fn pg_context(store: PgStore, api: FakeDiscord, community: Snowflake, channel: Snowflake) -> SyncContext {
    SyncContext::builder()
        .store(Arc::new(store))
        .api(Arc::new(api))
        .probe(Arc::new(FakeProbe::default()))
        .scope(ScopeFilter::new([community], [channel], None))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_concurrent_creates_converge_in_postgres() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let (community, channel, author) = (unique_snowflake(), unique_snowflake(), unique_snowflake());
    let id = unique_snowflake();
    let ctx = pg_context(PgStore::new(pool.clone()), FakeDiscord::new(), community, channel);

    let message = upload(
        id.into_inner(),
        channel.into_inner(),
        community.into_inner(),
        author.into_inner(),
        "race",
    );
    let first = PostReconciler::new(&ctx);
    let second = PostReconciler::new(&ctx);
    let (a, b) = tokio::join!(first.create_post(&message), second.create_post(&message));
    a.unwrap();
    b.unwrap();

    let store = PgStore::new(pool);
    let mut tx = store.begin().await.unwrap();
    let post = tx.find_post(id).await.unwrap().unwrap();
    assert_eq!(post.content, "race");
    tx.rollback().await.unwrap();

    assert!(PostReconciler::new(&ctx).delete_post(id).await.is_ok());
}

#[tokio::test]
async fn test_reactions_in_postgres() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let (community, channel, author) = (unique_snowflake(), unique_snowflake(), unique_snowflake());
    let id = unique_snowflake();
    let ctx = pg_context(PgStore::new(pool.clone()), FakeDiscord::new(), community, channel);

    let message = upload(
        id.into_inner(),
        channel.into_inner(),
        community.into_inner(),
        author.into_inner(),
        "react to me",
    );
    PostReconciler::new(&ctx).create_post(&message).await.unwrap();

    let thumbs = standard("👍");
    let event = MessageReactionEvent {
        user_id: author,
        channel_id: channel,
        message_id: id,
        guild_id: Some(community),
        emoji: PartialEmoji {
            id: None,
            name: Some(thumbs.name().to_string()),
        },
    };
    let reactions = ReactionReconciler::new(&ctx);
    reactions.add_reaction(&event).await.unwrap();
    reactions.add_reaction(&event).await.unwrap();

    let store = PgStore::new(pool.clone());
    let mut tx = store.begin().await.unwrap();
    let post = tx.find_post(id).await.unwrap().unwrap();
    let emoji = tx.find_emoji(&thumbs).await.unwrap().unwrap();
    let reaction = tx.find_reaction(post.id, emoji.id).await.unwrap().unwrap();
    assert_eq!(tx.count_user_reactions(reaction.id).await.unwrap(), 1);
    tx.rollback().await.unwrap();

    let server = TestServer::start(Arc::new(PgPostQuery::new(pool))).await.unwrap();
    assert_status(server.get("/health/ready").await.unwrap(), StatusCode::OK)
        .await
        .unwrap();

    PostReconciler::new(&ctx).delete_post(id).await.unwrap();
}
