// Router-level tests for the comment API

use axum::Router;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceExt;

use thumbnail_gateway::append::Appender;
use thumbnail_gateway::policy::{COMMENT_CREATE, PolicyTable, RoutePolicy, THUMBNAIL_CREATE};
use thumbnail_gateway::rate_limit::RateGovernor;
use thumbnail_gateway::state::AppState;
use thumbnail_gateway::store::{CommentStore, MemoryStore, Scope, VersionToken};

fn build_app(store: Arc<MemoryStore>, comment_limit: u32) -> Router {
    build_app_with(store, comment_limit, PolicyTable::default(), false)
}

fn build_app_with(
    store: Arc<MemoryStore>,
    comment_limit: u32,
    mut policies: PolicyTable,
    trust_forwarded: bool,
) -> Router {
    policies
        .insert(
            COMMENT_CREATE,
            RoutePolicy::new(comment_limit, 60_000, "Slow down, commenter."),
        )
        .unwrap();
    let store: Arc<dyn CommentStore> = store;
    let state = Arc::new(AppState {
        governor: Arc::new(RateGovernor::default()),
        policies,
        store,
        appender: Appender::default(),
        max_comment_len: 50,
        trust_forwarded,
    });
    thumbnail_gateway::router(state)
}

fn post_comment(path: &str, user: &str, text: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .header("x-user-id", user)
        .body(Body::from(serde_json::json!({ "text": text }).to_string()))
        .unwrap()
}

async fn body_json(resp: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.insert("t1", &Scope::project("p1"), vec![], VersionToken::new("v0"));
    store
}

#[tokio::test]
async fn health_returns_ok() {
    let app = build_app(seeded_store(), 10);
    let resp = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["status"], "healthy");
}

#[tokio::test]
async fn comment_is_appended_and_listed() {
    let app = build_app(seeded_store(), 10);

    let resp = app
        .clone()
        .oneshot(post_comment("/api/projects/p1/thumbnails/t1/comments", "u1", "  nice colours "))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let json = body_json(resp).await;
    assert_eq!(json["comments"][0]["text"], "nice colours");
    assert_eq!(json["comments"][0]["author_id"], "u1");

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/api/projects/p1/thumbnails/t1/comments")
                .header("x-user-id", "u1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["comments"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn other_project_cannot_reach_thumbnail() {
    let app = build_app(seeded_store(), 10);
    let resp = app
        .oneshot(post_comment("/api/projects/p2/thumbnails/t1/comments", "u1", "hello"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await["error"]["code"], "not_found");
}

#[tokio::test]
async fn empty_and_oversized_text_rejected() {
    let app = build_app(seeded_store(), 10);
    let resp = app
        .clone()
        .oneshot(post_comment("/api/projects/p1/thumbnails/t1/comments", "u1", "   "))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let long = "x".repeat(51);
    let resp = app
        .oneshot(post_comment("/api/projects/p1/thumbnails/t1/comments", "u1", &long))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"]["code"], "invalid_request");
}

#[tokio::test]
async fn comment_route_is_rate_limited_per_user() {
    let app = build_app(seeded_store(), 2);
    let path = "/api/projects/p1/thumbnails/t1/comments";

    for text in ["one", "two"] {
        let resp = app.clone().oneshot(post_comment(path, "u1", text)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let resp = app.clone().oneshot(post_comment(path, "u1", "three")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    let json = body_json(resp).await;
    assert_eq!(json["error"]["code"], "rate_limited");
    assert_eq!(json["error"]["route"], "comment:create");
    assert_eq!(json["error"]["message"], "Slow down, commenter.");

    // a different user has a separate budget
    let resp = app.oneshot(post_comment(path, "u2", "hi")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn create_then_comment_on_new_thumbnail() {
    let app = build_app(Arc::new(MemoryStore::new()), 10);
    let create = || {
        Request::builder()
            .method("PUT")
            .uri("/api/projects/p9/thumbnails/fresh")
            .header("x-forwarded-for", "203.0.113.9")
            .body(Body::empty())
            .unwrap()
    };

    let resp = app.clone().oneshot(create()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = app.clone().oneshot(create()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(resp).await["error"]["code"], "already_exists");

    let resp = app
        .oneshot(post_comment("/api/projects/p9/thumbnails/fresh/comments", "u1", "first!"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn concurrent_posts_keep_every_comment() {
    let store = seeded_store();
    let app = build_app(Arc::clone(&store), 100);

    let handles: Vec<_> = (0..2)
        .map(|i| {
            let app = app.clone();
            tokio::spawn(async move {
                let req = post_comment(
                    "/api/projects/p1/thumbnails/t1/comments",
                    &format!("user{}", i),
                    &format!("comment {}", i),
                );
                app.oneshot(req).await.unwrap().status()
            })
        })
        .collect();
    for h in handles {
        assert_eq!(h.await.unwrap(), StatusCode::CREATED);
    }

    let snap = store.get("t1", &Scope::project("p1")).await.unwrap().unwrap();
    assert_eq!(snap.comments.len(), 2);
}

fn create_behind_proxy(id: &str, client: &str) -> Request<Body> {
    let mut req = Request::builder()
        .method("PUT")
        .uri(format!("/api/projects/p1/thumbnails/{}", id))
        .header("x-forwarded-for", client)
        .body(Body::empty())
        .unwrap();
    let proxy: SocketAddr = "10.0.0.1:443".parse().unwrap();
    req.extensions_mut().insert(ConnectInfo(proxy));
    req
}

#[tokio::test]
async fn anonymous_callers_behind_proxy() {
    let policies = || {
        let mut table = PolicyTable::default();
        table
            .insert(THUMBNAIL_CREATE, RoutePolicy::new(1, 60_000, "wait"))
            .unwrap();
        table
    };

    // untrusted: everyone behind the proxy shares its bucket
    let app = build_app_with(Arc::new(MemoryStore::new()), 10, policies(), false);
    let resp = app.clone().oneshot(create_behind_proxy("a", "203.0.113.1")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let resp = app.oneshot(create_behind_proxy("b", "203.0.113.2")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

    // trusted: each forwarded client gets its own budget
    let app = build_app_with(Arc::new(MemoryStore::new()), 10, policies(), true);
    let resp = app.clone().oneshot(create_behind_proxy("a", "203.0.113.1")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let resp = app.clone().oneshot(create_behind_proxy("b", "203.0.113.2")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let resp = app.oneshot(create_behind_proxy("c", "203.0.113.1")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
}
