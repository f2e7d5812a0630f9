//! Router-level tests for the two viewer endpoints.

use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use http_body_util::BodyExt;
use tower::ServiceExt;

use irc_viewer::{
    bridge::ChannelEventBridge,
    history::HistoryStore,
    hub::BroadcastHub,
    irc::ChatEvent,
    routes,
    state::{shared_history, AppState},
    utils::auth::{Credentials, REALM},
};

struct Fixture {
    dir:    tempfile::TempDir,
    app:    Router,
    bridge: ChannelEventBridge,
}

async fn fixture(capacity: usize, auth: Option<&str>) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let history = shared_history(HistoryStore::load(dir.path().join("h.log"), capacity).await);
    let hub = BroadcastHub::new();
    let creds = auth.map(|a| Credentials::parse(a).unwrap());
    let state = AppState::new(history.clone(), hub.clone(), creds);
    let app = routes::app(state, dir.path());
    Fixture { dir, app, bridge: ChannelEventBridge::new(history, hub) }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn get_as(uri: &str, user_pass: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Basic {}", STANDARD.encode(user_pass)))
        .body(Body::empty())
        .unwrap()
}

async fn body_json(resp: axum::response::Response) -> serde_json::Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn wait_for_waiters(bridge: &ChannelEventBridge, n: usize) {
    for _ in 0..200 {
        if bridge.hub().waiting() == n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("expected {n} waiting clients, have {}", bridge.hub().waiting());
}

#[tokio::test]
async fn history_returns_sanitized_recent_actions() {
    let f = fixture(2, None).await;
    for (user, text) in [("alice!a@h", "<hi>"), ("bob!b@h", "two"), ("carol!c@h", "three & more")] {
        f.bridge.handle(ChatEvent::Message { user: user.into(), text: text.into() }).await.unwrap();
    }

    let resp = f.app.clone().oneshot(get("/history.js")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/json");

    let v = body_json(resp).await;
    let list = v.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["user"], "bob");
    assert_eq!(list[1]["user"], "carol");
    assert_eq!(list[1]["message"], "three &amp; more");
}

#[tokio::test]
async fn update_is_held_until_next_event() {
    let f = fixture(10, None).await;
    let app = f.app.clone();
    let poll = tokio::spawn(async move { app.oneshot(get("/update.js")).await.unwrap() });

    wait_for_waiters(&f.bridge, 1).await;
    assert!(!poll.is_finished());

    f.bridge.handle(ChatEvent::Joined { user: "dave!d@h".into() }).await.unwrap();
    let resp = poll.await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/json");

    let v = body_json(resp).await;
    assert_eq!(v["command"], "user_joined");
    assert_eq!(v["user"], "dave");
    assert!(v.get("message").is_none());
    assert_eq!(f.bridge.hub().waiting(), 0);
}

#[tokio::test]
async fn aborted_poll_unregisters() {
    let f = fixture(10, None).await;
    let app = f.app.clone();
    let gone = tokio::spawn(async move { app.oneshot(get("/update.js")).await });
    let app = f.app.clone();
    let stays = tokio::spawn(async move { app.oneshot(get("/update.js")).await.unwrap() });
    wait_for_waiters(&f.bridge, 2).await;

    gone.abort();
    let _ = gone.await;
    wait_for_waiters(&f.bridge, 1).await;

    f.bridge.handle(ChatEvent::Quit { user: "erin".into() }).await.unwrap();
    let v = body_json(stays.await.unwrap()).await;
    assert_eq!(v["command"], "user_quit");
}

#[tokio::test]
async fn auth_gate_applies_to_both_endpoints() {
    let f = fixture(10, Some("me:secret")).await;

    for uri in ["/history.js", "/update.js"] {
        let resp = f.app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(resp.headers()[header::WWW_AUTHENTICATE], REALM);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());

        let resp = f.app.clone().oneshot(get_as(uri, "me:nope")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }
    assert_eq!(f.bridge.hub().waiting(), 0);

    let resp = f.app.clone().oneshot(get_as("/history.js", "me:secret")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, serde_json::json!([]));
}

#[tokio::test]
async fn static_files_are_served() {
    let f = fixture(10, None).await;
    tokio::fs::write(f.dir.path().join("index.html"), "<p>viewer</p>").await.unwrap();

    let resp = f.app.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"<p>viewer</p>");
}
