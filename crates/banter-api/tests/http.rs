use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use banter_api::build_router;
use banter_api::dispatcher::Dispatcher;
use banter_api::state::{AppState, AppStateInner};
use banter_core::cache::{DiscussionCache, FolderCache, UserCache};
use banter_core::mail::RecordingMailer;
use banter_db::Database;

fn test_state() -> AppState {
    let db = Database::open_in_memory().unwrap();
    Arc::new(AppStateInner {
        db,
        user_cache: UserCache::new(),
        folder_cache: FolderCache::new(),
        discussion_cache: DiscussionCache::new(),
        dispatcher: Dispatcher::new(),
        mailer: Arc::new(RecordingMailer::new()),
        jwt_secret: "test-secret".to_string(),
    })
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn register(app: &Router, username: &str) -> (i64, String) {
    let (status, body) = send(
        app,
        "POST",
        "/auth/register",
        None,
        Some(json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "correct horse battery",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let user_id = body["user"]["id"].as_i64().unwrap();
    let token = body["token"].as_str().unwrap().to_string();
    (user_id, token)
}

#[tokio::test]
async fn register_login_and_profile() {
    let state = test_state();
    let app = build_router(state);

    let (_, token) = register(&app, "johnny").await;

    let (status, body) = send(&app, "GET", "/user", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "johnny");
    assert_eq!(body["confirmed"], false);

    let (status, body) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "username": "johnny", "password": "correct horse battery" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].as_str().is_some());

    let (status, _) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "username": "johnny", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_are_guarded() {
    let state = test_state();
    let app = build_router(state.clone());

    let (status, _) = send(&app, "GET", "/admin/moderation/queue", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (user_id, token) = register(&app, "johnny").await;
    let (status, body) = send(&app, "GET", "/admin/moderation/queue", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Forbidden");

    state.db.set_user_flag(user_id, "is_admin", true).unwrap();
    state.user_cache.flush(user_id).unwrap();

    let (status, body) = send(&app, "GET", "/admin/moderation/queue", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn subscription_front_page_over_http() {
    let state = test_state();
    let app = build_router(state.clone());

    let (author_id, _) = register(&app, "author").await;
    let (_, reader_token) = register(&app, "reader").await;

    let folder = state.db.insert_folder("music", "Music").unwrap();
    let discussion = state
        .db
        .insert_discussion(folder, author_id, "Best Gigs Ever", "")
        .unwrap();

    let uri = format!("/discussions/{discussion}/subscription");
    let (status, body) = send(
        &app,
        "PUT",
        &uri,
        Some(&reader_token),
        Some(json!({ "state": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["subscribed"], true);

    state.db.insert_post(discussion, author_id, "first", false).unwrap();

    let (status, body) = send(
        &app,
        "GET",
        "/subscriptions/discussions/check",
        Some(&reader_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(
        entries[0]["url"],
        format!("/music/{discussion}/best-gigs-ever")
    );
}

#[tokio::test]
async fn report_flows_into_the_moderation_queue() {
    let state = test_state();
    let app = build_router(state.clone());

    let (admin_id, admin_token) = register(&app, "admin").await;
    state.db.set_user_flag(admin_id, "is_admin", true).unwrap();
    state.user_cache.flush(admin_id).unwrap();

    let (author_id, _) = register(&app, "author").await;
    let folder = state.db.insert_folder("music", "Music").unwrap();
    let discussion = state
        .db
        .insert_discussion(folder, author_id, "Best gigs", "")
        .unwrap();
    let post = state.db.insert_post(discussion, author_id, "spam spam", false).unwrap();

    // anonymous report
    let (status, _) = send(
        &app,
        "POST",
        &format!("/posts/{post}/report"),
        None,
        Some(json!({
            "reporterName": "anon",
            "reporterEmail": "anon@example.com",
            "body": "this is spam",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) =
        send(&app, "GET", "/admin/moderation/queue", Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let queue = body.as_array().unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0]["username"], "author");
    assert_eq!(queue[0]["post"]["id"].as_i64().unwrap(), post);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/admin/discussions/{discussion}/posts/{post}/comments"),
        Some(&admin_token),
        Some(json!({ "body": "looks nasty", "vote": -1 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["comments"].as_array().unwrap().len(), 1);
    assert_eq!(body["post"]["pending"], true);
}

#[tokio::test]
async fn user_status_and_search() {
    let state = test_state();
    let app = build_router(state.clone());

    let (admin_id, admin_token) = register(&app, "admin").await;
    state.db.set_user_flag(admin_id, "is_admin", true).unwrap();
    state.user_cache.flush(admin_id).unwrap();

    let (target_id, _) = register(&app, "target").await;

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/admin/users/{target_id}/status"),
        Some(&admin_token),
        Some(json!({ "enabled": false, "isWatch": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["enabled"], false);
    assert_eq!(body["isWatch"], true);

    let (status, body) = send(
        &app,
        "GET",
        "/admin/users?term=targ",
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = send(
        &app,
        "GET",
        "/admin/users?filter=banned",
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["username"], "target");

    let (status, _) = send(&app, "GET", "/admin/users", Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
