//! HTTP API tests over JSON storage in a temporary directory

use axum::{
    body::{to_bytes, Body},
    extract::ConnectInfo,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use tempfile::TempDir;
use tower::ServiceExt;

use keystone::{
    api::{build_router, AppState},
    config::Config,
    db::Repositories,
};

const ADMIN_PASSWORD: &str = "correct horse battery";

async fn setup() -> (TempDir, Router) {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.storage.data_dir = dir.path().to_path_buf();
    config.server.static_dir = dir.path().join("public");
    config.auth.initial_admin_password = Some(ADMIN_PASSWORD.to_string());

    let state = AppState::new(Repositories::json(dir.path()), &config);
    state.users.bootstrap_admin(&config.auth).await.unwrap();
    let app = build_router(state, &config.server);
    (dir, app)
}

async fn send(
    app: &Router,
    method: Method,
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
    send_request(app, request).await
}

async fn send_request(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn login(app: &Router) -> String {
    login_as(app, "admin", ADMIN_PASSWORD).await
}

async fn login_as(app: &Router, username: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/admin/auth/login",
        None,
        Some(json!({"username": username, "password": password})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let (_dir, app) = setup().await;
    let (status, body) = send(&app, Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_public_lists_start_empty() {
    let (_dir, app) = setup().await;
    for uri in ["/api/blog", "/api/properties", "/api/testimonials"] {
        let (status, body) = send(&app, Method::GET, uri, None, None).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(body, json!([]), "{uri}");
    }
}

#[tokio::test]
async fn test_unknown_api_path_is_json_404() {
    let (_dir, app) = setup().await;
    let (status, body) = send(&app, Method::GET, "/api/nope", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_admin_requires_session() {
    let (_dir, app) = setup().await;
    for uri in ["/api/admin/blog", "/api/admin/users", "/api/admin/dashboard"] {
        let (status, body) = send(&app, Method::GET, uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    }

    let (status, _) = send(&app, Method::GET, "/api/admin/blog", Some("bogus"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_password_is_rejected() {
    let (_dir, app) = setup().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/admin/auth/login",
        None,
        Some(json!({"username": "admin", "password": "wrong"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.get("token").is_none());
}

#[tokio::test]
async fn test_login_me_and_logout() {
    let (_dir, app) = setup().await;
    let token = login(&app).await;

    let (status, me) = send(&app, Method::GET, "/api/admin/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "admin");
    assert!(me.get("password_hash").is_none());

    let (status, _) = send(&app, Method::POST, "/api/admin/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::GET, "/api/admin/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_blog_post_lifecycle() {
    let (_dir, app) = setup().await;
    let token = login(&app).await;

    let (status, draft) = send(
        &app,
        Method::POST,
        "/api/admin/blog",
        Some(&token),
        Some(json!({"title": "Building on a Slope", "content": "Retaining walls **first**."})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{draft}");
    assert_eq!(draft["slug"], "building-on-a-slope");
    assert_eq!(draft["status"], "draft");
    let id = draft["id"].as_str().unwrap().to_string();

    // Drafts stay hidden
    let (status, _) = send(&app, Method::GET, "/api/blog/building-on-a-slope", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, published) = send(
        &app,
        Method::PUT,
        &format!("/api/admin/blog/{id}"),
        Some(&token),
        Some(json!({"status": "published"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{published}");
    assert!(published["published_at"].is_string());

    let (status, post) = send(&app, Method::GET, "/api/blog/building-on-a-slope", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(post["content_html"].as_str().unwrap().contains("<strong>first</strong>"));

    let (status, list) = send(&app, Method::GET, "/api/blog", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, versions) = send(
        &app,
        Method::GET,
        &format!("/api/admin/blog/{id}/versions"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(versions.as_array().unwrap().len(), 1);

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/admin/blog/{id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::GET, "/api/blog/building-on-a-slope", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_newsletter_signup() {
    let (_dir, app) = setup().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/newsletter",
        None,
        Some(json!({"email": "not-an-email"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/newsletter",
        None,
        Some(json!({"email": "Buyer@Example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Signing up twice is not an error
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/newsletter",
        None,
        Some(json!({"email": "buyer@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let token = login(&app).await;
    let (status, subscribers) =
        send(&app, Method::GET, "/api/admin/subscribers", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let subscribers = subscribers.as_array().unwrap();
    assert_eq!(subscribers.len(), 1);
    assert_eq!(subscribers[0]["email"], "buyer@example.com");
}

#[tokio::test]
async fn test_contact_form() {
    let (_dir, app) = setup().await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/contact",
        None,
        Some(json!({"name": "", "email": "a@b.co", "message": "too short"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/contact",
        None,
        Some(json!({
            "name": "Maria",
            "email": "maria@example.com",
            "message": "I would like to visit the lake house next week."
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let token = login(&app).await;
    let (status, messages) =
        send(&app, Method::GET, "/api/admin/contacts", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(messages.as_array().unwrap().len(), 1);

    let (status, dashboard) =
        send(&app, Method::GET, "/api/admin/dashboard", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["contact_messages"], 1);
    assert_eq!(dashboard["users"], 1);
}

#[tokio::test]
async fn test_malformed_json_uses_error_body() {
    let (_dir, app) = setup().await;

    let (status, body) = send(&app, Method::POST, "/api/newsletter", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/contact")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send_request(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_viewer_cannot_create_posts() {
    let (_dir, app) = setup().await;
    let token = login(&app).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/admin/users",
        Some(&token),
        Some(json!({
            "username": "reader",
            "email": "reader@example.com",
            "password": "reader password",
            "role": "viewer"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let viewer = login_as(&app, "reader", "reader password").await;
    let (status, _) = send(&app, Method::GET, "/api/admin/blog", Some(&viewer), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/admin/blog",
        Some(&viewer),
        Some(json!({"title": "Not allowed", "content": "Viewers only read."})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_duplicate_explicit_slug_conflicts() {
    let (_dir, app) = setup().await;
    let token = login(&app).await;
    let post = json!({"title": "Open House", "slug": "open-house", "content": "Saturday at ten."});

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/admin/blog",
        Some(&token),
        Some(post.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) =
        send(&app, Method::POST, "/api/admin/blog", Some(&token), Some(post)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn test_contact_form_is_rate_limited_per_client() {
    let (_dir, app) = setup().await;
    let client: SocketAddr = "198.51.100.7:52000".parse().unwrap();

    // Forwarded headers are ignored unless the proxy is trusted, so rotating
    // them does not reset the limit
    let submit = |n: usize| {
        let body = json!({
            "name": "Maria",
            "email": "maria@example.com",
            "message": format!("Question number {n} about the lake house."),
        });
        let mut request = Request::builder()
            .method(Method::POST)
            .uri("/api/contact")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", format!("10.0.0.{n}"))
            .body(Body::from(body.to_string()))
            .unwrap();
        request.extensions_mut().insert(ConnectInfo(client));
        request
    };

    for n in 0..10 {
        let (status, body) = send_request(&app, submit(n)).await;
        assert_eq!(status, StatusCode::CREATED, "{n}: {body}");
    }
    let (status, body) = send_request(&app, submit(10)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"]["code"], "RATE_LIMITED");
}
