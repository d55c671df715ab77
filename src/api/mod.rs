//! API layer - HTTP handlers and routing
//!
//! All endpoints live under `/api`:
//! - Public site data (blog, properties, testimonials)
//! - Public forms (newsletter, contact)
//! - Admin panel endpoints under `/api/admin`, behind a session
//!
//! Every other path is served from the static front-end directory.

pub mod admin;
pub mod auth;
pub mod blog;
pub mod contacts;
pub mod middleware;
pub mod properties;
pub mod subscribers;
pub mod testimonials;
pub mod users;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::config::ServerConfig;

pub use middleware::{ApiError, ApiJson, AppState, AuthenticatedUser, ClientIp};

/// `?status=` filter of admin list endpoints
#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

/// Build the `/api` router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Admin routes (need a valid session; permissions are checked per handler)
    let admin_routes = Router::new()
        .merge(auth::protected_router())
        .merge(admin::router())
        .nest("/admin/blog", blog::admin_router())
        .nest("/admin/properties", properties::admin_router())
        .nest("/admin/testimonials", testimonials::admin_router())
        .nest("/admin/subscribers", subscribers::admin_router())
        .nest("/admin/contacts", contacts::admin_router())
        .nest("/admin/users", users::router())
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ));

    // Public routes
    Router::new()
        .route("/health", get(health))
        .nest("/blog", blog::public_router())
        .nest("/properties", properties::public_router())
        .nest("/testimonials", testimonials::public_router())
        .nest("/newsletter", subscribers::public_router())
        .nest("/contact", contacts::public_router())
        .merge(auth::public_router())
        .merge(admin_routes)
        .fallback(api_not_found)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, server: &ServerConfig) -> Router {
    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);
    match server.cors_origin.parse::<HeaderValue>() {
        Ok(origin) => cors = cors.allow_origin(origin),
        Err(_) => tracing::warn!("Ignoring invalid CORS origin {:?}", server.cors_origin),
    }

    // Unknown paths fall back to the front end's index.html
    let static_files = ServeDir::new(&server.static_dir)
        .fallback(ServeFile::new(server.static_dir.join("index.html")));

    Router::new()
        .nest("/api", build_api_router(state.clone()))
        .fallback_service(static_files)
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn api_not_found() -> ApiError {
    ApiError::not_found("No such API endpoint")
}
