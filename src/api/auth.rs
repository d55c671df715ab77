//! Admin authentication endpoints
//!
//! - POST /api/admin/auth/login - Username or email plus password
//! - POST /api/admin/auth/logout
//! - GET /api/admin/auth/me

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use super::middleware::{
    extract_session_token, ApiError, ApiJson, AppState, AuthenticatedUser, ClientIp,
};
use crate::models::UserResponse;
use crate::services::LoginInput;

/// Response for a successful login
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

/// Routes reachable without a session
pub fn public_router() -> Router<AppState> {
    Router::new().route("/admin/auth/login", post(login))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/admin/auth/logout", post(logout))
        .route("/admin/auth/me", get(me))
}

async fn login(
    State(state): State<AppState>,
    ip: ClientIp,
    ApiJson(input): ApiJson<LoginInput>,
) -> Result<impl IntoResponse, ApiError> {
    let (session, user) = state
        .users
        .login(input, ip.0.map(|ip| ip.to_string()))
        .await?;

    let max_age = (session.expires_at - session.created_at).num_seconds().max(0);
    let cookie = format!(
        "session={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        session.token, max_age
    );

    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie).map_err(ApiError::internal_error)?,
    );

    Ok((
        headers,
        Json(AuthResponse {
            user: UserResponse::from(&user),
            token: session.token,
            expires_at: session.expires_at,
        }),
    ))
}

async fn logout(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    request_headers: HeaderMap,
) -> impl IntoResponse {
    if let Some(token) = extract_session_token(&request_headers) {
        state.users.logout(&token).await;
    }

    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_static("session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"),
    );
    (StatusCode::NO_CONTENT, headers)
}

async fn me(user: AuthenticatedUser) -> Json<UserResponse> {
    Json(UserResponse::from(&user.0))
}
