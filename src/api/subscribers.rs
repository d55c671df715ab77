//! Newsletter API endpoints
//!
//! - POST /api/newsletter - Subscribe (201 new, 200 already subscribed or resubscribed)
//! - POST /api/newsletter/unsubscribe
//! - GET /api/admin/subscribers - `status` filter
//! - DELETE /api/admin/subscribers/{id}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;

use super::middleware::{parse_filter, ApiError, ApiJson, AppState, AuthenticatedUser, ClientIp};
use super::StatusQuery;
use crate::models::{NewsletterSubscriber, Permission, SubscribeInput, UnsubscribeInput};
use crate::services::SubscribeOutcome;

#[derive(Debug, Serialize)]
pub struct SubscribeResponse {
    pub message: &'static str,
    pub subscriber: NewsletterSubscriber,
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", post(subscribe))
        .route("/unsubscribe", post(unsubscribe))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_subscribers))
        .route("/{id}", delete(delete_subscriber))
}

/// Reject the request when `ip` has sent too many public forms
pub(crate) async fn check_form_rate(state: &AppState, ip: &ClientIp) -> Result<(), ApiError> {
    if let Some(ip) = ip.0 {
        if !state.rate_limiter.allow_form_submission(ip).await {
            tracing::warn!("Form rate limit exceeded for {}", ip);
            return Err(ApiError::rate_limited(
                "Too many submissions, please try again in a minute",
            ));
        }
    }
    Ok(())
}

async fn subscribe(
    State(state): State<AppState>,
    ip: ClientIp,
    ApiJson(input): ApiJson<SubscribeInput>,
) -> Result<(StatusCode, Json<SubscribeResponse>), ApiError> {
    check_form_rate(&state, &ip).await?;
    let (subscriber, outcome) = state.subscribers.subscribe(input).await?;

    let (status, message) = match outcome {
        SubscribeOutcome::Created => (StatusCode::CREATED, "Subscribed"),
        SubscribeOutcome::Resubscribed => (StatusCode::OK, "Subscription renewed"),
        SubscribeOutcome::AlreadyActive => (StatusCode::OK, "Already subscribed"),
    };
    Ok((status, Json(SubscribeResponse { message, subscriber })))
}

async fn unsubscribe(
    State(state): State<AppState>,
    ip: ClientIp,
    ApiJson(input): ApiJson<UnsubscribeInput>,
) -> Result<StatusCode, ApiError> {
    check_form_rate(&state, &ip).await?;
    state.subscribers.unsubscribe(input).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_subscribers(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Vec<NewsletterSubscriber>>, ApiError> {
    user.require(Permission::ManageSubscribers)?;
    let status = parse_filter(query.status.as_deref(), "status")?;
    Ok(Json(state.subscribers.list(status).await?))
}

async fn delete_subscriber(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    user.require(Permission::ManageSubscribers)?;
    state.subscribers.delete(&id, &user.actor(&ip)).await?;
    Ok(StatusCode::NO_CONTENT)
}
