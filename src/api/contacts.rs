//! Contact form API endpoints
//!
//! - POST /api/contact
//! - GET /api/admin/contacts - `status` filter
//! - PUT /api/admin/contacts/{id}/status
//! - DELETE /api/admin/contacts/{id}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};

use super::middleware::{parse_filter, ApiError, ApiJson, AppState, AuthenticatedUser, ClientIp};
use super::subscribers::check_form_rate;
use super::StatusQuery;
use crate::models::{ContactInput, ContactMessage, Permission, UpdateContactStatusInput};

pub fn public_router() -> Router<AppState> {
    Router::new().route("/", post(submit))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_messages))
        .route("/{id}/status", put(set_status))
        .route("/{id}", delete(delete_message))
}

async fn submit(
    State(state): State<AppState>,
    ip: ClientIp,
    ApiJson(input): ApiJson<ContactInput>,
) -> Result<(StatusCode, Json<ContactMessage>), ApiError> {
    check_form_rate(&state, &ip).await?;
    let message = state.contacts.submit(input).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

async fn list_messages(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Vec<ContactMessage>>, ApiError> {
    user.require(Permission::ManageSubscribers)?;
    let status = parse_filter(query.status.as_deref(), "status")?;
    Ok(Json(state.contacts.list(status).await?))
}

async fn set_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<UpdateContactStatusInput>,
) -> Result<Json<ContactMessage>, ApiError> {
    user.require(Permission::ManageSubscribers)?;
    Ok(Json(
        state
            .contacts
            .set_status(&id, input.status, &user.actor(&ip))
            .await?,
    ))
}

async fn delete_message(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    user.require(Permission::ManageSubscribers)?;
    state.contacts.delete(&id, &user.actor(&ip)).await?;
    Ok(StatusCode::NO_CONTENT)
}
