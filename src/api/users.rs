//! Admin user management endpoints (`manage_users` permission)
//!
//! - GET|POST /api/admin/users
//! - PUT|DELETE /api/admin/users/{id}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};

use super::middleware::{ApiError, ApiJson, AppState, AuthenticatedUser, ClientIp};
use crate::models::{CreateUserInput, Permission, UpdateUserInput, UserResponse};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/{id}", put(update_user).delete(delete_user))
}

async fn list_users(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    user.require(Permission::ManageUsers)?;
    let users = state.users.list().await?;
    Ok(Json(users.iter().map(UserResponse::from).collect()))
}

async fn create_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    ApiJson(input): ApiJson<CreateUserInput>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    user.require(Permission::ManageUsers)?;
    let created = state.users.create(input, &user.actor(&ip)).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(&created))))
}

async fn update_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<UpdateUserInput>,
) -> Result<Json<UserResponse>, ApiError> {
    user.require(Permission::ManageUsers)?;
    let updated = state.users.update(&id, input, &user.actor(&ip)).await?;
    Ok(Json(UserResponse::from(&updated)))
}

async fn delete_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    user.require(Permission::ManageUsers)?;
    state.users.delete(&id, &user.actor(&ip)).await?;
    Ok(StatusCode::NO_CONTENT)
}
