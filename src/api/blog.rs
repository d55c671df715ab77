//! Blog API endpoints
//!
//! Public:
//! - GET /api/blog - Published posts (`category`, `tag` filters)
//! - GET /api/blog/{slug} - One published post, counts a view
//!
//! Admin:
//! - GET|POST /api/admin/blog
//! - GET|PUT|DELETE /api/admin/blog/{id}
//! - GET /api/admin/blog/{id}/versions
//! - POST /api/admin/blog/{id}/versions/{version}/restore

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use super::middleware::{parse_filter, ApiError, ApiJson, AppState, AuthenticatedUser, ClientIp};
use super::StatusQuery;
use crate::models::{
    BlogPost, ContentStatus, ContentVersion, CreateBlogPostInput, Permission, UpdateBlogPostInput,
};
use crate::services::BlogFilter;

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_published))
        .route("/{slug}", get(get_published))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_posts).post(create_post))
        .route("/{id}", get(get_post).put(update_post).delete(delete_post))
        .route("/{id}/versions", get(list_versions))
        .route("/{id}/versions/{version}/restore", post(restore_version))
}

/// Publishing and scheduling need more than `manage_content`
pub(crate) fn require_publish(
    user: &AuthenticatedUser,
    status: Option<ContentStatus>,
) -> Result<(), ApiError> {
    match status {
        Some(ContentStatus::Published | ContentStatus::Scheduled) => {
            user.require(Permission::PublishContent)
        }
        _ => Ok(()),
    }
}

async fn list_published(
    State(state): State<AppState>,
    Query(filter): Query<BlogFilter>,
) -> Result<Json<Vec<BlogPost>>, ApiError> {
    Ok(Json(state.blog.list_public(&filter).await?))
}

async fn get_published(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<BlogPost>, ApiError> {
    Ok(Json(state.blog.view_public(&slug).await?))
}

async fn list_posts(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Vec<BlogPost>>, ApiError> {
    user.require(Permission::ViewContent)?;
    let status = parse_filter(query.status.as_deref(), "status")?;
    Ok(Json(state.blog.list(status).await?))
}

async fn get_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<BlogPost>, ApiError> {
    user.require(Permission::ViewContent)?;
    Ok(Json(state.blog.get(&id).await?))
}

async fn create_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    ApiJson(input): ApiJson<CreateBlogPostInput>,
) -> Result<(StatusCode, Json<BlogPost>), ApiError> {
    user.require(Permission::ManageContent)?;
    require_publish(&user, input.status)?;
    let post = state.blog.create(input, &user.actor(&ip)).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn update_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<UpdateBlogPostInput>,
) -> Result<Json<BlogPost>, ApiError> {
    user.require(Permission::ManageContent)?;
    require_publish(&user, input.status)?;
    Ok(Json(state.blog.update(&id, input, &user.actor(&ip)).await?))
}

async fn delete_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    user.require(Permission::ManageContent)?;
    state.blog.delete(&id, &user.actor(&ip)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_versions(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<ContentVersion>>, ApiError> {
    user.require(Permission::ViewContent)?;
    Ok(Json(state.blog.versions(&id).await?))
}

async fn restore_version(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Path((id, version)): Path<(String, i32)>,
) -> Result<Json<BlogPost>, ApiError> {
    user.require(Permission::ManageContent)?;
    user.require(Permission::PublishContent)?;
    Ok(Json(state.blog.restore(&id, version, &user.actor(&ip)).await?))
}
