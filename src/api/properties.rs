//! Property listing API endpoints
//!
//! Public:
//! - GET /api/properties - Published listings (`property_type`, `listing`,
//!   `city`, `featured` filters)
//! - GET /api/properties/{slug}
//!
//! Admin: the same CRUD, version and restore routes as the blog under
//! /api/admin/properties.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use super::blog::require_publish;
use super::middleware::{parse_filter, ApiError, ApiJson, AppState, AuthenticatedUser, ClientIp};
use super::StatusQuery;
use crate::models::{
    ContentVersion, CreatePropertyInput, Permission, Property, UpdatePropertyInput,
};
use crate::services::PropertyFilter;

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_published))
        .route("/{slug}", get(get_published))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_properties).post(create_property))
        .route(
            "/{id}",
            get(get_property).put(update_property).delete(delete_property),
        )
        .route("/{id}/versions", get(list_versions))
        .route("/{id}/versions/{version}/restore", post(restore_version))
}

async fn list_published(
    State(state): State<AppState>,
    Query(filter): Query<PropertyFilter>,
) -> Result<Json<Vec<Property>>, ApiError> {
    Ok(Json(state.properties.list_public(&filter).await?))
}

async fn get_published(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Property>, ApiError> {
    Ok(Json(state.properties.get_public(&slug).await?))
}

async fn list_properties(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Vec<Property>>, ApiError> {
    user.require(Permission::ViewContent)?;
    let status = parse_filter(query.status.as_deref(), "status")?;
    Ok(Json(state.properties.list(status).await?))
}

async fn get_property(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<Property>, ApiError> {
    user.require(Permission::ViewContent)?;
    Ok(Json(state.properties.get(&id).await?))
}

async fn create_property(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    ApiJson(input): ApiJson<CreatePropertyInput>,
) -> Result<(StatusCode, Json<Property>), ApiError> {
    user.require(Permission::ManageContent)?;
    require_publish(&user, input.status)?;
    let property = state.properties.create(input, &user.actor(&ip)).await?;
    Ok((StatusCode::CREATED, Json(property)))
}

async fn update_property(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<UpdatePropertyInput>,
) -> Result<Json<Property>, ApiError> {
    user.require(Permission::ManageContent)?;
    require_publish(&user, input.status)?;
    Ok(Json(
        state.properties.update(&id, input, &user.actor(&ip)).await?,
    ))
}

async fn delete_property(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    user.require(Permission::ManageContent)?;
    state.properties.delete(&id, &user.actor(&ip)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_versions(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<ContentVersion>>, ApiError> {
    user.require(Permission::ViewContent)?;
    Ok(Json(state.properties.versions(&id).await?))
}

async fn restore_version(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Path((id, version)): Path<(String, i32)>,
) -> Result<Json<Property>, ApiError> {
    user.require(Permission::ManageContent)?;
    user.require(Permission::PublishContent)?;
    Ok(Json(
        state
            .properties
            .restore(&id, version, &user.actor(&ip))
            .await?,
    ))
}
