//! Testimonial API endpoints
//!
//! - GET /api/testimonials - Published testimonials (`featured` filter)
//! - /api/admin/testimonials - CRUD, versions and restore

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use super::blog::require_publish;
use super::middleware::{parse_filter, ApiError, ApiJson, AppState, AuthenticatedUser, ClientIp};
use super::StatusQuery;
use crate::models::{
    ContentVersion, CreateTestimonialInput, Permission, Testimonial, UpdateTestimonialInput,
};

#[derive(Debug, Default, Deserialize)]
pub struct FeaturedQuery {
    pub featured: Option<bool>,
}

pub fn public_router() -> Router<AppState> {
    Router::new().route("/", get(list_published))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_testimonials).post(create_testimonial))
        .route(
            "/{id}",
            get(get_testimonial)
                .put(update_testimonial)
                .delete(delete_testimonial),
        )
        .route("/{id}/versions", get(list_versions))
        .route("/{id}/versions/{version}/restore", post(restore_version))
}

async fn list_published(
    State(state): State<AppState>,
    Query(query): Query<FeaturedQuery>,
) -> Result<Json<Vec<Testimonial>>, ApiError> {
    Ok(Json(state.testimonials.list_public(query.featured).await?))
}

async fn list_testimonials(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Vec<Testimonial>>, ApiError> {
    user.require(Permission::ViewContent)?;
    let status = parse_filter(query.status.as_deref(), "status")?;
    Ok(Json(state.testimonials.list(status).await?))
}

async fn get_testimonial(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<Testimonial>, ApiError> {
    user.require(Permission::ViewContent)?;
    Ok(Json(state.testimonials.get(&id).await?))
}

async fn create_testimonial(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    ApiJson(input): ApiJson<CreateTestimonialInput>,
) -> Result<(StatusCode, Json<Testimonial>), ApiError> {
    user.require(Permission::ManageContent)?;
    require_publish(&user, input.status)?;
    let testimonial = state.testimonials.create(input, &user.actor(&ip)).await?;
    Ok((StatusCode::CREATED, Json(testimonial)))
}

async fn update_testimonial(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<UpdateTestimonialInput>,
) -> Result<Json<Testimonial>, ApiError> {
    user.require(Permission::ManageContent)?;
    require_publish(&user, input.status)?;
    Ok(Json(
        state.testimonials.update(&id, input, &user.actor(&ip)).await?,
    ))
}

async fn delete_testimonial(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    user.require(Permission::ManageContent)?;
    state.testimonials.delete(&id, &user.actor(&ip)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_versions(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<ContentVersion>>, ApiError> {
    user.require(Permission::ViewContent)?;
    Ok(Json(state.testimonials.versions(&id).await?))
}

async fn restore_version(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ip: ClientIp,
    Path((id, version)): Path<(String, i32)>,
) -> Result<Json<Testimonial>, ApiError> {
    user.require(Permission::ManageContent)?;
    user.require(Permission::PublishContent)?;
    Ok(Json(
        state
            .testimonials
            .restore(&id, version, &user.actor(&ip))
            .await?,
    ))
}
