//! Admin overview endpoints
//!
//! - GET /api/admin/dashboard - Collection counts
//! - GET /api/admin/activity - Recent admin actions (`limit`, `entity_type`)

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{ActivityLog, Permission};

const DEFAULT_ACTIVITY_LIMIT: usize = 50;
const MAX_ACTIVITY_LIMIT: usize = 500;

/// Response for dashboard stats
#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub blog_posts: i64,
    pub properties: i64,
    pub testimonials: i64,
    pub subscribers: i64,
    pub contact_messages: i64,
    pub users: i64,
}

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<usize>,
    pub entity_type: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/dashboard", get(dashboard))
        .route("/admin/activity", get(recent_activity))
}

async fn dashboard(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<DashboardResponse>, ApiError> {
    user.require(Permission::ViewContent)?;
    let repos = &state.repos;

    Ok(Json(DashboardResponse {
        blog_posts: repos.blog_posts.count().await?,
        properties: repos.properties.count().await?,
        testimonials: repos.testimonials.count().await?,
        subscribers: repos.subscribers.count().await?,
        contact_messages: repos.contacts.count().await?,
        users: repos.users.count().await?,
    }))
}

async fn recent_activity(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<Vec<ActivityLog>>, ApiError> {
    user.require(Permission::ViewActivity)?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_ACTIVITY_LIMIT)
        .clamp(1, MAX_ACTIVITY_LIMIT);
    let entity_type = query.entity_type.as_deref().filter(|t| !t.is_empty());

    Ok(Json(state.activity.recent(limit, entity_type).await?))
}
