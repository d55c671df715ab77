//! API middleware
//!
//! Contains:
//! - Shared application state
//! - The JSON error type every handler returns
//! - Session authentication and permission checks

use axum::{
    extract::{
        rejection::JsonRejection, ConnectInfo, FromRequest, FromRequestParts, Request, State,
    },
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use validator::ValidationErrors;

use crate::config::Config;
use crate::db::Repositories;
use crate::models::{AdminUser, Permission};
use crate::services::{
    activity::Actor, ActivityService, BlogService, ContactError, ContactService, ContentError,
    LoginRateLimiter, Mailer, MarkdownRenderer, PropertyService, SubscriberError,
    SubscriberService, TestimonialService, UserService, UserServiceError, VersionService,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub repos: Repositories,
    pub blog: Arc<BlogService>,
    pub properties: Arc<PropertyService>,
    pub testimonials: Arc<TestimonialService>,
    pub subscribers: Arc<SubscriberService>,
    pub contacts: Arc<ContactService>,
    pub users: Arc<UserService>,
    pub activity: Arc<ActivityService>,
    pub rate_limiter: Arc<LoginRateLimiter>,
    /// Honor forwarded client address headers
    pub trust_proxy: bool,
}

impl AppState {
    /// Wire every service on top of the given repositories
    pub fn new(repos: Repositories, config: &Config) -> Self {
        let activity = Arc::new(ActivityService::new(repos.activity.clone()));
        let versions = Arc::new(VersionService::new(repos.versions.clone()));
        let rate_limiter = Arc::new(LoginRateLimiter::new());
        let mailer = Arc::new(Mailer::new(config.mail.clone()));

        Self {
            blog: Arc::new(BlogService::new(
                repos.blog_posts.clone(),
                versions.clone(),
                activity.clone(),
                MarkdownRenderer::new(),
            )),
            properties: Arc::new(PropertyService::new(
                repos.properties.clone(),
                versions.clone(),
                activity.clone(),
            )),
            testimonials: Arc::new(TestimonialService::new(
                repos.testimonials.clone(),
                versions,
                activity.clone(),
            )),
            subscribers: Arc::new(SubscriberService::new(
                repos.subscribers.clone(),
                activity.clone(),
            )),
            contacts: Arc::new(ContactService::new(
                repos.contacts.clone(),
                activity.clone(),
                mailer,
            )),
            users: Arc::new(UserService::new(
                repos.users.clone(),
                activity.clone(),
                rate_limiter.clone(),
                config.auth.session_ttl_hours,
            )),
            activity,
            rate_limiter,
            trust_proxy: config.server.trust_proxy,
            repos,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new("RATE_LIMITED", message)
    }

    /// Logs the cause; clients only see a generic message
    pub fn internal_error(cause: impl std::fmt::Display) -> Self {
        tracing::error!("Internal error: {:#}", cause);
        Self::new("INTERNAL_ERROR", "Internal server error")
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            "RATE_LIMITED" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let details = serde_json::to_value(&errors).unwrap_or_default();
        Self::with_details("VALIDATION_ERROR", "Invalid input", details)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation_error(rejection.body_text())
    }
}

/// `Json` extractor whose rejections use the API error body
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

impl From<ContentError> for ApiError {
    fn from(e: ContentError) -> Self {
        match e {
            ContentError::NotFound(what) => Self::not_found(format!("{} not found", what)),
            ContentError::Validation(msg) => Self::validation_error(msg),
            ContentError::InvalidInput(errors) => errors.into(),
            ContentError::DuplicateSlug(slug) => {
                Self::conflict(format!("Slug already exists: {}", slug))
            }
            ContentError::Internal(e) => Self::internal_error(e),
        }
    }
}

impl From<UserServiceError> for ApiError {
    fn from(e: UserServiceError) -> Self {
        match e {
            UserServiceError::AuthenticationError(msg) => Self::unauthorized(msg),
            UserServiceError::InvalidInput(errors) => errors.into(),
            UserServiceError::ValidationError(msg) => Self::validation_error(msg),
            UserServiceError::UserExists(what) => {
                Self::conflict(format!("User already exists: {}", what))
            }
            UserServiceError::NotFound(what) => Self::not_found(format!("{} not found", what)),
            e @ UserServiceError::LastAdmin => Self::conflict(e.to_string()),
            e @ UserServiceError::RateLimited => Self::rate_limited(e.to_string()),
            UserServiceError::InternalError(e) => Self::internal_error(e),
        }
    }
}

impl From<SubscriberError> for ApiError {
    fn from(e: SubscriberError) -> Self {
        match e {
            SubscriberError::InvalidInput(errors) => errors.into(),
            SubscriberError::NotFound(what) => Self::not_found(format!("{} not found", what)),
            SubscriberError::Internal(e) => Self::internal_error(e),
        }
    }
}

impl From<ContactError> for ApiError {
    fn from(e: ContactError) -> Self {
        match e {
            ContactError::InvalidInput(errors) => errors.into(),
            ContactError::NotFound(what) => Self::not_found(format!("{} not found", what)),
            ContactError::Internal(e) => Self::internal_error(e),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self::internal_error(e)
    }
}

/// Parse an optional `?status=` style filter
pub fn parse_filter<T>(value: Option<&str>, name: &str) -> Result<Option<T>, ApiError>
where
    T: std::str::FromStr<Err = anyhow::Error>,
{
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|e| ApiError::validation_error(format!("Invalid {}: {}", name, e))),
        None => Ok(None),
    }
}

// ============================================================================
// Authentication
// ============================================================================

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub AdminUser);

impl AuthenticatedUser {
    /// Fail with 403 unless the user holds `permission`
    pub fn require(&self, permission: Permission) -> Result<(), ApiError> {
        if self.0.has_permission(permission) {
            Ok(())
        } else {
            Err(ApiError::forbidden(format!(
                "Missing permission: {}",
                permission
            )))
        }
    }

    pub fn actor(&self, ip: &ClientIp) -> Actor {
        Actor::user(&self.0, ip.0.map(|ip| ip.to_string()))
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Session token from `Authorization: Bearer` or the `session` cookie
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
    {
        return Some(token.trim().to_string());
    }

    headers
        .get(header::COOKIE)
        .and_then(|h| h.to_str().ok())
        .and_then(|cookies| {
            cookies
                .split(';')
                .find_map(|c| c.trim().strip_prefix("session="))
                .filter(|t| !t.is_empty())
                .map(str::to_string)
        })
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_session_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    let user = state
        .users
        .validate_session(&token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

// ============================================================================
// Client address
// ============================================================================

/// Client IP from the socket address, or from `X-Forwarded-For` /
/// `X-Real-IP` when `server.trust_proxy` is on
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientIp(pub Option<IpAddr>);

impl ClientIp {
    /// Resolve the client address. Forwarded headers are only honored when
    /// `trust_proxy` is set.
    pub fn resolve(parts: &Parts, trust_proxy: bool) -> Self {
        let socket = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        if !trust_proxy {
            return ClientIp(socket);
        }

        let header_ip = |name: &str| -> Option<IpAddr> {
            parts
                .headers
                .get(name)
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.split(',').next())
                .and_then(|ip| ip.trim().parse().ok())
        };
        ClientIp(
            header_ip("x-forwarded-for")
                .or_else(|| header_ip("x-real-ip"))
                .or(socket),
        )
    }
}

impl FromRequestParts<AppState> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(ClientIp::resolve(parts, state.trust_proxy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_token_from_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(extract_session_token(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session=tok42; lang=en"),
        );
        assert_eq!(extract_session_token(&headers).as_deref(), Some("tok42"));

        headers.insert(header::COOKIE, HeaderValue::from_static("session="));
        assert!(extract_session_token(&headers).is_none());
    }

    #[test]
    fn test_error_status_codes() {
        assert_eq!(ApiError::conflict("x").status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::rate_limited("x").status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            ApiError::from(ContentError::DuplicateSlug("a".into())).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(UserServiceError::LastAdmin).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(ContentError::NotFound("Post".into())).status(),
            StatusCode::NOT_FOUND
        );
    }

    fn request_parts(forwarded: &str, socket: &str) -> Parts {
        let mut request = axum::http::Request::builder()
            .header("x-forwarded-for", forwarded)
            .body(())
            .unwrap();
        let addr: SocketAddr = socket.parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));
        request.into_parts().0
    }

    #[test]
    fn test_client_ip_ignores_forwarded_headers_by_default() {
        let parts = request_parts("10.0.0.7, 172.16.0.1", "203.0.113.5:40000");
        let direct: IpAddr = "203.0.113.5".parse().unwrap();
        let forwarded: IpAddr = "10.0.0.7".parse().unwrap();

        assert_eq!(ClientIp::resolve(&parts, false).0, Some(direct));
        assert_eq!(ClientIp::resolve(&parts, true).0, Some(forwarded));
    }

    #[test]
    fn test_parse_filter() {
        use crate::models::ContentStatus;
        let ok: Option<ContentStatus> = parse_filter(Some("draft"), "status").unwrap();
        assert_eq!(ok, Some(ContentStatus::Draft));
        let none: Option<ContentStatus> = parse_filter(Some(" "), "status").unwrap();
        assert!(none.is_none());
        assert!(parse_filter::<ContentStatus>(Some("bogus"), "status").is_err());
    }
}
