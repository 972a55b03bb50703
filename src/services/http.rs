use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, FromRequestParts},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::trace::TraceLayer;

use super::{ServiceChannels, ServiceError};

mod admin;
mod projects;
mod referrals;
mod users;

/// Account id forwarded by the authenticating gateway.
pub const ACCOUNT_HEADER: &str = "x-account-id";
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

#[derive(Clone)]
pub struct AppState {
    channels: ServiceChannels,
    admin_token: Arc<String>,
}

pub enum ApiError {
    BadRequest(String),
    Unauthorized,
    Forbidden,
    Service(ServiceError),
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        ApiError::Service(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden".to_string()),
            ApiError::Service(ServiceError::Validation(message)) => {
                (StatusCode::BAD_REQUEST, message)
            }
            ApiError::Service(ServiceError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "Not found".to_string())
            }
            ApiError::Service(e) => {
                log::error!("Request failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// The authenticated caller.
pub struct AccountId(pub String);

impl<S> FromRequestParts<S> for AccountId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(ACCOUNT_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| AccountId(value.to_string()))
            .ok_or(ApiError::Unauthorized)
    }
}

/// Guard for operator-only routes.
pub struct Admin;

impl FromRequestParts<AppState> for Admin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(ADMIN_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        if state.admin_token.is_empty() || token != state.admin_token.as_str() {
            return Err(ApiError::Forbidden);
        }

        Ok(Admin)
    }
}

pub fn router(channels: ServiceChannels, admin_token: String) -> Router {
    let app_state = AppState {
        channels,
        admin_token: Arc::new(admin_token),
    };

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/auth/signup", post(users::signup))
        .route("/users/me", get(users::get_me))
        .route(
            "/projects",
            post(projects::create_project).get(projects::list_projects),
        )
        .route("/projects/{id}/advance", post(projects::advance_project))
        .route("/referrals", post(referrals::submit_referral))
        .route("/referrals/eligibility", get(referrals::get_eligibility))
        .route(
            "/referrals/{id}/referred-completed",
            post(referrals::record_referred_completion),
        )
        .route("/admin/projects", get(admin::list_all_projects))
        .route("/admin/users", get(admin::list_users))
        .route("/admin/projects/eta-adjust", post(admin::adjust_eta))
        .route(
            "/admin/loyalty/{user_id}/completed",
            post(admin::record_mix_completed),
        )
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
}

pub async fn start_http_server(
    channels: ServiceChannels,
    listen: &str,
    admin_token: String,
) -> Result<(), anyhow::Error> {
    let app = router(channels, admin_token);

    let listener = tokio::net::TcpListener::bind(listen).await?;
    log::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
