use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use super::{Admin, ApiError, AppState};
use crate::models::projects::EtaAdjustment;
use crate::services::{
    call, loyalty::LoyaltyRequest, projects::ProjectRequest, users::UserRequest,
};

pub async fn list_all_projects(
    State(state): State<AppState>,
    _admin: Admin,
) -> Result<impl IntoResponse, ApiError> {
    let projects = call(&state.channels.projects, "ProjectService", |response| {
        ProjectRequest::ListAllProjects { response }
    })
    .await?;

    Ok(Json(json!({ "projects": projects })))
}

pub async fn list_users(
    State(state): State<AppState>,
    _admin: Admin,
) -> Result<impl IntoResponse, ApiError> {
    let users = call(&state.channels.users, "UserService", |response| {
        UserRequest::ListUsers { response }
    })
    .await?;

    Ok(Json(json!({ "users": users })))
}

pub async fn adjust_eta(
    State(state): State<AppState>,
    _admin: Admin,
    body: Result<Json<EtaAdjustment>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;
    let updated = call(&state.channels.projects, "ProjectService", |response| {
        ProjectRequest::AdjustEta {
            ids: req.ids,
            delta_days: req.delta_days,
            response,
        }
    })
    .await?;

    Ok(Json(json!({ "updated": updated })))
}

/// Completions are recorded by an operator, never by a status change.
pub async fn record_mix_completed(
    State(state): State<AppState>,
    _admin: Admin,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let progress = call(&state.channels.loyalty, "LoyaltyService", |response| {
        LoyaltyRequest::RecordMixCompleted { user_id, response }
    })
    .await?;

    Ok(Json(progress))
}
