use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use super::{AccountId, ApiError, AppState};
use crate::models::projects::{AdvanceProject, NewProject};
use crate::services::{call, projects::ProjectRequest};

pub async fn create_project(
    State(state): State<AppState>,
    AccountId(user_id): AccountId,
    body: Result<Json<NewProject>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;
    let project = call(&state.channels.projects, "ProjectService", |response| {
        ProjectRequest::CreateProject {
            user_id,
            project: req,
            response,
        }
    })
    .await?;

    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn list_projects(
    State(state): State<AppState>,
    AccountId(user_id): AccountId,
) -> Result<impl IntoResponse, ApiError> {
    let projects = call(&state.channels.projects, "ProjectService", |response| {
        ProjectRequest::ListProjects { user_id, response }
    })
    .await?;

    Ok(Json(projects))
}

pub async fn advance_project(
    State(state): State<AppState>,
    AccountId(user_id): AccountId,
    Path(project_id): Path<String>,
    body: Result<Json<AdvanceProject>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;
    let project = call(&state.channels.projects, "ProjectService", |response| {
        ProjectRequest::RequestTransition {
            project_id,
            user_id,
            next_status: req.next_status,
            eta_hours: req.eta_hours,
            response,
        }
    })
    .await?;

    Ok(Json(project))
}
