use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use super::{AccountId, ApiError, AppState};
use crate::models::users::NewUser;
use crate::services::{call, loyalty::LoyaltyRequest, users::UserRequest};

pub async fn signup(
    State(state): State<AppState>,
    body: Result<Json<NewUser>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;
    let user = call(&state.channels.users, "UserService", |response| {
        UserRequest::Signup {
            new_user: req,
            response,
        }
    })
    .await?;

    Ok(Json(json!({ "ok": true, "userId": user.id })))
}

pub async fn get_me(
    State(state): State<AppState>,
    AccountId(user_id): AccountId,
) -> Result<impl IntoResponse, ApiError> {
    let user = call(&state.channels.users, "UserService", |response| {
        UserRequest::GetUser {
            id: user_id.clone(),
            response,
        }
    })
    .await?;

    let loyalty = call(&state.channels.loyalty, "LoyaltyService", |response| {
        LoyaltyRequest::GetProgress { user_id, response }
    })
    .await?;

    Ok(Json(json!({
        "user": {
            "id": user.id,
            "email": user.email,
            "name": user.name,
            "avatarUrl": user.avatar_url,
        },
        "loyalty": loyalty,
    })))
}
