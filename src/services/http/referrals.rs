use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use super::{AccountId, Admin, ApiError, AppState};
use crate::models::referrals::{NewReferral, ReferredCompletion};
use crate::services::{call, referrals::ReferralRequest};

pub async fn submit_referral(
    State(state): State<AppState>,
    AccountId(referrer_id): AccountId,
    body: Result<Json<NewReferral>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;
    let referral = call(&state.channels.referrals, "ReferralService", |response| {
        ReferralRequest::SubmitReferral {
            referrer_id,
            referred_email: req.referred_email,
            response,
        }
    })
    .await?;

    Ok(Json(json!({ "ok": true, "referralId": referral.id })))
}

/// Administrative: `count` is the referred account's authoritative total.
pub async fn record_referred_completion(
    State(state): State<AppState>,
    _admin: Admin,
    Path(referral_id): Path<String>,
    body: Result<Json<ReferredCompletion>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;
    let activity = call(&state.channels.referrals, "ReferralService", |response| {
        ReferralRequest::RecordReferredCompletion {
            referral_id,
            count: req.count,
            response,
        }
    })
    .await?;

    Ok(Json(json!({ "ok": true, "activity": activity })))
}

pub async fn get_eligibility(
    State(state): State<AppState>,
    AccountId(user_id): AccountId,
) -> Result<impl IntoResponse, ApiError> {
    let eligible = call(&state.channels.referrals, "ReferralService", |response| {
        ReferralRequest::CheckEligibility { user_id, response }
    })
    .await?;

    Ok(Json(json!({ "eligible": eligible })))
}
