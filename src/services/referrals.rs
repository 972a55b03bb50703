use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;

use super::{RequestHandler, Service, ServiceError};
use crate::{
    models::referrals::{EligibilityRule, Referral, ReferralActivity},
    repositories::{LoyaltyStore, ReferralStore},
    utils::{dates, validation},
};

pub enum ReferralRequest {
    SubmitReferral {
        referrer_id: String,
        referred_email: String,
        response: oneshot::Sender<Result<Referral, ServiceError>>,
    },
    LinkReferralAccount {
        referred_email: String,
        user_id: String,
    },
    RecordReferredCompletion {
        referral_id: String,
        count: i32,
        response: oneshot::Sender<Result<ReferralActivity, ServiceError>>,
    },
    CheckEligibility {
        user_id: String,
        response: oneshot::Sender<Result<bool, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct ReferralRequestHandler {
    repository: Arc<dyn ReferralStore>,
    loyalty: Arc<dyn LoyaltyStore>,
    rule: EligibilityRule,
}

impl ReferralRequestHandler {
    pub fn new(
        repository: Arc<dyn ReferralStore>,
        loyalty: Arc<dyn LoyaltyStore>,
        rule: EligibilityRule,
    ) -> Self {
        ReferralRequestHandler {
            repository,
            loyalty,
            rule,
        }
    }

    async fn submit_referral(
        &self,
        referrer_id: &str,
        referred_email: &str,
    ) -> Result<Referral, ServiceError> {
        let referred_email = validation::normalize_email(referred_email);
        if !validation::is_valid_email(&referred_email) {
            return Err(ServiceError::Validation(format!(
                "Invalid email: {:?}",
                referred_email
            )));
        }

        let referral = self
            .repository
            .insert_referral(referrer_id, &referred_email)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?;

        log::info!("Account {} referred {}.", referrer_id, referred_email);
        Ok(referral)
    }

    /// Not finding a referral is the common case: most signups were never
    /// invited.
    async fn link_referral_account(&self, referred_email: &str, user_id: &str) {
        let referred_email = validation::normalize_email(referred_email);

        match self
            .repository
            .link_referral_account(&referred_email, user_id)
            .await
        {
            Ok(ids) if ids.is_empty() => {}
            Ok(ids) => log::info!("Linked account {} to referral(s) {:?}.", user_id, ids),
            Err(e) => log::warn!("Could not link referrals for {}: {}", user_id, e),
        }
    }

    async fn record_referred_completion(
        &self,
        referral_id: &str,
        count: i32,
    ) -> Result<ReferralActivity, ServiceError> {
        if count < 0 {
            return Err(ServiceError::Validation(format!(
                "Completion count must not be negative, got {}",
                count
            )));
        }

        self.repository
            .set_referred_completions(referral_id, count)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?
            .ok_or_else(|| ServiceError::NotFound(format!("Referral {}", referral_id)))
    }

    async fn is_eligible_for_free_master(&self, user_id: &str) -> Result<bool, ServiceError> {
        let mixes = self
            .loyalty
            .get_mixes_completed(user_id)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?;

        if !self.rule.meets_loyalty(mixes) {
            return Ok(false);
        }

        let now = dates::now();
        let referrals = self
            .repository
            .get_referral_standings(user_id, self.rule.window_start(now))
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?;

        Ok(self.rule.has_qualifying_referral(&referrals, now))
    }
}

#[async_trait]
impl RequestHandler<ReferralRequest> for ReferralRequestHandler {
    async fn handle_request(&self, request: ReferralRequest) {
        match request {
            ReferralRequest::SubmitReferral {
                referrer_id,
                referred_email,
                response,
            } => {
                let result = self.submit_referral(&referrer_id, &referred_email).await;
                let _ = response.send(result);
            }
            ReferralRequest::LinkReferralAccount {
                referred_email,
                user_id,
            } => {
                self.link_referral_account(&referred_email, &user_id).await;
            }
            ReferralRequest::RecordReferredCompletion {
                referral_id,
                count,
                response,
            } => {
                let result = self.record_referred_completion(&referral_id, count).await;
                let _ = response.send(result);
            }
            ReferralRequest::CheckEligibility { user_id, response } => {
                let result = self.is_eligible_for_free_master(&user_id).await;
                let _ = response.send(result);
            }
        }
    }
}

pub struct ReferralService;

impl ReferralService {
    pub fn new() -> Self {
        ReferralService {}
    }
}

#[async_trait]
impl Service<ReferralRequest, ReferralRequestHandler> for ReferralService {}
