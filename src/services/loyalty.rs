use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;

use super::{RequestHandler, Service, ServiceError};
use crate::{models::loyalty::LoyaltyProgress, repositories::LoyaltyStore};

pub enum LoyaltyRequest {
    GetProgress {
        user_id: String,
        response: oneshot::Sender<Result<LoyaltyProgress, ServiceError>>,
    },
    /// Administrative: one more finished mix. Callers must not replay the
    /// same completion, the counter does not deduplicate.
    RecordMixCompleted {
        user_id: String,
        response: oneshot::Sender<Result<LoyaltyProgress, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct LoyaltyRequestHandler {
    repository: Arc<dyn LoyaltyStore>,
    cycle_length: i64,
}

impl LoyaltyRequestHandler {
    pub fn new(repository: Arc<dyn LoyaltyStore>, cycle_length: i64) -> Self {
        LoyaltyRequestHandler {
            repository,
            cycle_length,
        }
    }

    async fn get_progress(&self, user_id: &str) -> Result<LoyaltyProgress, ServiceError> {
        let count = self
            .repository
            .get_mixes_completed(user_id)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?;

        Ok(LoyaltyProgress::new(count, self.cycle_length))
    }

    async fn record_mix_completed(&self, user_id: &str) -> Result<LoyaltyProgress, ServiceError> {
        let count = self
            .repository
            .increment_mixes_completed(user_id)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?
            .ok_or_else(|| ServiceError::NotFound(format!("Account {}", user_id)))?;

        log::info!("Account {} has completed {} mix(es).", user_id, count);
        Ok(LoyaltyProgress::new(Some(count), self.cycle_length))
    }
}

#[async_trait]
impl RequestHandler<LoyaltyRequest> for LoyaltyRequestHandler {
    async fn handle_request(&self, request: LoyaltyRequest) {
        match request {
            LoyaltyRequest::GetProgress { user_id, response } => {
                let result = self.get_progress(&user_id).await;
                let _ = response.send(result);
            }
            LoyaltyRequest::RecordMixCompleted { user_id, response } => {
                let result = self.record_mix_completed(&user_id).await;
                let _ = response.send(result);
            }
        }
    }
}

pub struct LoyaltyService;

impl LoyaltyService {
    pub fn new() -> Self {
        LoyaltyService {}
    }
}

#[async_trait]
impl Service<LoyaltyRequest, LoyaltyRequestHandler> for LoyaltyService {}
