use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use super::mail::{MailRequest, Notification};
use super::referrals::ReferralRequest;
use super::{RequestHandler, Service, ServiceError};
use crate::{
    models::users::{NewUser, User},
    repositories::UserStore,
    utils::validation,
};

pub enum UserRequest {
    Signup {
        new_user: NewUser,
        response: oneshot::Sender<Result<User, ServiceError>>,
    },
    GetUser {
        id: String,
        response: oneshot::Sender<Result<User, ServiceError>>,
    },
    /// Administrative: every account, newest first.
    ListUsers {
        response: oneshot::Sender<Result<Vec<User>, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct UserRequestHandler {
    repository: Arc<dyn UserStore>,
    referral_channel: mpsc::Sender<ReferralRequest>,
    mail_channel: mpsc::Sender<MailRequest>,
}

impl UserRequestHandler {
    pub fn new(
        repository: Arc<dyn UserStore>,
        referral_channel: mpsc::Sender<ReferralRequest>,
        mail_channel: mpsc::Sender<MailRequest>,
    ) -> Self {
        UserRequestHandler {
            repository,
            referral_channel,
            mail_channel,
        }
    }

    async fn signup(&self, new_user: NewUser) -> Result<User, ServiceError> {
        let email = validation::normalize_email(&new_user.email);
        if !validation::is_valid_email(&email) {
            return Err(ServiceError::Validation("Invalid email format".to_string()));
        }

        let new_user = NewUser {
            email,
            name: new_user
                .name
                .map(|name| validation::sanitize_input(&name))
                .filter(|name| !name.is_empty()),
            avatar_url: new_user.avatar_url,
        };

        let user = self
            .repository
            .insert_user(&new_user)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?
            .ok_or_else(|| ServiceError::Validation("Email already registered".to_string()))?;

        log::info!("Created account {}.", user.id);

        let referral_channel = self.referral_channel.clone();
        let mail_channel = self.mail_channel.clone();
        let user_clone = user.clone();
        tokio::spawn(async move {
            if let Err(e) = referral_channel
                .send(ReferralRequest::LinkReferralAccount {
                    referred_email: user_clone.email.clone(),
                    user_id: user_clone.id.clone(),
                })
                .await
            {
                log::warn!("Referral service unavailable: {}", e);
            }

            if let Err(e) = mail_channel
                .send(MailRequest::Send {
                    notification: Notification::Welcome {
                        to: user_clone.email,
                        name: user_clone.name,
                    },
                })
                .await
            {
                log::warn!("Mail service unavailable: {}", e);
            }
        });

        Ok(user)
    }

    async fn get_user(&self, id: &str) -> Result<User, ServiceError> {
        self.repository
            .get_user_by_id(id)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?
            .ok_or_else(|| ServiceError::NotFound(format!("Account {}", id)))
    }

    async fn list_users(&self) -> Result<Vec<User>, ServiceError> {
        self.repository
            .get_all_users()
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))
    }
}

#[async_trait]
impl RequestHandler<UserRequest> for UserRequestHandler {
    async fn handle_request(&self, request: UserRequest) {
        match request {
            UserRequest::Signup { new_user, response } => {
                let user = self.signup(new_user).await;
                let _ = response.send(user);
            }
            UserRequest::GetUser { id, response } => {
                let user = self.get_user(&id).await;
                let _ = response.send(user);
            }
            UserRequest::ListUsers { response } => {
                let users = self.list_users().await;
                let _ = response.send(users);
            }
        }
    }
}

pub struct UserService;

impl UserService {
    pub fn new() -> Self {
        UserService {}
    }
}

#[async_trait]
impl Service<UserRequest, UserRequestHandler> for UserService {}
