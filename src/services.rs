use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::{mpsc, oneshot};

use crate::models::{projects::TransitionPolicy, referrals::EligibilityRule};
use crate::repositories::{
    loyalty::LoyaltyRepository, projects::ProjectRepository, referrals::ReferralRepository,
    users::UserRepository, LoyaltyStore, ProjectStore, ReferralStore, UserStore,
};
use crate::settings::Settings;

pub mod http;
pub mod loyalty;
pub mod mail;
pub mod projects;
pub mod referrals;
pub mod users;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Communication error: {0} - {1}")]
    Communication(String, String),
}

#[async_trait]
pub trait RequestHandler<T>: Send + Sync + 'static
where
    T: Send + 'static,
{
    async fn handle_request(&self, request: T);
}

#[async_trait]
pub trait Service<T, H>: Send + Sync + 'static
where
    T: Send + 'static,
    H: RequestHandler<T> + Clone + Send,
{
    async fn run(&mut self, handler: H, receiver: &mut mpsc::Receiver<T>) {
        while let Some(request) = receiver.recv().await {
            let handler = handler.clone();

            tokio::spawn(async move {
                handler.handle_request(request).await;
            });
        }
    }
}

/// Sends a request built around a fresh reply channel and waits for the answer.
pub async fn call<R, T>(
    channel: &mpsc::Sender<R>,
    service: &str,
    request: impl FnOnce(oneshot::Sender<Result<T, ServiceError>>) -> R,
) -> Result<T, ServiceError> {
    let (response_tx, response_rx) = oneshot::channel();

    channel
        .send(request(response_tx))
        .await
        .map_err(|e| ServiceError::Communication(service.to_string(), e.to_string()))?;

    response_rx
        .await
        .map_err(|e| ServiceError::Communication(service.to_string(), e.to_string()))?
}

/// Request channels of every running service.
#[derive(Clone)]
pub struct ServiceChannels {
    pub projects: mpsc::Sender<projects::ProjectRequest>,
    pub loyalty: mpsc::Sender<loyalty::LoyaltyRequest>,
    pub referrals: mpsc::Sender<referrals::ReferralRequest>,
    pub users: mpsc::Sender<users::UserRequest>,
}

pub struct Stores {
    pub projects: Arc<dyn ProjectStore>,
    pub loyalty: Arc<dyn LoyaltyStore>,
    pub referrals: Arc<dyn ReferralStore>,
    pub users: Arc<dyn UserStore>,
}

impl Stores {
    pub fn postgres(pool: PgPool) -> Self {
        Stores {
            projects: Arc::new(ProjectRepository::new(pool.clone())),
            loyalty: Arc::new(LoyaltyRepository::new(pool.clone())),
            referrals: Arc::new(ReferralRepository::new(pool.clone())),
            users: Arc::new(UserRepository::new(pool)),
        }
    }
}

pub struct ServiceOptions {
    pub transition_policy: TransitionPolicy,
    pub eligibility: EligibilityRule,
    pub loyalty_cycle: i64,
}

impl ServiceOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        ServiceOptions {
            transition_policy: settings.projects.transition_policy,
            eligibility: EligibilityRule {
                loyalty_threshold: settings.rewards.loyalty_cycle,
                window_months: settings.rewards.referral_window_months,
                completions_required: settings.rewards.referral_completions_required,
            },
            loyalty_cycle: settings.rewards.loyalty_cycle,
        }
    }
}

/// Spawns every service actor and returns the channels used to reach them.
pub fn spawn_services(
    stores: Stores,
    mailer: Arc<dyn mail::Mailer>,
    options: ServiceOptions,
) -> ServiceChannels {
    let (project_tx, mut project_rx) = mpsc::channel(512);
    let (loyalty_tx, mut loyalty_rx) = mpsc::channel(512);
    let (referral_tx, mut referral_rx) = mpsc::channel(512);
    let (user_tx, mut user_rx) = mpsc::channel(512);
    let (mail_tx, mut mail_rx) = mpsc::channel(512);

    log::info!("Starting mail service.");
    let mut mail_service = mail::MailService::new();
    tokio::spawn(async move {
        let handler = mail::MailRequestHandler::new(mailer);
        mail_service.run(handler, &mut mail_rx).await;
    });

    log::info!("Starting project service.");
    let mut project_service = projects::ProjectService::new();
    let project_handler = projects::ProjectRequestHandler::new(
        stores.projects,
        stores.users.clone(),
        mail_tx.clone(),
        options.transition_policy,
    );
    tokio::spawn(async move {
        project_service.run(project_handler, &mut project_rx).await;
    });

    log::info!("Starting loyalty service.");
    let mut loyalty_service = loyalty::LoyaltyService::new();
    let loyalty_handler =
        loyalty::LoyaltyRequestHandler::new(stores.loyalty.clone(), options.loyalty_cycle);
    tokio::spawn(async move {
        loyalty_service.run(loyalty_handler, &mut loyalty_rx).await;
    });

    log::info!("Starting referral service.");
    let mut referral_service = referrals::ReferralService::new();
    let referral_handler = referrals::ReferralRequestHandler::new(
        stores.referrals,
        stores.loyalty,
        options.eligibility,
    );
    tokio::spawn(async move {
        referral_service.run(referral_handler, &mut referral_rx).await;
    });

    log::info!("Starting user service.");
    let mut user_service = users::UserService::new();
    let user_handler = users::UserRequestHandler::new(stores.users, referral_tx.clone(), mail_tx);
    tokio::spawn(async move {
        user_service.run(user_handler, &mut user_rx).await;
    });

    ServiceChannels {
        projects: project_tx,
        loyalty: loyalty_tx,
        referrals: referral_tx,
        users: user_tx,
    }
}

pub async fn start_services(pool: PgPool, settings: Settings) -> Result<(), anyhow::Error> {
    let mailer = mail::build_mailer(&settings.mail);
    let options = ServiceOptions::from_settings(&settings);
    let channels = spawn_services(Stores::postgres(pool), mailer, options);

    log::info!("Starting HTTP server.");
    http::start_http_server(channels, &settings.http.listen, settings.admin.token).await
}
