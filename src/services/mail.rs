use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::{RequestHandler, Service};
use crate::settings::Mail;

pub const DEFAULT_MASTERING_HOURS: f64 = 12.0;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail relay unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("mail relay rejected message with status {0}")]
    Rejected(u16),
}

/// Customer notifications emitted by the project and account workflows.
#[derive(Clone, Debug, PartialEq)]
pub enum Notification {
    MixComplete {
        to: String,
        title: String,
        eta_hours: f64,
    },
    Delivered {
        to: String,
        title: String,
    },
    Welcome {
        to: String,
        name: Option<String>,
    },
}

impl Notification {
    pub fn recipient(&self) -> &str {
        match self {
            Notification::MixComplete { to, .. }
            | Notification::Delivered { to, .. }
            | Notification::Welcome { to, .. } => to,
        }
    }

    pub fn subject(&self) -> String {
        match self {
            Notification::MixComplete { title, .. } => format!("Mix complete: {}", title),
            Notification::Delivered { title, .. } => format!("Delivered: {}", title),
            Notification::Welcome { .. } => "Welcome to the studio portal".to_string(),
        }
    }

    pub fn html(&self) -> String {
        match self {
            Notification::MixComplete { eta_hours, .. } => format!(
                "<p>The mixing stage is finished and mastering has begun.</p>\
                 <p>Estimated time: {} hours.</p>",
                eta_hours
            ),
            Notification::Delivered { .. } => {
                "<p>Your project has been delivered. Enjoy!</p>".to_string()
            }
            Notification::Welcome { name, .. } => format!(
                "<p>Welcome, {}! Your portal is ready.</p>",
                name.as_deref().filter(|n| !n.is_empty()).unwrap_or("Artist")
            ),
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync + 'static {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError>;
}

/// Posts messages to an HTTP mail relay.
pub struct RelayMailer {
    url: String,
    api_key: String,
    from: String,
    client: reqwest::Client,
}

impl RelayMailer {
    pub fn new(url: String, api_key: String, from: String) -> Self {
        Self {
            url,
            api_key,
            from,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Mailer for RelayMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError> {
        let payload = json!({
            "from": self.from,
            "to": to,
            "subject": subject,
            "html": html,
        });

        let response = self
            .client
            .post(format!("{}/send", self.url.trim_end_matches('/')))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MailError::Rejected(response.status().as_u16()));
        }

        Ok(())
    }
}

/// Used when outbound mail is disabled; messages only reach the log.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, _html: &str) -> Result<(), MailError> {
        log::info!("Mail disabled, not sending \"{}\" to {}.", subject, to);
        Ok(())
    }
}

pub fn build_mailer(settings: &Mail) -> Arc<dyn Mailer> {
    if settings.enabled {
        Arc::new(RelayMailer::new(
            settings.relay_url.clone(),
            settings.api_key.clone(),
            settings.from.clone(),
        ))
    } else {
        Arc::new(LogMailer)
    }
}

pub enum MailRequest {
    Send { notification: Notification },
}

#[derive(Clone)]
pub struct MailRequestHandler {
    mailer: Arc<dyn Mailer>,
}

impl MailRequestHandler {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        MailRequestHandler { mailer }
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), MailError> {
        self.mailer
            .send(
                notification.recipient(),
                &notification.subject(),
                &notification.html(),
            )
            .await
    }
}

#[async_trait]
impl RequestHandler<MailRequest> for MailRequestHandler {
    async fn handle_request(&self, request: MailRequest) {
        match request {
            MailRequest::Send { notification } => match self.deliver(&notification).await {
                Ok(()) => log::info!(
                    "Sent \"{}\" to {}.",
                    notification.subject(),
                    notification.recipient()
                ),
                Err(e) => log::warn!(
                    "Could not send \"{}\" to {}: {}",
                    notification.subject(),
                    notification.recipient(),
                    e
                ),
            },
        }
    }
}

pub struct MailService;

impl MailService {
    pub fn new() -> Self {
        MailService {}
    }
}

#[async_trait]
impl Service<MailRequest, MailRequestHandler> for MailService {}
