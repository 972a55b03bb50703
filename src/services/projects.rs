use std::sync::Arc;

use async_trait::async_trait;
use chrono::TimeDelta;
use tokio::sync::{mpsc, oneshot};

use super::mail::{MailRequest, Notification, DEFAULT_MASTERING_HOURS};
use super::{RequestHandler, Service, ServiceError};
use crate::{
    models::projects::{
        NewProject, PackageTier, Project, ProjectStatus, ProjectSummary, SizeClass,
        TransitionPolicy,
    },
    repositories::{ProjectStore, UserStore},
    utils::{
        dates::{self, EtaOutOfRange},
        validation,
    },
};

pub enum ProjectRequest {
    CreateProject {
        user_id: String,
        project: NewProject,
        response: oneshot::Sender<Result<Project, ServiceError>>,
    },
    ListProjects {
        user_id: String,
        response: oneshot::Sender<Result<Vec<ProjectSummary>, ServiceError>>,
    },
    ListAllProjects {
        response: oneshot::Sender<Result<Vec<Project>, ServiceError>>,
    },
    RequestTransition {
        project_id: String,
        user_id: String,
        next_status: String,
        eta_hours: Option<f64>,
        response: oneshot::Sender<Result<Project, ServiceError>>,
    },
    AdjustEta {
        ids: Vec<String>,
        delta_days: i64,
        response: oneshot::Sender<Result<u64, ServiceError>>,
    },
}

/// Notification owed to the customer after a successful transition, if any.
pub fn transition_notification(
    project: &Project,
    status: ProjectStatus,
    eta_hours: Option<f64>,
    recipient: &str,
) -> Option<Notification> {
    match status {
        ProjectStatus::Mastering => Some(Notification::MixComplete {
            to: recipient.to_string(),
            title: project.title.clone(),
            eta_hours: eta_hours
                .filter(|hours| *hours > 0.0)
                .unwrap_or(DEFAULT_MASTERING_HOURS),
        }),
        ProjectStatus::Delivered => Some(Notification::Delivered {
            to: recipient.to_string(),
            title: project.title.clone(),
        }),
        _ => None,
    }
}

#[derive(Clone)]
pub struct ProjectRequestHandler {
    repository: Arc<dyn ProjectStore>,
    users: Arc<dyn UserStore>,
    mail_channel: mpsc::Sender<MailRequest>,
    policy: TransitionPolicy,
}

impl ProjectRequestHandler {
    pub fn new(
        repository: Arc<dyn ProjectStore>,
        users: Arc<dyn UserStore>,
        mail_channel: mpsc::Sender<MailRequest>,
        policy: TransitionPolicy,
    ) -> Self {
        ProjectRequestHandler {
            repository,
            users,
            mail_channel,
            policy,
        }
    }

    async fn create_project(
        &self,
        user_id: &str,
        project: NewProject,
    ) -> Result<Project, ServiceError> {
        let title = validation::sanitize_input(&project.title);
        if title.is_empty() {
            return Err(ServiceError::Validation("Title is required".to_string()));
        }

        let package = project
            .package
            .parse::<PackageTier>()
            .map_err(|e| ServiceError::Validation(e.to_string()))?;
        let size = match project.size.as_deref() {
            None | Some("") => SizeClass::default(),
            Some(size) => size
                .parse::<SizeClass>()
                .map_err(|e| ServiceError::Validation(e.to_string()))?,
        };

        let eta = dates::calc_eta(dates::now(), package.as_str(), size.as_str());

        self.repository
            .insert_project(user_id, &title, package.as_str(), size.as_str(), eta)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))
    }

    async fn list_projects(&self, user_id: &str) -> Result<Vec<ProjectSummary>, ServiceError> {
        let projects = self
            .repository
            .get_projects_by_user(user_id)
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?;

        let now = dates::now();
        Ok(projects
            .into_iter()
            .map(|project| ProjectSummary {
                hours_until_eta: dates::hours_until(project.eta, now),
                project,
            })
            .collect())
    }

    async fn list_all_projects(&self) -> Result<Vec<Project>, ServiceError> {
        self.repository
            .get_all_projects()
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))
    }

    async fn request_transition(
        &self,
        project_id: &str,
        user_id: &str,
        next_status: &str,
        eta_hours: Option<f64>,
    ) -> Result<Project, ServiceError> {
        let status = next_status
            .parse::<ProjectStatus>()
            .map_err(|e| ServiceError::Validation(e.to_string()))?;

        if self.policy != TransitionPolicy::Permissive {
            let current = self
                .repository
                .get_project_for_user(project_id, user_id)
                .await
                .map_err(|e| ServiceError::Database(e.to_string()))?
                .ok_or_else(|| ServiceError::NotFound(format!("Project {}", project_id)))?;

            if !self.policy.allows(&current.status, status) {
                return Err(ServiceError::Validation(format!(
                    "Cannot move project from {} to {}",
                    current.status, status
                )));
            }
        }

        let project = self
            .repository
            .update_project_status(project_id, user_id, status.as_str())
            .await
            .map_err(|e| ServiceError::Database(e.to_string()))?
            .ok_or_else(|| ServiceError::NotFound(format!("Project {}", project_id)))?;

        log::info!("Project {} moved to {}.", project.id, status);
        self.notify_transition(&project, status, eta_hours).await;

        Ok(project)
    }

    /// Best-effort: the status change is already committed, so failures are
    /// only logged.
    async fn notify_transition(
        &self,
        project: &Project,
        status: ProjectStatus,
        eta_hours: Option<f64>,
    ) {
        if !matches!(status, ProjectStatus::Mastering | ProjectStatus::Delivered) {
            return;
        }

        let recipient = match self.users.get_user_by_id(&project.user_id).await {
            Ok(Some(user)) => user.email,
            Ok(None) => {
                log::warn!(
                    "No account {} to notify about project {}.",
                    project.user_id,
                    project.id
                );
                return;
            }
            Err(e) => {
                log::warn!("Could not look up owner of project {}: {}", project.id, e);
                return;
            }
        };

        if let Some(notification) =
            transition_notification(project, status, eta_hours, &recipient)
        {
            if let Err(e) = self
                .mail_channel
                .send(MailRequest::Send { notification })
                .await
            {
                log::warn!("Mail service unavailable for project {}: {}", project.id, e);
            }
        }
    }

    async fn adjust_eta(&self, ids: &[String], delta_days: i64) -> Result<u64, ServiceError> {
        if TimeDelta::try_days(delta_days).is_none() {
            return Err(ServiceError::Validation(
                EtaOutOfRange(delta_days).to_string(),
            ));
        }
        if ids.is_empty() {
            return Ok(0);
        }

        let updated = self
            .repository
            .shift_project_etas(ids, delta_days)
            .await
            .map_err(|e| match e.downcast_ref::<EtaOutOfRange>() {
                Some(out_of_range) => ServiceError::Validation(out_of_range.to_string()),
                None => ServiceError::Database(e.to_string()),
            })?;

        log::info!(
            "Shifted ETA of {} project(s) by {} day(s).",
            updated,
            delta_days
        );
        Ok(updated)
    }
}

#[async_trait]
impl RequestHandler<ProjectRequest> for ProjectRequestHandler {
    async fn handle_request(&self, request: ProjectRequest) {
        match request {
            ProjectRequest::CreateProject {
                user_id,
                project,
                response,
            } => {
                let result = self.create_project(&user_id, project).await;
                let _ = response.send(result);
            }
            ProjectRequest::ListProjects { user_id, response } => {
                let result = self.list_projects(&user_id).await;
                let _ = response.send(result);
            }
            ProjectRequest::ListAllProjects { response } => {
                let result = self.list_all_projects().await;
                let _ = response.send(result);
            }
            ProjectRequest::RequestTransition {
                project_id,
                user_id,
                next_status,
                eta_hours,
                response,
            } => {
                let result = self
                    .request_transition(&project_id, &user_id, &next_status, eta_hours)
                    .await;
                let _ = response.send(result);
            }
            ProjectRequest::AdjustEta {
                ids,
                delta_days,
                response,
            } => {
                let result = self.adjust_eta(&ids, delta_days).await;
                let _ = response.send(result);
            }
        }
    }
}

pub struct ProjectService;

impl ProjectService {
    pub fn new() -> Self {
        ProjectService {}
    }
}

#[async_trait]
impl Service<ProjectRequest, ProjectRequestHandler> for ProjectService {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::users::NewUser;
    use crate::repositories::memory::MemoryStore;

    struct Fixture {
        store: Arc<MemoryStore>,
        handler: ProjectRequestHandler,
        mail_rx: mpsc::Receiver<MailRequest>,
        user_id: String,
    }

    async fn fixture(policy: TransitionPolicy) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .insert_user(&NewUser {
                email: "artist@example.com".to_string(),
                name: Some("Artist".to_string()),
                avatar_url: None,
            })
            .await
            .unwrap()
            .unwrap();
        let (mail_tx, mail_rx) = mpsc::channel(16);
        let handler = ProjectRequestHandler::new(store.clone(), store.clone(), mail_tx, policy);

        Fixture {
            store,
            handler,
            mail_rx,
            user_id: user.id,
        }
    }

    async fn create(fixture: &Fixture, package: &str, size: Option<&str>) -> Project {
        fixture
            .handler
            .create_project(
                &fixture.user_id,
                NewProject {
                    title: "  <i>Late Night</i> ".to_string(),
                    package: package.to_string(),
                    size: size.map(str::to_string),
                },
            )
            .await
            .unwrap()
    }

    fn drain(rx: &mut mpsc::Receiver<MailRequest>) -> Vec<Notification> {
        let mut sent = Vec::new();
        while let Ok(MailRequest::Send { notification }) = rx.try_recv() {
            sent.push(notification);
        }
        sent
    }

    #[tokio::test]
    async fn create_starts_at_intake_with_computed_eta() {
        let fixture = fixture(TransitionPolicy::Permissive).await;
        let project = create(&fixture, "master", Some("large")).await;

        assert_eq!(project.status, "intake");
        assert_eq!(project.title, "iLate Night/i");
        assert_eq!(project.size, "large");
        let days = (project.eta - project.created_at).num_days();
        assert!((10..=11).contains(&days));
    }

    #[tokio::test]
    async fn create_defaults_size_and_rejects_unknown_values() {
        let fixture = fixture(TransitionPolicy::Permissive).await;
        assert_eq!(create(&fixture, "basic", None).await.size, "normal");

        for (package, size) in [("platinum", None), ("pro", Some("huge"))] {
            let result = fixture
                .handler
                .create_project(
                    &fixture.user_id,
                    NewProject {
                        title: "Demo".to_string(),
                        package: package.to_string(),
                        size: size.map(str::to_string),
                    },
                )
                .await;
            assert!(matches!(result, Err(ServiceError::Validation(_))));
        }

        let blank = fixture
            .handler
            .create_project(
                &fixture.user_id,
                NewProject {
                    title: " <> ".to_string(),
                    package: "pro".to_string(),
                    size: None,
                },
            )
            .await;
        assert!(matches!(blank, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn listing_reports_hours_left() {
        let fixture = fixture(TransitionPolicy::Permissive).await;
        create(&fixture, "basic", None).await;

        let listed = fixture.handler.list_projects(&fixture.user_id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!((71..=72).contains(&listed[0].hours_until_eta));
        assert!(fixture
            .handler
            .list_projects("someone-else")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn any_known_status_is_accepted_from_any_state() {
        let mut fixture = fixture(TransitionPolicy::Permissive).await;
        let project = create(&fixture, "pro", None).await;

        for next in ["delivered", "mixing", "revisions", "mastering", "intake"] {
            let updated = fixture
                .handler
                .request_transition(&project.id, &fixture.user_id, next, None)
                .await
                .unwrap();
            assert_eq!(updated.status, next);
        }
        drain(&mut fixture.mail_rx);
    }

    #[tokio::test]
    async fn unknown_status_is_rejected_before_mutation() {
        let mut fixture = fixture(TransitionPolicy::Permissive).await;
        let project = create(&fixture, "pro", None).await;

        let result = fixture
            .handler
            .request_transition(&project.id, &fixture.user_id, "cancelled", None)
            .await;

        assert!(matches!(result, Err(ServiceError::Validation(_))));
        assert_eq!(fixture.store.project(&project.id).unwrap().status, "intake");
        assert!(drain(&mut fixture.mail_rx).is_empty());
    }

    #[tokio::test]
    async fn foreign_or_missing_project_is_not_found() {
        let fixture = fixture(TransitionPolicy::Permissive).await;
        let project = create(&fixture, "pro", None).await;

        let missing = fixture
            .handler
            .request_transition("nope", &fixture.user_id, "mixing", None)
            .await;
        assert!(matches!(missing, Err(ServiceError::NotFound(_))));

        let foreign = fixture
            .handler
            .request_transition(&project.id, "someone-else", "mixing", None)
            .await;
        assert!(matches!(foreign, Err(ServiceError::NotFound(_))));
        assert_eq!(fixture.store.project(&project.id).unwrap().status, "intake");
    }

    #[tokio::test]
    async fn mastering_sends_one_notification_with_default_estimate() {
        let mut fixture = fixture(TransitionPolicy::Permissive).await;
        let project = create(&fixture, "pro", None).await;

        fixture
            .handler
            .request_transition(&project.id, &fixture.user_id, "mastering", None)
            .await
            .unwrap();

        let sent = drain(&mut fixture.mail_rx);
        assert_eq!(
            sent,
            vec![Notification::MixComplete {
                to: "artist@example.com".to_string(),
                title: project.title.clone(),
                eta_hours: 12.0,
            }]
        );
    }

    #[tokio::test]
    async fn mastering_uses_supplied_estimate() {
        let mut fixture = fixture(TransitionPolicy::Permissive).await;
        let project = create(&fixture, "pro", None).await;

        fixture
            .handler
            .request_transition(&project.id, &fixture.user_id, "mastering", Some(30.0))
            .await
            .unwrap();

        match drain(&mut fixture.mail_rx).as_slice() {
            [Notification::MixComplete { eta_hours, .. }] => assert_eq!(*eta_hours, 30.0),
            other => panic!("unexpected notifications: {:?}", other),
        }
    }

    #[tokio::test]
    async fn only_mastering_and_delivered_notify() {
        let mut fixture = fixture(TransitionPolicy::Permissive).await;
        let project = create(&fixture, "pro", None).await;

        for next in ["mixing", "revisions", "intake"] {
            fixture
                .handler
                .request_transition(&project.id, &fixture.user_id, next, None)
                .await
                .unwrap();
        }
        assert!(drain(&mut fixture.mail_rx).is_empty());

        fixture
            .handler
            .request_transition(&project.id, &fixture.user_id, "delivered", None)
            .await
            .unwrap();
        assert!(matches!(
            drain(&mut fixture.mail_rx).as_slice(),
            [Notification::Delivered { .. }]
        ));
    }

    #[tokio::test]
    async fn closed_mail_channel_does_not_undo_transition() {
        let fixture = fixture(TransitionPolicy::Permissive).await;
        let project = create(&fixture, "pro", None).await;
        let Fixture {
            store,
            handler,
            mail_rx,
            user_id,
        } = fixture;
        drop(mail_rx);

        let updated = handler
            .request_transition(&project.id, &user_id, "delivered", None)
            .await
            .unwrap();

        assert_eq!(updated.status, "delivered");
        assert_eq!(store.project(&project.id).unwrap().status, "delivered");
    }

    #[tokio::test]
    async fn linear_policy_rejects_skips() {
        let fixture = fixture(TransitionPolicy::Linear).await;
        let project = create(&fixture, "pro", None).await;

        let skip = fixture
            .handler
            .request_transition(&project.id, &fixture.user_id, "delivered", None)
            .await;
        assert!(matches!(skip, Err(ServiceError::Validation(_))));

        let step = fixture
            .handler
            .request_transition(&project.id, &fixture.user_id, "mixing", None)
            .await
            .unwrap();
        assert_eq!(step.status, "mixing");
    }

    #[tokio::test]
    async fn adjust_eta_shifts_listed_projects_only() {
        let fixture = fixture(TransitionPolicy::Permissive).await;
        let first = create(&fixture, "pro", None).await;
        let second = create(&fixture, "basic", None).await;

        let updated = fixture
            .handler
            .adjust_eta(&[first.id.clone(), "missing".to_string()], -2)
            .await
            .unwrap();

        assert_eq!(updated, 1);
        assert_eq!(
            Some(fixture.store.project(&first.id).unwrap().eta),
            dates::shift_eta(first.eta, -2)
        );
        assert_eq!(fixture.store.project(&second.id).unwrap().eta, second.eta);
        assert_eq!(fixture.handler.adjust_eta(&[], 3).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn out_of_range_shift_is_rejected_without_changes() {
        let fixture = fixture(TransitionPolicy::Permissive).await;
        let project = create(&fixture, "pro", None).await;

        for delta_days in [200_000_000, i64::MAX, 100_000_000] {
            let result = fixture
                .handler
                .adjust_eta(&[project.id.clone()], delta_days)
                .await;
            assert!(matches!(result, Err(ServiceError::Validation(_))));
        }

        assert_eq!(fixture.store.project(&project.id).unwrap().eta, project.eta);
        assert_eq!(
            fixture.handler.adjust_eta(&[project.id.clone()], 1).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn store_outage_surfaces_as_database_error() {
        let fixture = fixture(TransitionPolicy::Permissive).await;
        let project = create(&fixture, "pro", None).await;
        fixture.store.set_unavailable(true);

        let result = fixture
            .handler
            .request_transition(&project.id, &fixture.user_id, "mixing", None)
            .await;
        assert!(matches!(result, Err(ServiceError::Database(_))));
    }
}
