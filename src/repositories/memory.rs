//! In-process stores used by the service tests.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use uuid::Uuid;

use super::{LoyaltyStore, ProjectStore, ReferralStore, UserStore};
use crate::{
    models::{
        projects::Project,
        referrals::{Referral, ReferralActivity, ReferralStanding},
        users::{NewUser, User},
    },
    utils::dates::{self, EtaOutOfRange},
};

#[derive(Default)]
struct State {
    users: Vec<User>,
    projects: Vec<Project>,
    loyalty: HashMap<String, i64>,
    referrals: Vec<Referral>,
    activity: HashMap<String, ReferralActivity>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    fail: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail as if the database were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.fail.lock().unwrap() = unavailable;
    }

    pub fn backdate_referral(&self, referral_id: &str, created_at: NaiveDateTime) {
        let mut state = self.state.lock().unwrap();
        if let Some(referral) = state.referrals.iter_mut().find(|r| r.id == referral_id) {
            referral.created_at = created_at;
        }
    }

    pub fn set_mixes_completed(&self, user_id: &str, count: i64) {
        self.state
            .lock()
            .unwrap()
            .loyalty
            .insert(user_id.to_string(), count);
    }

    pub fn referral_activity(&self, referral_id: &str) -> Option<ReferralActivity> {
        self.state.lock().unwrap().activity.get(referral_id).cloned()
    }

    pub fn activity_count(&self) -> usize {
        self.state.lock().unwrap().activity.len()
    }

    pub fn referral(&self, referral_id: &str) -> Option<Referral> {
        let state = self.state.lock().unwrap();
        state.referrals.iter().find(|r| r.id == referral_id).cloned()
    }

    pub fn project(&self, id: &str) -> Option<Project> {
        let state = self.state.lock().unwrap();
        state.projects.iter().find(|p| p.id == id).cloned()
    }

    fn check(&self) -> Result<(), anyhow::Error> {
        if *self.fail.lock().unwrap() {
            return Err(anyhow!("connection refused"));
        }
        Ok(())
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn insert_project(
        &self,
        user_id: &str,
        title: &str,
        package: &str,
        size: &str,
        eta: NaiveDateTime,
    ) -> Result<Project, anyhow::Error> {
        self.check()?;
        let now = dates::now();
        let project = Project {
            id: Uuid::new_v4().hyphenated().to_string(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            package: package.to_string(),
            size: size.to_string(),
            status: "intake".to_string(),
            eta,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().unwrap().projects.push(project.clone());
        Ok(project)
    }

    async fn get_project_for_user(
        &self,
        id: &str,
        user_id: &str,
    ) -> Result<Option<Project>, anyhow::Error> {
        self.check()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .projects
            .iter()
            .find(|p| p.id == id && p.user_id == user_id)
            .cloned())
    }

    async fn get_projects_by_user(&self, user_id: &str) -> Result<Vec<Project>, anyhow::Error> {
        self.check()?;
        let state = self.state.lock().unwrap();
        let mut projects: Vec<Project> = state
            .projects
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        projects.reverse();
        Ok(projects)
    }

    async fn get_all_projects(&self) -> Result<Vec<Project>, anyhow::Error> {
        self.check()?;
        let mut projects = self.state.lock().unwrap().projects.clone();
        projects.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(projects)
    }

    async fn update_project_status(
        &self,
        id: &str,
        user_id: &str,
        status: &str,
    ) -> Result<Option<Project>, anyhow::Error> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        let project = state
            .projects
            .iter_mut()
            .find(|p| p.id == id && p.user_id == user_id)
            .map(|project| {
                project.status = status.to_string();
                project.updated_at = dates::now();
                project.clone()
            });
        Ok(project)
    }

    async fn shift_project_etas(
        &self,
        ids: &[String],
        delta_days: i64,
    ) -> Result<u64, anyhow::Error> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        let shifted = state
            .projects
            .iter()
            .filter(|p| ids.contains(&p.id))
            .map(|p| {
                dates::shift_eta(p.eta, delta_days)
                    .map(|eta| (p.id.clone(), eta))
                    .ok_or(EtaOutOfRange(delta_days))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let now = dates::now();
        for (id, eta) in &shifted {
            if let Some(project) = state.projects.iter_mut().find(|p| &p.id == id) {
                project.eta = *eta;
                project.updated_at = now;
            }
        }
        Ok(shifted.len() as u64)
    }
}

#[async_trait]
impl LoyaltyStore for MemoryStore {
    async fn get_mixes_completed(&self, user_id: &str) -> Result<Option<i64>, anyhow::Error> {
        self.check()?;
        Ok(self.state.lock().unwrap().loyalty.get(user_id).copied())
    }

    async fn increment_mixes_completed(
        &self,
        user_id: &str,
    ) -> Result<Option<i64>, anyhow::Error> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        if !state.users.iter().any(|u| u.id == user_id) {
            return Ok(None);
        }
        let count = state.loyalty.entry(user_id.to_string()).or_insert(0);
        *count += 1;
        Ok(Some(*count))
    }
}

#[async_trait]
impl ReferralStore for MemoryStore {
    async fn insert_referral(
        &self,
        referrer_id: &str,
        referred_email: &str,
    ) -> Result<Referral, anyhow::Error> {
        self.check()?;
        let referral = Referral {
            id: Uuid::new_v4().hyphenated().to_string(),
            referrer_id: referrer_id.to_string(),
            referred_email: referred_email.to_string(),
            referred_user_id: None,
            created_at: dates::now(),
        };
        let activity = ReferralActivity {
            referral_id: referral.id.clone(),
            referred_projects_completed: 0,
            last_project_completed_at: None,
        };

        let mut state = self.state.lock().unwrap();
        state.referrals.push(referral.clone());
        state.activity.insert(referral.id.clone(), activity);
        Ok(referral)
    }

    async fn link_referral_account(
        &self,
        referred_email: &str,
        user_id: &str,
    ) -> Result<Vec<String>, anyhow::Error> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        let ids = state
            .referrals
            .iter_mut()
            .filter(|r| r.referred_email == referred_email && r.referred_user_id.is_none())
            .map(|referral| {
                referral.referred_user_id = Some(user_id.to_string());
                referral.id.clone()
            })
            .collect();
        Ok(ids)
    }

    async fn set_referred_completions(
        &self,
        referral_id: &str,
        count: i32,
    ) -> Result<Option<ReferralActivity>, anyhow::Error> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        Ok(state.activity.get_mut(referral_id).map(|activity| {
            activity.referred_projects_completed = count;
            activity.last_project_completed_at = Some(dates::now());
            activity.clone()
        }))
    }

    async fn get_referral_standings(
        &self,
        referrer_id: &str,
        since: NaiveDateTime,
    ) -> Result<Vec<ReferralStanding>, anyhow::Error> {
        self.check()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .referrals
            .iter()
            .filter(|r| r.referrer_id == referrer_id && r.created_at >= since)
            .filter_map(|r| {
                state.activity.get(&r.id).map(|a| ReferralStanding {
                    referral_id: r.id.clone(),
                    created_at: r.created_at,
                    referred_projects_completed: a.referred_projects_completed,
                })
            })
            .collect())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, new_user: &NewUser) -> Result<Option<User>, anyhow::Error> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        if state.users.iter().any(|u| u.email == new_user.email) {
            return Ok(None);
        }

        let now = dates::now();
        let user = User {
            id: Uuid::new_v4().hyphenated().to_string(),
            email: new_user.email.clone(),
            name: new_user.name.clone(),
            avatar_url: new_user.avatar_url.clone(),
            created_at: now,
            updated_at: now,
        };
        state.users.push(user.clone());
        state.loyalty.entry(user.id.clone()).or_insert(0);
        Ok(Some(user))
    }

    async fn get_user_by_id(&self, user_id: &str) -> Result<Option<User>, anyhow::Error> {
        self.check()?;
        let state = self.state.lock().unwrap();
        Ok(state.users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn get_all_users(&self) -> Result<Vec<User>, anyhow::Error> {
        self.check()?;
        let mut users = self.state.lock().unwrap().users.clone();
        users.reverse();
        Ok(users)
    }
}
