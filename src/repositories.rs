use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::models::{
    projects::Project,
    referrals::{Referral, ReferralActivity, ReferralStanding},
    users::{NewUser, User},
};

pub mod loyalty;
#[cfg(test)]
pub mod memory;
pub mod projects;
pub mod referrals;
pub mod users;

#[async_trait]
pub trait ProjectStore: Send + Sync + 'static {
    async fn insert_project(
        &self,
        user_id: &str,
        title: &str,
        package: &str,
        size: &str,
        eta: NaiveDateTime,
    ) -> Result<Project, anyhow::Error>;

    async fn get_project_for_user(
        &self,
        id: &str,
        user_id: &str,
    ) -> Result<Option<Project>, anyhow::Error>;

    async fn get_projects_by_user(&self, user_id: &str) -> Result<Vec<Project>, anyhow::Error>;

    async fn get_all_projects(&self) -> Result<Vec<Project>, anyhow::Error>;

    /// Returns `None` when the project does not exist or belongs to someone else.
    async fn update_project_status(
        &self,
        id: &str,
        user_id: &str,
        status: &str,
    ) -> Result<Option<Project>, anyhow::Error>;

    /// Shifts the ETA of every listed project, returning how many rows changed.
    async fn shift_project_etas(&self, ids: &[String], delta_days: i64)
        -> Result<u64, anyhow::Error>;
}

#[async_trait]
pub trait LoyaltyStore: Send + Sync + 'static {
    async fn get_mixes_completed(&self, user_id: &str) -> Result<Option<i64>, anyhow::Error>;

    /// Returns the new count, or `None` when the account does not exist.
    async fn increment_mixes_completed(&self, user_id: &str)
        -> Result<Option<i64>, anyhow::Error>;
}

#[async_trait]
pub trait ReferralStore: Send + Sync + 'static {
    /// Creates the referral together with its zeroed activity record.
    async fn insert_referral(
        &self,
        referrer_id: &str,
        referred_email: &str,
    ) -> Result<Referral, anyhow::Error>;

    /// Links every unlinked referral for `referred_email`, returning their ids.
    async fn link_referral_account(
        &self,
        referred_email: &str,
        user_id: &str,
    ) -> Result<Vec<String>, anyhow::Error>;

    /// Overwrites the completion count. `None` if the referral is unknown.
    async fn set_referred_completions(
        &self,
        referral_id: &str,
        count: i32,
    ) -> Result<Option<ReferralActivity>, anyhow::Error>;

    async fn get_referral_standings(
        &self,
        referrer_id: &str,
        since: NaiveDateTime,
    ) -> Result<Vec<ReferralStanding>, anyhow::Error>;
}

#[async_trait]
pub trait UserStore: Send + Sync + 'static {
    /// Creates the account and its loyalty row. `None` if the email is taken.
    async fn insert_user(&self, new_user: &NewUser) -> Result<Option<User>, anyhow::Error>;

    async fn get_user_by_id(&self, user_id: &str) -> Result<Option<User>, anyhow::Error>;

    async fn get_all_users(&self) -> Result<Vec<User>, anyhow::Error>;
}
