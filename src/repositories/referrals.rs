use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::PgPool;
use uuid::Uuid;

use super::ReferralStore;
use crate::{
    models::referrals::{Referral, ReferralActivity, ReferralStanding},
    utils::dates,
};

#[derive(Clone)]
pub struct ReferralRepository {
    conn: PgPool,
}

impl ReferralRepository {
    pub fn new(conn: PgPool) -> Self {
        ReferralRepository { conn }
    }
}

#[async_trait]
impl ReferralStore for ReferralRepository {
    async fn insert_referral(
        &self,
        referrer_id: &str,
        referred_email: &str,
    ) -> Result<Referral, anyhow::Error> {
        let referral_id = Uuid::new_v4().hyphenated().to_string();
        let mut tx = self.conn.begin().await?;

        let referral = sqlx::query_as::<_, Referral>(
            r#"
            INSERT INTO referrals (id, referrer_id, referred_email, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&referral_id)
        .bind(referrer_id)
        .bind(referred_email)
        .bind(dates::now())
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO referral_activity (referral_id) VALUES ($1)")
            .bind(&referral_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(referral)
    }

    async fn link_referral_account(
        &self,
        referred_email: &str,
        user_id: &str,
    ) -> Result<Vec<String>, anyhow::Error> {
        let ids: Vec<String> = sqlx::query_scalar(
            r#"
            UPDATE referrals SET referred_user_id = $1
            WHERE referred_email = $2 AND referred_user_id IS NULL
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(referred_email)
        .fetch_all(&self.conn)
        .await?;

        Ok(ids)
    }

    async fn set_referred_completions(
        &self,
        referral_id: &str,
        count: i32,
    ) -> Result<Option<ReferralActivity>, anyhow::Error> {
        let activity = sqlx::query_as::<_, ReferralActivity>(
            r#"
            UPDATE referral_activity
            SET referred_projects_completed = $1, last_project_completed_at = $2
            WHERE referral_id = $3
            RETURNING *
            "#,
        )
        .bind(count)
        .bind(dates::now())
        .bind(referral_id)
        .fetch_optional(&self.conn)
        .await?;

        Ok(activity)
    }

    async fn get_referral_standings(
        &self,
        referrer_id: &str,
        since: NaiveDateTime,
    ) -> Result<Vec<ReferralStanding>, anyhow::Error> {
        let standings = sqlx::query_as::<_, ReferralStanding>(
            r#"
            SELECT r.id AS referral_id, r.created_at, ra.referred_projects_completed
            FROM referrals r
            JOIN referral_activity ra ON ra.referral_id = r.id
            WHERE r.referrer_id = $1 AND r.created_at >= $2
            "#,
        )
        .bind(referrer_id)
        .bind(since)
        .fetch_all(&self.conn)
        .await?;

        Ok(standings)
    }
}
