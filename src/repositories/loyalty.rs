use async_trait::async_trait;
use sqlx::PgPool;

use super::LoyaltyStore;

#[derive(Clone)]
pub struct LoyaltyRepository {
    conn: PgPool,
}

impl LoyaltyRepository {
    pub fn new(conn: PgPool) -> Self {
        LoyaltyRepository { conn }
    }
}

#[async_trait]
impl LoyaltyStore for LoyaltyRepository {
    async fn get_mixes_completed(&self, user_id: &str) -> Result<Option<i64>, anyhow::Error> {
        let count: Option<i32> =
            sqlx::query_scalar("SELECT mixes_completed FROM loyalty WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.conn)
                .await?;

        Ok(count.map(i64::from))
    }

    async fn increment_mixes_completed(
        &self,
        user_id: &str,
    ) -> Result<Option<i64>, anyhow::Error> {
        let count: Option<i32> = sqlx::query_scalar(
            r#"
            INSERT INTO loyalty (user_id, mixes_completed)
            SELECT id, 1 FROM users WHERE id = $1
            ON CONFLICT (user_id)
            DO UPDATE SET mixes_completed = loyalty.mixes_completed + 1
            RETURNING mixes_completed
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.conn)
        .await?;

        Ok(count.map(i64::from))
    }
}
