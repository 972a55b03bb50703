use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::UserStore;
use crate::{
    models::users::{NewUser, User},
    utils::dates,
};

#[derive(Clone)]
pub struct UserRepository {
    conn: PgPool,
}

impl UserRepository {
    pub fn new(conn: PgPool) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn insert_user(&self, new_user: &NewUser) -> Result<Option<User>, anyhow::Error> {
        let user_id = Uuid::new_v4().hyphenated().to_string();
        let now = dates::now();
        let mut tx = self.conn.begin().await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, name, avatar_url, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            ON CONFLICT (email) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(&user_id)
        .bind(&new_user.email)
        .bind(&new_user.name)
        .bind(&new_user.avatar_url)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(user) = user else {
            return Ok(None);
        };

        sqlx::query("INSERT INTO loyalty (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(&user.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Some(user))
    }

    async fn get_user_by_id(&self, user_id: &str) -> Result<Option<User>, anyhow::Error> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.conn)
            .await?;

        Ok(user)
    }

    async fn get_all_users(&self) -> Result<Vec<User>, anyhow::Error> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC")
            .fetch_all(&self.conn)
            .await?;

        Ok(users)
    }
}
