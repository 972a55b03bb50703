use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::PgPool;
use uuid::Uuid;

use super::ProjectStore;
use crate::{
    models::projects::Project,
    utils::dates::{self, EtaOutOfRange},
};

#[derive(Clone)]
pub struct ProjectRepository {
    conn: PgPool,
}

impl ProjectRepository {
    pub fn new(conn: PgPool) -> Self {
        ProjectRepository { conn }
    }
}

#[async_trait]
impl ProjectStore for ProjectRepository {
    async fn insert_project(
        &self,
        user_id: &str,
        title: &str,
        package: &str,
        size: &str,
        eta: NaiveDateTime,
    ) -> Result<Project, anyhow::Error> {
        let project_id = Uuid::new_v4().hyphenated().to_string();
        let now = dates::now();

        let project = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects
            (id, user_id, title, package, size, status, eta, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, 'intake', $6, $7, $7)
            RETURNING *
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .bind(title)
        .bind(package)
        .bind(size)
        .bind(eta)
        .bind(now)
        .fetch_one(&self.conn)
        .await?;

        Ok(project)
    }

    async fn get_project_for_user(
        &self,
        id: &str,
        user_id: &str,
    ) -> Result<Option<Project>, anyhow::Error> {
        let project = sqlx::query_as::<_, Project>(
            "SELECT * FROM projects WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.conn)
        .await?;

        Ok(project)
    }

    async fn get_projects_by_user(&self, user_id: &str) -> Result<Vec<Project>, anyhow::Error> {
        let projects = sqlx::query_as::<_, Project>(
            "SELECT * FROM projects WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.conn)
        .await?;

        Ok(projects)
    }

    async fn get_all_projects(&self) -> Result<Vec<Project>, anyhow::Error> {
        let projects =
            sqlx::query_as::<_, Project>("SELECT * FROM projects ORDER BY updated_at DESC")
                .fetch_all(&self.conn)
                .await?;

        Ok(projects)
    }

    async fn update_project_status(
        &self,
        id: &str,
        user_id: &str,
        status: &str,
    ) -> Result<Option<Project>, anyhow::Error> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects SET status = $1, updated_at = $2
            WHERE id = $3 AND user_id = $4
            RETURNING *
            "#,
        )
        .bind(status)
        .bind(dates::now())
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.conn)
        .await?;

        Ok(project)
    }

    async fn shift_project_etas(
        &self,
        ids: &[String],
        delta_days: i64,
    ) -> Result<u64, anyhow::Error> {
        let mut tx = self.conn.begin().await?;

        let rows: Vec<(String, NaiveDateTime)> =
            sqlx::query_as("SELECT id, eta FROM projects WHERE id = ANY($1) FOR UPDATE")
                .bind(ids)
                .fetch_all(&mut *tx)
                .await?;

        let now = dates::now();
        let mut updated = 0;
        for (id, eta) in rows {
            let eta = dates::shift_eta(eta, delta_days).ok_or(EtaOutOfRange(delta_days))?;
            let result = sqlx::query("UPDATE projects SET eta = $1, updated_at = $2 WHERE id = $3")
                .bind(eta)
                .bind(now)
                .bind(&id)
                .execute(&mut *tx)
                .await?;
            updated += result.rows_affected();
        }

        tx.commit().await?;

        Ok(updated)
    }
}
