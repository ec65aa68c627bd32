//! User persistence

use async_trait::async_trait;
use chrono::Utc;

use super::{is_unique_violation, Repository, UserStore};
use crate::{
    error::{AppError, AppResult},
    models::user::{CreateUser, User},
};

#[async_trait]
impl UserStore for Repository {
    async fn list_users(&self) -> AppResult<Vec<User>> {
        let rows = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY username")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn get_user(&self, id: i32) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
    }

    async fn create_user(&self, data: &CreateUser) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, first_name, last_name, email, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&data.username)
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(data.email.as_deref().unwrap_or_default())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("Username '{}' already exists", data.username))
            } else {
                e.into()
            }
        })
    }

    async fn delete_user(&self, id: i32) -> AppResult<()> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        // Clear request references with a version bump so commits planned
        // against the old values fail their check instead of restoring them
        for column in ["technician_id", "created_by_id"] {
            sqlx::query(&format!(
                "UPDATE maintenance_requests SET {column} = NULL, version = version + 1, updated_at = $1 WHERE {column} = $2"
            ))
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        // Memberships cascade; equipment defaults are SET NULL
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }
        tx.commit().await?;
        Ok(())
    }
}
