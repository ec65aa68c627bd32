//! Team and membership persistence

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};

use super::{
    is_foreign_key_violation, is_unique_violation, member_still_assigned, Repository, TeamStore,
};
use crate::{
    error::{AppError, AppResult},
    models::team::{normalize_members, Team},
};

#[derive(FromRow)]
struct TeamRow {
    id: i32,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TeamRow {
    fn with_members(self, member_ids: Vec<i32>) -> Team {
        Team {
            id: self.id,
            name: self.name,
            member_ids,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

fn duplicate_name(name: &str) -> impl FnOnce(sqlx::Error) -> AppError + '_ {
    move |e| {
        if is_unique_violation(&e) {
            AppError::DuplicateName(name.to_string())
        } else {
            e.into()
        }
    }
}

async fn load_member_ids(conn: &mut PgConnection, team_id: i32) -> AppResult<Vec<i32>> {
    let ids = sqlx::query_scalar::<_, i32>(
        "SELECT user_id FROM team_members WHERE team_id = $1 ORDER BY user_id",
    )
    .bind(team_id)
    .fetch_all(conn)
    .await?;
    Ok(ids)
}

async fn load_team(conn: &mut PgConnection, id: i32) -> AppResult<Team> {
    let row = sqlx::query_as::<_, TeamRow>("SELECT * FROM maintenance_teams WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Team {} not found", id)))?;
    let members = load_member_ids(conn, id).await?;
    Ok(row.with_members(members))
}

/// Bumps `updated_at`, holding the team row lock until the transaction ends
async fn touch_team(conn: &mut PgConnection, id: i32) -> AppResult<()> {
    let result = sqlx::query("UPDATE maintenance_teams SET updated_at = $1 WHERE id = $2")
        .bind(Utc::now())
        .bind(id)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Team {} not found", id)));
    }
    Ok(())
}

async fn attach_member(conn: &mut PgConnection, team_id: i32, user_id: i32) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO team_members (team_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(team_id)
    .bind(user_id)
    .execute(conn)
    .await
    .map_err(|e| {
        if is_foreign_key_violation(&e) {
            AppError::NotFound(format!("User {} not found", user_id))
        } else {
            e.into()
        }
    })?;
    Ok(())
}

/// Removes a membership unless the user is the technician of one of the team's requests.
///
/// The membership row is locked first; request commits take a share lock on
/// the same row, so the count below sees every assignment committed before
/// the delete.
async fn detach_member(conn: &mut PgConnection, team_id: i32, user_id: i32) -> AppResult<()> {
    let locked = sqlx::query_scalar::<_, i32>(
        "SELECT user_id FROM team_members WHERE team_id = $1 AND user_id = $2 FOR UPDATE",
    )
    .bind(team_id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;
    if locked.is_none() {
        return Ok(());
    }

    let assigned: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM maintenance_requests WHERE team_id = $1 AND technician_id = $2",
    )
    .bind(team_id)
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?;
    if assigned > 0 {
        return Err(member_still_assigned(team_id, user_id, assigned));
    }

    sqlx::query("DELETE FROM team_members WHERE team_id = $1 AND user_id = $2")
        .bind(team_id)
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Share-locks the membership row for the rest of the transaction
pub(super) async fn lock_membership(conn: &mut PgConnection, team_id: i32, user_id: i32) -> AppResult<bool> {
    let row = sqlx::query_scalar::<_, i32>(
        "SELECT user_id FROM team_members WHERE team_id = $1 AND user_id = $2 FOR SHARE",
    )
    .bind(team_id)
    .bind(user_id)
    .fetch_optional(conn)
    .await?;
    Ok(row.is_some())
}

#[async_trait]
impl TeamStore for Repository {
    async fn list_teams(&self) -> AppResult<Vec<Team>> {
        let rows = sqlx::query_as::<_, TeamRow>("SELECT * FROM maintenance_teams ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        let pairs = sqlx::query_as::<_, (i32, i32)>(
            "SELECT team_id, user_id FROM team_members ORDER BY team_id, user_id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut members: HashMap<i32, Vec<i32>> = HashMap::new();
        for (team_id, user_id) in pairs {
            members.entry(team_id).or_default().push(user_id);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let ids = members.remove(&row.id).unwrap_or_default();
                row.with_members(ids)
            })
            .collect())
    }

    async fn get_team(&self, id: i32) -> AppResult<Team> {
        let mut conn = self.pool.acquire().await?;
        load_team(&mut conn, id).await
    }

    async fn create_team(&self, name: &str, member_ids: &[i32]) -> AppResult<Team> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, TeamRow>(
            r#"
            INSERT INTO maintenance_teams (name, created_at, updated_at)
            VALUES ($1, $2, $2)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(duplicate_name(name))?;

        let members = normalize_members(member_ids);
        for &user_id in &members {
            attach_member(&mut tx, row.id, user_id).await?;
        }

        tx.commit().await?;
        Ok(row.with_members(members))
    }

    async fn update_team(&self, id: i32, name: Option<&str>, member_ids: Option<&[i32]>) -> AppResult<Team> {
        let mut tx = self.pool.begin().await?;
        touch_team(&mut tx, id).await?;

        if let Some(name) = name {
            sqlx::query("UPDATE maintenance_teams SET name = $1 WHERE id = $2")
                .bind(name)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(duplicate_name(name))?;
        }

        if let Some(wanted) = member_ids {
            let wanted = normalize_members(wanted);
            let current = load_member_ids(&mut tx, id).await?;
            for &user_id in current.iter().filter(|u| wanted.binary_search(u).is_err()) {
                detach_member(&mut tx, id, user_id).await?;
            }
            for &user_id in wanted.iter().filter(|u| current.binary_search(u).is_err()) {
                attach_member(&mut tx, id, user_id).await?;
            }
        }

        // An early return above drops `tx` and rolls everything back
        let team = load_team(&mut tx, id).await?;
        tx.commit().await?;
        Ok(team)
    }

    async fn add_team_member(&self, id: i32, user_id: i32) -> AppResult<Team> {
        let mut tx = self.pool.begin().await?;
        touch_team(&mut tx, id).await?;
        attach_member(&mut tx, id, user_id).await?;
        let team = load_team(&mut tx, id).await?;
        tx.commit().await?;
        Ok(team)
    }

    async fn remove_team_member(&self, id: i32, user_id: i32) -> AppResult<Team> {
        let mut tx = self.pool.begin().await?;
        touch_team(&mut tx, id).await?;
        detach_member(&mut tx, id, user_id).await?;
        let team = load_team(&mut tx, id).await?;
        tx.commit().await?;
        Ok(team)
    }

    async fn is_team_member(&self, id: i32, user_id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM team_members WHERE team_id = $1 AND user_id = $2)",
        )
        .bind(id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn delete_team(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        // Bump versions so commits planned against the old team fail their check
        sqlx::query(
            r#"
            UPDATE maintenance_requests
            SET team_id = NULL, version = version + 1, updated_at = $1
            WHERE team_id = $2
            "#,
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await?;

        // Equipment defaults are SET NULL by the schema
        let result = sqlx::query("DELETE FROM maintenance_teams WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Team {} not found", id)));
        }
        tx.commit().await?;
        Ok(())
    }
}
