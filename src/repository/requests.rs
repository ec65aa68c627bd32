//! Maintenance request persistence

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{FromRow, PgConnection};

use super::{is_foreign_key_violation, teams::lock_membership, Repository, RequestStore};
use crate::{
    error::{AppError, AppResult},
    models::request::{MaintenanceRequest, NewRequest, RequestCommit, RequestFilter, RequestStatus},
};

/// Raw `maintenance_requests` row; enums are stored as their wire names
#[derive(FromRow)]
struct MaintenanceRequestRow {
    id: i32,
    subject: String,
    equipment_id: i32,
    request_type: String,
    team_id: Option<i32>,
    technician_id: Option<i32>,
    scheduled_date: DateTime<Utc>,
    duration_micros: Option<i64>,
    status: String,
    created_by_id: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i32,
}

impl TryFrom<MaintenanceRequestRow> for MaintenanceRequest {
    type Error = AppError;

    fn try_from(row: MaintenanceRequestRow) -> Result<Self, Self::Error> {
        Ok(MaintenanceRequest {
            id: row.id,
            subject: row.subject,
            equipment: row.equipment_id,
            request_type: row.request_type.parse()?,
            team: row.team_id,
            technician: row.technician_id,
            scheduled_date: row.scheduled_date,
            duration: row.duration_micros.map(Duration::microseconds),
            status: row.status.parse()?,
            created_by: row.created_by_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            version: row.version,
        })
    }
}

fn micros(duration: Option<Duration>) -> AppResult<Option<i64>> {
    duration
        .map(|d| {
            d.num_microseconds()
                .ok_or_else(|| AppError::Validation(format!("Duration {} is out of range", d)))
        })
        .transpose()
}

/// Share-locks the technician's membership when both are set, so a concurrent
/// removal either waits for this write or is seen by it
async fn check_membership(conn: &mut PgConnection, team: Option<i32>, technician: Option<i32>) -> AppResult<()> {
    if let (Some(team_id), Some(technician)) = (team, technician) {
        if !lock_membership(conn, team_id, technician).await? {
            return Err(AppError::TechnicianNotInTeam { technician, team: Some(team_id) });
        }
    }
    Ok(())
}

/// A reference deleted between planning and writing
fn vanished_reference(e: sqlx::Error) -> AppError {
    if is_foreign_key_violation(&e) {
        AppError::NotFound("A referenced user, team or equipment no longer exists".to_string())
    } else {
        e.into()
    }
}

fn into_requests(rows: Vec<MaintenanceRequestRow>) -> AppResult<Vec<MaintenanceRequest>> {
    rows.into_iter().map(MaintenanceRequest::try_from).collect()
}

#[async_trait]
impl RequestStore for Repository {
    async fn list_requests(&self, filter: &RequestFilter) -> AppResult<Vec<MaintenanceRequest>> {
        let rows = sqlx::query_as::<_, MaintenanceRequestRow>(
            r#"
            SELECT * FROM maintenance_requests
            WHERE ($1::int IS NULL OR equipment_id = $1)
              AND ($2::text IS NULL OR request_type = $2)
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(filter.equipment)
        .bind(filter.request_type.map(|t| t.as_str()))
        .fetch_all(&self.pool)
        .await?;
        into_requests(rows)
    }

    async fn get_request(&self, id: i32) -> AppResult<MaintenanceRequest> {
        sqlx::query_as::<_, MaintenanceRequestRow>("SELECT * FROM maintenance_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Maintenance request {} not found", id)))?
            .try_into()
    }

    async fn insert_request(&self, data: &NewRequest) -> AppResult<MaintenanceRequest> {
        let duration = micros(data.duration)?;
        let mut tx = self.pool.begin().await?;
        check_membership(&mut tx, data.team, data.technician).await?;

        let row = sqlx::query_as::<_, MaintenanceRequestRow>(
            r#"
            INSERT INTO maintenance_requests (
                subject, equipment_id, request_type, team_id, technician_id,
                scheduled_date, duration_micros, status, created_by_id,
                created_at, updated_at, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10, 0)
            RETURNING *
            "#,
        )
        .bind(&data.subject)
        .bind(data.equipment)
        .bind(data.request_type.as_str())
        .bind(data.team)
        .bind(data.technician)
        .bind(data.scheduled_date)
        .bind(duration)
        .bind(RequestStatus::New.as_str())
        .bind(data.created_by)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .map_err(vanished_reference)?;

        tx.commit().await?;
        row.try_into()
    }

    async fn commit_request(&self, commit: &RequestCommit) -> AppResult<Option<MaintenanceRequest>> {
        let request = &commit.request;
        let duration = micros(request.duration)?;
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, MaintenanceRequestRow>(
            r#"
            UPDATE maintenance_requests SET
                subject = $1, equipment_id = $2, request_type = $3, team_id = $4,
                technician_id = $5, scheduled_date = $6, duration_micros = $7,
                status = $8, updated_at = $9, version = version + 1
            WHERE id = $10 AND version = $11
            RETURNING *
            "#,
        )
        .bind(&request.subject)
        .bind(request.equipment)
        .bind(request.request_type.as_str())
        .bind(request.team)
        .bind(request.technician)
        .bind(request.scheduled_date)
        .bind(duration)
        .bind(request.status.as_str())
        .bind(now)
        .bind(request.id)
        .bind(request.version)
        .fetch_optional(&mut *tx)
        .await
        .map_err(vanished_reference)?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };
        check_membership(&mut tx, request.team, request.technician).await?;

        if let Some(equipment_id) = commit.retire_equipment {
            sqlx::query("UPDATE equipment SET is_usable = FALSE, updated_at = $1 WHERE id = $2")
                .bind(now)
                .bind(equipment_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        row.try_into().map(Some)
    }

    async fn delete_request(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM maintenance_requests WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Maintenance request {} not found", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_beyond_the_column_range_are_refused() {
        assert_eq!(micros(None).unwrap(), None);
        assert_eq!(micros(Some(Duration::minutes(90))).unwrap(), Some(5_400_000_000));
        assert!(matches!(
            micros(Some(Duration::seconds(i64::MAX / 1_000))),
            Err(AppError::Validation(_))
        ));
    }
}
