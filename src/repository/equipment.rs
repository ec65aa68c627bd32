//! Equipment persistence

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgConnection;

use super::{equipment_scrapped, is_unique_violation, EquipmentStore, Repository};
use crate::{
    error::{AppError, AppResult},
    models::{
        equipment::{CreateEquipment, Equipment, UpdateEquipment},
        request::RequestStatus,
    },
};

fn duplicate_serial(serial: &str) -> impl FnOnce(sqlx::Error) -> AppError + '_ {
    move |e| {
        if is_unique_violation(&e) {
            AppError::DuplicateSerial(serial.to_string())
        } else {
            e.into()
        }
    }
}

/// Row-locks the equipment until the transaction ends.
///
/// A scrap commit writes `is_usable` under the same lock, so the scrapped
/// check that follows sees every scrap committed before it.
async fn lock_equipment(conn: &mut PgConnection, id: i32) -> AppResult<Equipment> {
    sqlx::query_as::<_, Equipment>("SELECT * FROM equipment WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
}

async fn ensure_not_scrapped(conn: &mut PgConnection, id: i32) -> AppResult<()> {
    let scrapped: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM maintenance_requests WHERE equipment_id = $1 AND status = $2)",
    )
    .bind(id)
    .bind(RequestStatus::Scrap.as_str())
    .fetch_one(conn)
    .await?;
    if scrapped {
        return Err(equipment_scrapped(id));
    }
    Ok(())
}

#[async_trait]
impl EquipmentStore for Repository {
    async fn list_equipment(&self) -> AppResult<Vec<Equipment>> {
        let rows = sqlx::query_as::<_, Equipment>("SELECT * FROM equipment ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn get_equipment(&self, id: i32) -> AppResult<Equipment> {
        sqlx::query_as::<_, Equipment>("SELECT * FROM equipment WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    async fn create_equipment(&self, data: &CreateEquipment) -> AppResult<Equipment> {
        sqlx::query_as::<_, Equipment>(
            r#"
            INSERT INTO equipment (
                name, serial_number, department_or_owner, location,
                purchase_date, warranty_end, default_team_id, default_technician_id,
                is_usable, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
            RETURNING *
            "#,
        )
        .bind(&data.name)
        .bind(&data.serial_number)
        .bind(&data.department_or_owner)
        .bind(&data.location)
        .bind(data.purchase_date)
        .bind(data.warranty_end)
        .bind(data.default_team)
        .bind(data.default_technician)
        .bind(data.is_usable.unwrap_or(true))
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(duplicate_serial(&data.serial_number))
    }

    async fn update_equipment(&self, id: i32, data: &UpdateEquipment) -> AppResult<Equipment> {
        let mut tx = self.pool.begin().await?;
        let mut equipment = lock_equipment(&mut tx, id).await?;
        if data.is_usable == Some(true) {
            ensure_not_scrapped(&mut tx, id).await?;
        }
        data.apply_to(&mut equipment);

        let updated = sqlx::query_as::<_, Equipment>(
            r#"
            UPDATE equipment SET
                name = $1, serial_number = $2, department_or_owner = $3, location = $4,
                purchase_date = $5, warranty_end = $6, default_team_id = $7,
                default_technician_id = $8, is_usable = COALESCE($9, is_usable), updated_at = $10
            WHERE id = $11
            RETURNING *
            "#,
        )
        .bind(&equipment.name)
        .bind(&equipment.serial_number)
        .bind(&equipment.department_or_owner)
        .bind(&equipment.location)
        .bind(equipment.purchase_date)
        .bind(equipment.warranty_end)
        .bind(equipment.default_team)
        .bind(equipment.default_technician)
        .bind(data.is_usable)
        .bind(Utc::now())
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(duplicate_serial(&equipment.serial_number))?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn set_equipment_usability(&self, id: i32, usable: bool) -> AppResult<Equipment> {
        let mut tx = self.pool.begin().await?;
        lock_equipment(&mut tx, id).await?;
        if usable {
            ensure_not_scrapped(&mut tx, id).await?;
        }

        let updated = sqlx::query_as::<_, Equipment>(
            "UPDATE equipment SET is_usable = $1, updated_at = $2 WHERE id = $3 RETURNING *",
        )
        .bind(usable)
        .bind(Utc::now())
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn delete_equipment(&self, id: i32) -> AppResult<()> {
        // Requests cascade
        let result = sqlx::query("DELETE FROM equipment WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Equipment {} not found", id)));
        }
        Ok(())
    }
}
