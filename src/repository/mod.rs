//! Repository layer: store traits and their implementations
//!
//! Services only see `Arc<dyn Store>`. [`Repository`] persists to PostgreSQL,
//! [`memory::MemoryStore`] keeps everything in process.

pub mod equipment;
pub mod memory;
pub mod requests;
pub mod teams;
pub mod users;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        equipment::{CreateEquipment, Equipment, UpdateEquipment},
        request::{MaintenanceRequest, NewRequest, RequestCommit, RequestFilter},
        team::Team,
        user::{CreateUser, User},
    },
};

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn list_users(&self) -> AppResult<Vec<User>>;
    async fn get_user(&self, id: i32) -> AppResult<User>;
    async fn create_user(&self, data: &CreateUser) -> AppResult<User>;
    /// Also clears every technician, creator and default-technician reference
    async fn delete_user(&self, id: i32) -> AppResult<()>;
}

#[async_trait]
pub trait TeamStore: Send + Sync {
    async fn list_teams(&self) -> AppResult<Vec<Team>>;
    async fn get_team(&self, id: i32) -> AppResult<Team>;
    /// Fails with `DuplicateName` when the name is taken
    async fn create_team(&self, name: &str, member_ids: &[i32]) -> AppResult<Team>;
    /// Rename and/or replace the member set as one write.
    ///
    /// Nothing is written when the name is taken, a member is unknown, or a
    /// departing member is still the technician of one of the team's requests.
    async fn update_team(&self, id: i32, name: Option<&str>, member_ids: Option<&[i32]>) -> AppResult<Team>;
    /// Idempotent
    async fn add_team_member(&self, id: i32, user_id: i32) -> AppResult<Team>;
    /// Idempotent; `Conflict` while the user is the technician of one of the team's requests
    async fn remove_team_member(&self, id: i32, user_id: i32) -> AppResult<Team>;
    async fn is_team_member(&self, id: i32, user_id: i32) -> AppResult<bool>;
    /// Also clears the team on equipment defaults and requests
    async fn delete_team(&self, id: i32) -> AppResult<()>;
}

#[async_trait]
pub trait EquipmentStore: Send + Sync {
    async fn list_equipment(&self) -> AppResult<Vec<Equipment>>;
    async fn get_equipment(&self, id: i32) -> AppResult<Equipment>;
    /// Fails with `DuplicateSerial` when the serial number is taken
    async fn create_equipment(&self, data: &CreateEquipment) -> AppResult<Equipment>;
    /// `Conflict` when the patch marks equipment with a scrapped request usable
    async fn update_equipment(&self, id: i32, data: &UpdateEquipment) -> AppResult<Equipment>;
    /// `Conflict` when marking equipment with a scrapped request usable
    async fn set_equipment_usability(&self, id: i32, usable: bool) -> AppResult<Equipment>;
    /// Also deletes the equipment's requests
    async fn delete_equipment(&self, id: i32) -> AppResult<()>;
}

#[async_trait]
pub trait RequestStore: Send + Sync {
    async fn list_requests(&self, filter: &RequestFilter) -> AppResult<Vec<MaintenanceRequest>>;
    async fn get_request(&self, id: i32) -> AppResult<MaintenanceRequest>;
    /// Fails with `TechnicianNotInTeam` unless the technician belongs to the team at write time
    async fn insert_request(&self, data: &NewRequest) -> AppResult<MaintenanceRequest>;
    /// Atomically write the request and apply `retire_equipment`.
    ///
    /// Returns `None` without writing anything when the stored version no
    /// longer matches `commit.request.version`. Membership of the technician
    /// in the team is re-checked as part of the same write.
    async fn commit_request(&self, commit: &RequestCommit) -> AppResult<Option<MaintenanceRequest>>;
    async fn delete_request(&self, id: i32) -> AppResult<()>;
}

/// Everything the services need from persistence
#[async_trait]
pub trait Store: UserStore + TeamStore + EquipmentStore + RequestStore {
    /// Connectivity check for readiness
    async fn ping(&self) -> AppResult<()>;
}

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for Repository {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn sqlstate_is(err: &sqlx::Error, code: &str) -> bool {
    err.as_database_error()
        .and_then(|e| e.code())
        .as_deref()
        == Some(code)
}

/// SQLSTATE 23505
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    sqlstate_is(err, "23505")
}

/// SQLSTATE 23503: a referenced row was deleted concurrently
pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    sqlstate_is(err, "23503")
}

pub(crate) fn member_still_assigned(team_id: i32, user_id: i32, assigned: i64) -> AppError {
    AppError::Conflict(format!(
        "User {} is the technician of {} request(s) of team {}; reassign them first",
        user_id, assigned, team_id
    ))
}

pub(crate) fn equipment_scrapped(equipment_id: i32) -> AppError {
    AppError::Conflict(format!(
        "Equipment {} has a scrapped maintenance request and cannot be marked usable",
        equipment_id
    ))
}
