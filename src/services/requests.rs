//! Maintenance request lifecycle
//!
//! Creation, status transitions, technician assignment and general edits all
//! funnel into the same planning step: one transition table, one membership
//! check, one place where scrapping retires the equipment.

use std::sync::Arc;

use validator::Validate;

use super::names::Names;
use crate::{
    config::LifecycleConfig,
    error::{AppError, AppResult},
    models::request::{
        CreateRequest, MaintenanceRequest, MaintenanceRequestDetails, NewRequest, RequestCommit,
        RequestFilter, RequestStatus, UpdateRequest,
    },
    repository::{EquipmentStore, RequestStore, Store, TeamStore, UserStore},
};

#[derive(Clone)]
pub struct RequestsService {
    store: Arc<dyn Store>,
    commit_attempts: u32,
}

impl RequestsService {
    pub fn new(store: Arc<dyn Store>, config: &LifecycleConfig) -> Self {
        Self {
            store,
            commit_attempts: config.commit_attempts.max(1),
        }
    }

    /// List all requests, newest first
    pub async fn list(&self) -> AppResult<Vec<MaintenanceRequestDetails>> {
        self.list_filtered(&RequestFilter::default()).await
    }

    /// List the requests of one equipment
    pub async fn list_for_equipment(&self, equipment_id: i32) -> AppResult<Vec<MaintenanceRequestDetails>> {
        self.store.get_equipment(equipment_id).await?;
        self.list_filtered(&RequestFilter {
            equipment: Some(equipment_id),
            ..Default::default()
        })
        .await
    }

    async fn list_filtered(&self, filter: &RequestFilter) -> AppResult<Vec<MaintenanceRequestDetails>> {
        let requests = self.store.list_requests(filter).await?;
        let names = Names::load_all(self.store.as_ref()).await?;
        Ok(requests.into_iter().map(|r| names.request(r)).collect())
    }

    pub async fn get(&self, id: i32) -> AppResult<MaintenanceRequestDetails> {
        let request = self.store.get_request(id).await?;
        self.details(request).await
    }

    async fn details(&self, request: MaintenanceRequest) -> AppResult<MaintenanceRequestDetails> {
        let names = Names::for_request(self.store.as_ref(), &request).await?;
        Ok(names.request(request))
    }

    /// Create a request in status `NEW`.
    ///
    /// Every check runs before the single insert, so a rejected request
    /// leaves no trace.
    pub async fn create(&self, data: &CreateRequest) -> AppResult<MaintenanceRequestDetails> {
        data.validate()?;

        let equipment = self.store.get_equipment(data.equipment).await?;

        // Requests without a team inherit the equipment's default team
        let team = match data.team {
            Some(team_id) => {
                self.store.get_team(team_id).await?;
                Some(team_id)
            }
            None => equipment.default_team,
        };

        if let Some(technician) = data.technician {
            self.store.get_user(technician).await?;
            let team_id = team.ok_or(AppError::TechnicianNotInTeam { technician, team: None })?;
            self.ensure_member(team_id, technician).await?;
        }

        if let Some(creator) = data.created_by {
            self.store.get_user(creator).await?;
        }

        let request = self
            .store
            .insert_request(&NewRequest {
                subject: data.subject.clone(),
                equipment: equipment.id,
                request_type: data.request_type.unwrap_or_default(),
                team,
                technician: data.technician,
                scheduled_date: data.scheduled_date,
                duration: data.duration,
                created_by: data.created_by,
            })
            .await?;

        tracing::info!(
            "Maintenance request {} created on equipment {} (team {:?}, technician {:?})",
            request.id,
            request.equipment,
            request.team,
            request.technician
        );

        self.details(request).await
    }

    /// Move a request to `status`. Re-submitting the current status is a no-op.
    pub async fn update_status(&self, id: i32, status: RequestStatus) -> AppResult<MaintenanceRequestDetails> {
        let edit = UpdateRequest {
            status: Some(status),
            ..Default::default()
        };
        let request = self.apply(id, &edit).await?;
        self.details(request).await
    }

    /// Assign a technician; must belong to the request's team when it has one
    pub async fn assign_technician(&self, id: i32, technician: i32) -> AppResult<MaintenanceRequestDetails> {
        let edit = UpdateRequest {
            technician: Some(Some(technician)),
            ..Default::default()
        };
        let request = self.apply(id, &edit).await?;
        self.details(request).await
    }

    /// Edit any subset of fields, status included
    pub async fn update(&self, id: i32, data: &UpdateRequest) -> AppResult<MaintenanceRequestDetails> {
        data.validate()?;
        let request = self.apply(id, data).await?;
        self.details(request).await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.store.delete_request(id).await?;
        tracing::info!("Maintenance request {} deleted", id);
        Ok(())
    }

    /// Read, validate and commit `edit` against the latest stored version.
    ///
    /// A concurrent writer makes the versioned commit miss; the request is then
    /// re-read and the edit re-validated against what that writer left behind.
    async fn apply(&self, id: i32, edit: &UpdateRequest) -> AppResult<MaintenanceRequest> {
        for attempt in 1..=self.commit_attempts {
            let current = self.store.get_request(id).await?;

            let Some(commit) = self.plan(&current, edit).await? else {
                tracing::debug!("Maintenance request {}: nothing to change", id);
                return Ok(current);
            };

            if let Some(updated) = self.store.commit_request(&commit).await? {
                log_commit(&current, &updated, commit.retire_equipment);
                return Ok(updated);
            }

            tracing::warn!(
                "Maintenance request {} changed concurrently (attempt {}/{}), re-reading",
                id,
                attempt,
                self.commit_attempts
            );
        }

        Err(AppError::Conflict(format!(
            "Maintenance request {} is being modified concurrently, please retry",
            id
        )))
    }

    /// Compute the validated next state of `current`, or `None` when `edit`
    /// changes nothing.
    async fn plan(&self, current: &MaintenanceRequest, edit: &UpdateRequest) -> AppResult<Option<RequestCommit>> {
        let mut next = current.clone();

        if let Some(ref subject) = edit.subject {
            next.subject = subject.clone();
        }
        if let Some(equipment) = edit.equipment {
            if equipment != current.equipment {
                self.store.get_equipment(equipment).await?;
            }
            next.equipment = equipment;
        }
        if let Some(request_type) = edit.request_type {
            next.request_type = request_type;
        }
        if let Some(team) = edit.team {
            if let Some(team_id) = team.filter(|_| team != current.team) {
                self.store.get_team(team_id).await?;
            }
            next.team = team;
        }
        if let Some(technician) = edit.technician {
            if let Some(user_id) = technician.filter(|_| technician != current.technician) {
                self.store.get_user(user_id).await?;
            }
            next.technician = technician;
        }
        if let Some(scheduled_date) = edit.scheduled_date {
            next.scheduled_date = scheduled_date;
        }
        if let Some(duration) = edit.duration {
            next.duration = duration;
        }
        if let Some(status) = edit.status {
            next.status = current.status.transition_to(status)?;
        }

        if next == *current {
            return Ok(None);
        }

        if let (Some(team_id), Some(technician)) = (next.team, next.technician) {
            self.ensure_member(team_id, technician).await?;
        }

        // Scrapping (or moving a scrapped request) retires the equipment in the same commit
        let retire_equipment = (next.status == RequestStatus::Scrap
            && (current.status != RequestStatus::Scrap || next.equipment != current.equipment))
            .then_some(next.equipment);

        Ok(Some(RequestCommit {
            request: next,
            retire_equipment,
        }))
    }

    async fn ensure_member(&self, team_id: i32, technician: i32) -> AppResult<()> {
        if self.store.is_team_member(team_id, technician).await? {
            Ok(())
        } else {
            Err(AppError::TechnicianNotInTeam {
                technician,
                team: Some(team_id),
            })
        }
    }
}

fn log_commit(before: &MaintenanceRequest, after: &MaintenanceRequest, retired: Option<i32>) {
    if before.status != after.status {
        tracing::info!(
            "Maintenance request {}: status {} -> {}",
            after.id,
            before.status,
            after.status
        );
    }
    if before.technician != after.technician {
        tracing::info!(
            "Maintenance request {}: technician {:?} -> {:?}",
            after.id,
            before.technician,
            after.technician
        );
    }
    if let Some(equipment_id) = retired {
        tracing::info!(
            "Equipment {} marked unusable (request {} scrapped)",
            equipment_id,
            after.id
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{equipment::CreateEquipment, request::RequestType, user::CreateUser},
        repository::memory::MemoryStore,
    };
    use chrono::{NaiveDate, Utc};

    struct Fixture {
        store: Arc<MemoryStore>,
        service: RequestsService,
        equipment: i32,
        team: i32,
        member: i32,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let member = store
            .create_user(&CreateUser {
                username: "alice".to_string(),
                first_name: "Alice".to_string(),
                last_name: "Martin".to_string(),
                email: None,
            })
            .await
            .unwrap();
        let team = store.create_team("Mechanics", &[member.id]).await.unwrap();
        let equipment = store
            .create_equipment(&CreateEquipment {
                name: "Lathe".to_string(),
                serial_number: "L-100".to_string(),
                department_or_owner: "Workshop".to_string(),
                location: "Bay 2".to_string(),
                purchase_date: NaiveDate::from_ymd_opt(2021, 3, 1).unwrap(),
                warranty_end: None,
                default_team: Some(team.id),
                default_technician: None,
                is_usable: None,
            })
            .await
            .unwrap();
        let service = RequestsService::new(store.clone(), &LifecycleConfig::default());
        Fixture {
            store,
            service,
            equipment: equipment.id,
            team: team.id,
            member: member.id,
        }
    }

    fn create(equipment: i32) -> CreateRequest {
        CreateRequest {
            subject: "Spindle noise".to_string(),
            equipment,
            request_type: Some(RequestType::Corrective),
            team: None,
            technician: None,
            scheduled_date: Utc::now(),
            duration: None,
            created_by: None,
        }
    }

    #[tokio::test]
    async fn technician_qualified_through_default_team_passes_creation() {
        let fx = fixture().await;
        let request = fx
            .service
            .create(&CreateRequest {
                technician: Some(fx.member),
                ..create(fx.equipment)
            })
            .await
            .unwrap();

        assert_eq!(request.team, Some(fx.team));
        assert_eq!(request.technician, Some(fx.member));
        assert_eq!(request.technician_name.as_deref(), Some("Alice Martin"));
        assert_eq!(request.status, RequestStatus::New);
    }

    #[tokio::test]
    async fn same_status_resubmission_writes_nothing() {
        let fx = fixture().await;
        let created = fx.service.create(&create(fx.equipment)).await.unwrap();
        let before = fx.store.get_request(created.id).await.unwrap();

        let after = fx.service.update_status(created.id, RequestStatus::New).await.unwrap();

        assert_eq!(after.status, RequestStatus::New);
        let stored = fx.store.get_request(created.id).await.unwrap();
        assert_eq!(stored.version, before.version);
        assert_eq!(stored.updated_at, before.updated_at);
    }

    #[tokio::test]
    async fn stale_plan_is_revalidated_after_concurrent_write() {
        let fx = fixture().await;
        let created = fx.service.create(&create(fx.equipment)).await.unwrap();
        fx.service
            .update_status(created.id, RequestStatus::InProgress)
            .await
            .unwrap();

        // Another writer scraps the request between our read and our commit
        let snapshot = fx.store.get_request(created.id).await.unwrap();
        let mut scrapped = snapshot.clone();
        scrapped.status = RequestStatus::Scrap;
        fx.store
            .commit_request(&RequestCommit {
                request: scrapped,
                retire_equipment: Some(fx.equipment),
            })
            .await
            .unwrap()
            .unwrap();

        // A plan built on the snapshot would have been valid; the engine re-reads instead
        let err = fx
            .service
            .update_status(created.id, RequestStatus::Repaired)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidTransition {
                from: RequestStatus::Scrap,
                to: RequestStatus::Repaired
            }
        ));
    }
}
