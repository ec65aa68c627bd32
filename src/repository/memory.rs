//! In-process store
//!
//! Every operation takes the state lock once, so a request commit and its
//! scrap side effect are observed together or not at all.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{
    equipment_scrapped, member_still_assigned, EquipmentStore, RequestStore, Store, TeamStore, UserStore,
};
use crate::{
    error::{AppError, AppResult},
    models::{
        equipment::{CreateEquipment, Equipment, UpdateEquipment},
        request::{MaintenanceRequest, NewRequest, RequestCommit, RequestFilter, RequestStatus},
        team::{normalize_members, Team},
        user::{CreateUser, User},
    },
};

#[derive(Default)]
struct State {
    next_id: i32,
    users: BTreeMap<i32, User>,
    teams: BTreeMap<i32, Team>,
    equipment: BTreeMap<i32, Equipment>,
    requests: BTreeMap<i32, MaintenanceRequest>,
}

impl State {
    fn allocate_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn team_mut(&mut self, id: i32) -> AppResult<&mut Team> {
        self.teams
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Team {} not found", id)))
    }

    fn ensure_user(&self, id: i32) -> AppResult<()> {
        if self.users.contains_key(&id) {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("User {} not found", id)))
        }
    }

    fn ensure_team(&self, id: i32) -> AppResult<()> {
        if self.teams.contains_key(&id) {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Team {} not found", id)))
        }
    }

    /// Foreign keys of an equipment record must resolve
    fn check_equipment_refs(&self, equipment: &Equipment) -> AppResult<()> {
        if let Some(team) = equipment.default_team {
            self.ensure_team(team)?;
        }
        if let Some(user) = equipment.default_technician {
            self.ensure_user(user)?;
        }
        Ok(())
    }

    /// Mirrors the foreign keys and the membership rule of a request row
    fn check_request_refs(
        &self,
        equipment: i32,
        team: Option<i32>,
        technician: Option<i32>,
        created_by: Option<i32>,
    ) -> AppResult<()> {
        if !self.equipment.contains_key(&equipment) {
            return Err(AppError::NotFound(format!("Equipment {} not found", equipment)));
        }
        for user in [technician, created_by].into_iter().flatten() {
            self.ensure_user(user)?;
        }
        if let Some(team_id) = team {
            let members = &self
                .teams
                .get(&team_id)
                .ok_or_else(|| AppError::NotFound(format!("Team {} not found", team_id)))?
                .member_ids;
            if let Some(technician) = technician {
                if members.binary_search(&technician).is_err() {
                    return Err(AppError::TechnicianNotInTeam { technician, team: Some(team_id) });
                }
            }
        }
        Ok(())
    }

    fn ensure_removable(&self, team_id: i32, user_id: i32) -> AppResult<()> {
        let assigned = self
            .requests
            .values()
            .filter(|r| r.team == Some(team_id) && r.technician == Some(user_id))
            .count() as i64;
        if assigned > 0 {
            return Err(member_still_assigned(team_id, user_id, assigned));
        }
        Ok(())
    }

    fn ensure_not_scrapped(&self, equipment_id: i32) -> AppResult<()> {
        let scrapped = self
            .requests
            .values()
            .any(|r| r.equipment == equipment_id && r.status == RequestStatus::Scrap);
        if scrapped {
            return Err(equipment_scrapped(equipment_id));
        }
        Ok(())
    }

    /// Cleared references count as a write, so stale commits fail their version check
    fn clear_request_refs(&mut self, clear: impl Fn(&mut MaintenanceRequest) -> bool) {
        let now = Utc::now();
        for request in self.requests.values_mut() {
            if clear(request) {
                request.version += 1;
                request.updated_at = now;
            }
        }
    }

    fn serial_taken(&self, serial: &str, except: Option<i32>) -> bool {
        self.equipment
            .values()
            .any(|e| e.serial_number == serial && Some(e.id) != except)
    }
}

/// Store backed by process memory
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn list_users(&self) -> AppResult<Vec<User>> {
        let state = self.state.read().await;
        let mut users: Vec<User> = state.users.values().cloned().collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn get_user(&self, id: i32) -> AppResult<User> {
        self.state
            .read()
            .await
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
    }

    async fn create_user(&self, data: &CreateUser) -> AppResult<User> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.username == data.username) {
            return Err(AppError::Conflict(format!("Username '{}' already exists", data.username)));
        }
        let user = User {
            id: state.allocate_id(),
            username: data.username.clone(),
            first_name: data.first_name.clone(),
            last_name: data.last_name.clone(),
            email: data.email.clone().unwrap_or_default(),
            created_at: Utc::now(),
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete_user(&self, id: i32) -> AppResult<()> {
        let mut state = self.state.write().await;
        if state.users.remove(&id).is_none() {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }
        for team in state.teams.values_mut() {
            team.member_ids.retain(|&member| member != id);
        }
        for equipment in state.equipment.values_mut() {
            if equipment.default_technician == Some(id) {
                equipment.default_technician = None;
            }
        }
        state.clear_request_refs(|request| {
            let mut touched = false;
            if request.technician == Some(id) {
                request.technician = None;
                touched = true;
            }
            if request.created_by == Some(id) {
                request.created_by = None;
                touched = true;
            }
            touched
        });
        Ok(())
    }
}

#[async_trait]
impl TeamStore for MemoryStore {
    async fn list_teams(&self) -> AppResult<Vec<Team>> {
        let state = self.state.read().await;
        let mut teams: Vec<Team> = state.teams.values().cloned().collect();
        teams.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(teams)
    }

    async fn get_team(&self, id: i32) -> AppResult<Team> {
        self.state
            .read()
            .await
            .teams
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Team {} not found", id)))
    }

    async fn create_team(&self, name: &str, member_ids: &[i32]) -> AppResult<Team> {
        let mut state = self.state.write().await;
        if state.teams.values().any(|t| t.name == name) {
            return Err(AppError::DuplicateName(name.to_string()));
        }
        let members = normalize_members(member_ids);
        for &user in &members {
            state.ensure_user(user)?;
        }
        let now = Utc::now();
        let team = Team {
            id: state.allocate_id(),
            name: name.to_string(),
            member_ids: members,
            created_at: now,
            updated_at: now,
        };
        state.teams.insert(team.id, team.clone());
        Ok(team)
    }

    async fn update_team(&self, id: i32, name: Option<&str>, member_ids: Option<&[i32]>) -> AppResult<Team> {
        let mut state = self.state.write().await;
        let current = state
            .teams
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Team {} not found", id)))?;

        // Every check runs before the first mutation
        if let Some(name) = name {
            if state.teams.values().any(|t| t.name == name && t.id != id) {
                return Err(AppError::DuplicateName(name.to_string()));
            }
        }
        let members = match member_ids {
            Some(wanted) => {
                let wanted = normalize_members(wanted);
                for &user in &wanted {
                    state.ensure_user(user)?;
                }
                for &leaving in current.member_ids.iter().filter(|u| wanted.binary_search(u).is_err()) {
                    state.ensure_removable(id, leaving)?;
                }
                Some(wanted)
            }
            None => None,
        };

        let team = state.team_mut(id)?;
        if let Some(name) = name {
            team.name = name.to_string();
        }
        if let Some(members) = members {
            team.member_ids = members;
        }
        team.updated_at = Utc::now();
        Ok(team.clone())
    }

    async fn add_team_member(&self, id: i32, user_id: i32) -> AppResult<Team> {
        let mut state = self.state.write().await;
        state.ensure_user(user_id)?;
        let team = state.team_mut(id)?;
        if let Err(pos) = team.member_ids.binary_search(&user_id) {
            team.member_ids.insert(pos, user_id);
        }
        team.updated_at = Utc::now();
        Ok(team.clone())
    }

    async fn remove_team_member(&self, id: i32, user_id: i32) -> AppResult<Team> {
        let mut state = self.state.write().await;
        state.ensure_team(id)?;
        state.ensure_removable(id, user_id)?;
        let team = state.team_mut(id)?;
        team.member_ids.retain(|&member| member != user_id);
        team.updated_at = Utc::now();
        Ok(team.clone())
    }

    async fn is_team_member(&self, id: i32, user_id: i32) -> AppResult<bool> {
        let state = self.state.read().await;
        let team = state
            .teams
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Team {} not found", id)))?;
        Ok(team.has_member(user_id))
    }

    async fn delete_team(&self, id: i32) -> AppResult<()> {
        let mut state = self.state.write().await;
        if state.teams.remove(&id).is_none() {
            return Err(AppError::NotFound(format!("Team {} not found", id)));
        }
        for equipment in state.equipment.values_mut() {
            if equipment.default_team == Some(id) {
                equipment.default_team = None;
            }
        }
        state.clear_request_refs(|request| {
            let touched = request.team == Some(id);
            if touched {
                request.team = None;
            }
            touched
        });
        Ok(())
    }
}

#[async_trait]
impl EquipmentStore for MemoryStore {
    async fn list_equipment(&self) -> AppResult<Vec<Equipment>> {
        let state = self.state.read().await;
        // Newest first, like the SQL store
        Ok(state.equipment.values().rev().cloned().collect())
    }

    async fn get_equipment(&self, id: i32) -> AppResult<Equipment> {
        self.state
            .read()
            .await
            .equipment
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    async fn create_equipment(&self, data: &CreateEquipment) -> AppResult<Equipment> {
        let mut state = self.state.write().await;
        if state.serial_taken(&data.serial_number, None) {
            return Err(AppError::DuplicateSerial(data.serial_number.clone()));
        }
        let now = Utc::now();
        let equipment = Equipment {
            id: state.allocate_id(),
            name: data.name.clone(),
            serial_number: data.serial_number.clone(),
            department_or_owner: data.department_or_owner.clone(),
            location: data.location.clone(),
            purchase_date: data.purchase_date,
            warranty_end: data.warranty_end,
            default_team: data.default_team,
            default_technician: data.default_technician,
            is_usable: data.is_usable.unwrap_or(true),
            created_at: now,
            updated_at: now,
        };
        state.check_equipment_refs(&equipment)?;
        state.equipment.insert(equipment.id, equipment.clone());
        Ok(equipment)
    }

    async fn update_equipment(&self, id: i32, data: &UpdateEquipment) -> AppResult<Equipment> {
        let mut state = self.state.write().await;
        let mut equipment = state
            .equipment
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))?;
        if data.is_usable == Some(true) {
            state.ensure_not_scrapped(id)?;
        }
        data.apply_to(&mut equipment);
        if state.serial_taken(&equipment.serial_number, Some(id)) {
            return Err(AppError::DuplicateSerial(equipment.serial_number));
        }
        state.check_equipment_refs(&equipment)?;
        equipment.updated_at = Utc::now();
        state.equipment.insert(id, equipment.clone());
        Ok(equipment)
    }

    async fn set_equipment_usability(&self, id: i32, usable: bool) -> AppResult<Equipment> {
        let mut state = self.state.write().await;
        if !state.equipment.contains_key(&id) {
            return Err(AppError::NotFound(format!("Equipment {} not found", id)));
        }
        if usable {
            state.ensure_not_scrapped(id)?;
        }
        let equipment = state
            .equipment
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))?;
        equipment.is_usable = usable;
        equipment.updated_at = Utc::now();
        Ok(equipment.clone())
    }

    async fn delete_equipment(&self, id: i32) -> AppResult<()> {
        let mut state = self.state.write().await;
        if state.equipment.remove(&id).is_none() {
            return Err(AppError::NotFound(format!("Equipment {} not found", id)));
        }
        state.requests.retain(|_, request| request.equipment != id);
        Ok(())
    }
}

#[async_trait]
impl RequestStore for MemoryStore {
    async fn list_requests(&self, filter: &RequestFilter) -> AppResult<Vec<MaintenanceRequest>> {
        let state = self.state.read().await;
        Ok(state
            .requests
            .values()
            .rev()
            .filter(|request| filter.matches(request))
            .cloned()
            .collect())
    }

    async fn get_request(&self, id: i32) -> AppResult<MaintenanceRequest> {
        self.state
            .read()
            .await
            .requests
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Maintenance request {} not found", id)))
    }

    async fn insert_request(&self, data: &NewRequest) -> AppResult<MaintenanceRequest> {
        let mut state = self.state.write().await;
        state.check_request_refs(data.equipment, data.team, data.technician, data.created_by)?;
        let now = Utc::now();
        let request = MaintenanceRequest {
            id: state.allocate_id(),
            subject: data.subject.clone(),
            equipment: data.equipment,
            request_type: data.request_type,
            team: data.team,
            technician: data.technician,
            scheduled_date: data.scheduled_date,
            duration: data.duration,
            status: RequestStatus::New,
            created_by: data.created_by,
            created_at: now,
            updated_at: now,
            version: 0,
        };
        state.requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn commit_request(&self, commit: &RequestCommit) -> AppResult<Option<MaintenanceRequest>> {
        let mut state = self.state.write().await;
        let id = commit.request.id;
        let stored_version = state
            .requests
            .get(&id)
            .map(|r| r.version)
            .ok_or_else(|| AppError::NotFound(format!("Maintenance request {} not found", id)))?;
        if stored_version != commit.request.version {
            return Ok(None);
        }
        let planned = &commit.request;
        state.check_request_refs(planned.equipment, planned.team, planned.technician, planned.created_by)?;

        let now = Utc::now();
        if let Some(equipment_id) = commit.retire_equipment {
            let equipment = state
                .equipment
                .get_mut(&equipment_id)
                .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", equipment_id)))?;
            equipment.is_usable = false;
            equipment.updated_at = now;
        }

        let mut request = commit.request.clone();
        request.version += 1;
        request.updated_at = now;
        state.requests.insert(id, request.clone());
        Ok(Some(request))
    }

    async fn delete_request(&self, id: i32) -> AppResult<()> {
        let mut state = self.state.write().await;
        if state.requests.remove(&id).is_none() {
            return Err(AppError::NotFound(format!("Maintenance request {} not found", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    async fn seed_request(store: &MemoryStore) -> MaintenanceRequest {
        let equipment = store
            .create_equipment(&CreateEquipment {
                name: "Press".to_string(),
                serial_number: "P-1".to_string(),
                department_or_owner: "Plant".to_string(),
                location: "Hall A".to_string(),
                purchase_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                warranty_end: None,
                default_team: None,
                default_technician: None,
                is_usable: None,
            })
            .await
            .unwrap();
        store
            .insert_request(&NewRequest {
                subject: "Leak".to_string(),
                equipment: equipment.id,
                request_type: Default::default(),
                team: None,
                technician: None,
                scheduled_date: Utc::now(),
                duration: None,
                created_by: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn stale_commit_is_rejected_without_side_effects() {
        let store = MemoryStore::new();
        let request = seed_request(&store).await;

        let mut first = request.clone();
        first.status = RequestStatus::InProgress;
        let committed = store
            .commit_request(&RequestCommit { request: first, retire_equipment: None })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(committed.version, request.version + 1);

        let mut stale = request.clone();
        stale.status = RequestStatus::Scrap;
        let outcome = store
            .commit_request(&RequestCommit {
                request: stale,
                retire_equipment: Some(request.equipment),
            })
            .await
            .unwrap();
        assert!(outcome.is_none());

        let equipment = store.get_equipment(request.equipment).await.unwrap();
        assert!(equipment.is_usable);
        let stored = store.get_request(request.id).await.unwrap();
        assert_eq!(stored.status, RequestStatus::InProgress);
    }

    #[tokio::test]
    async fn deleting_equipment_cascades_to_requests() {
        let store = MemoryStore::new();
        let request = seed_request(&store).await;

        store.delete_equipment(request.equipment).await.unwrap();

        assert!(matches!(
            store.get_request(request.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
