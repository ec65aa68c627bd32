//! Display-name resolution for API responses

use std::collections::HashMap;

use crate::{
    error::{AppError, AppResult},
    models::{
        equipment::{Equipment, EquipmentDetails},
        request::{MaintenanceRequest, MaintenanceRequestDetails},
        team::{Team, TeamDetails},
        user::{User, UserSummary},
    },
    repository::{EquipmentStore, Store, TeamStore, UserStore},
};

/// Snapshot of the names referenced by a set of records
#[derive(Default)]
pub struct Names {
    users: HashMap<i32, User>,
    teams: HashMap<i32, String>,
    equipment: HashMap<i32, String>,
}

/// Treat a dangling reference as "no name" instead of an error
fn found<T>(result: AppResult<T>) -> AppResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(AppError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

impl Names {
    /// Load every user, team and equipment name (used for list endpoints)
    pub async fn load_all(store: &dyn Store) -> AppResult<Self> {
        let users = store.list_users().await?;
        let teams = store.list_teams().await?;
        let equipment = store.list_equipment().await?;

        Ok(Self {
            users: users.into_iter().map(|u| (u.id, u)).collect(),
            teams: teams.into_iter().map(|t| (t.id, t.name)).collect(),
            equipment: equipment.into_iter().map(|e| (e.id, e.name)).collect(),
        })
    }

    /// Fetch only the given references
    pub async fn collect(
        store: &dyn Store,
        users: impl IntoIterator<Item = i32>,
        teams: impl IntoIterator<Item = i32>,
        equipment: impl IntoIterator<Item = i32>,
    ) -> AppResult<Self> {
        let mut names = Self::default();
        for id in users {
            if let Some(user) = found(store.get_user(id).await)? {
                names.users.insert(id, user);
            }
        }
        for id in teams {
            if let Some(team) = found(store.get_team(id).await)? {
                names.teams.insert(id, team.name);
            }
        }
        for id in equipment {
            if let Some(item) = found(store.get_equipment(id).await)? {
                names.equipment.insert(id, item.name);
            }
        }
        Ok(names)
    }

    /// References needed to describe one request
    pub async fn for_request(store: &dyn Store, request: &MaintenanceRequest) -> AppResult<Self> {
        Self::collect(
            store,
            request.technician.into_iter().chain(request.created_by),
            request.team,
            Some(request.equipment),
        )
        .await
    }

    pub fn user_name(&self, id: Option<i32>) -> Option<String> {
        id.and_then(|id| self.users.get(&id)).map(User::display_name)
    }

    pub fn team_name(&self, id: Option<i32>) -> Option<String> {
        id.and_then(|id| self.teams.get(&id)).cloned()
    }

    pub fn equipment_name(&self, id: i32) -> Option<String> {
        self.equipment.get(&id).cloned()
    }

    pub fn request(&self, request: MaintenanceRequest) -> MaintenanceRequestDetails {
        MaintenanceRequestDetails {
            equipment_name: self.equipment_name(request.equipment),
            team_name: self.team_name(request.team),
            technician_name: self.user_name(request.technician),
            created_by_name: self.user_name(request.created_by),
            id: request.id,
            subject: request.subject,
            equipment: request.equipment,
            request_type: request.request_type,
            team: request.team,
            technician: request.technician,
            scheduled_date: request.scheduled_date,
            duration: request.duration,
            status: request.status,
            created_by: request.created_by,
            created_at: request.created_at,
            updated_at: request.updated_at,
        }
    }

    pub fn equipment(&self, equipment: Equipment) -> EquipmentDetails {
        let team_name = self.team_name(equipment.default_team);
        let technician_name = self.user_name(equipment.default_technician);
        EquipmentDetails::new(equipment, team_name, technician_name)
    }

    pub fn team(&self, team: Team) -> TeamDetails {
        TeamDetails {
            members: team
                .member_ids
                .iter()
                .filter_map(|id| self.users.get(id))
                .map(UserSummary::from)
                .collect(),
            id: team.id,
            name: team.name,
            created_at: team.created_at,
            updated_at: team.updated_at,
        }
    }
}
