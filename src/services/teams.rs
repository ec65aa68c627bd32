//! Team registry service

use std::sync::Arc;

use validator::Validate;

use super::names::Names;
use crate::{
    error::AppResult,
    models::team::{normalize_members, CreateTeam, Team, TeamDetails, UpdateTeam},
    repository::{Store, TeamStore, UserStore},
};

#[derive(Clone)]
pub struct TeamsService {
    store: Arc<dyn Store>,
}

impl TeamsService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> AppResult<Vec<TeamDetails>> {
        let teams = self.store.list_teams().await?;
        let names = Names::load_all(self.store.as_ref()).await?;
        Ok(teams.into_iter().map(|t| names.team(t)).collect())
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<TeamDetails> {
        let team = self.lookup(id).await?;
        self.details(team).await
    }

    /// Raw team record
    pub async fn lookup(&self, id: i32) -> AppResult<Team> {
        self.store.get_team(id).await
    }

    pub async fn is_member(&self, id: i32, user_id: i32) -> AppResult<bool> {
        self.store.is_team_member(id, user_id).await
    }

    pub async fn create(&self, data: &CreateTeam) -> AppResult<TeamDetails> {
        data.validate()?;
        let members = normalize_members(&data.member_ids);
        for &user_id in &members {
            self.store.get_user(user_id).await?;
        }
        let team = self.store.create_team(&data.name, &members).await?;
        tracing::info!("Team '{}' created (id={}, {} members)", team.name, team.id, team.member_ids.len());
        self.details(team).await
    }

    /// Rename and/or replace the member set.
    ///
    /// Either every change lands or none does.
    pub async fn update(&self, id: i32, data: &UpdateTeam) -> AppResult<TeamDetails> {
        data.validate()?;
        let before = self.lookup(id).await?;
        let wanted = data.member_ids.as_deref().map(normalize_members);
        if let Some(ref wanted) = wanted {
            for &user_id in wanted {
                self.store.get_user(user_id).await?;
            }
        }

        let team = self
            .store
            .update_team(id, data.name.as_deref(), wanted.as_deref())
            .await?;
        if team.member_ids != before.member_ids {
            tracing::info!(
                "Team {} members updated ({} -> {})",
                id,
                before.member_ids.len(),
                team.member_ids.len()
            );
        }
        self.details(team).await
    }

    /// Idempotent
    pub async fn add_member(&self, id: i32, user_id: i32) -> AppResult<TeamDetails> {
        self.store.get_user(user_id).await?;
        let team = self.store.add_team_member(id, user_id).await?;
        tracing::info!("User {} added to team {}", user_id, id);
        self.details(team).await
    }

    /// Idempotent; refused while the user is the technician of one of the team's requests
    pub async fn remove_member(&self, id: i32, user_id: i32) -> AppResult<TeamDetails> {
        let team = self.store.remove_team_member(id, user_id).await?;
        tracing::info!("User {} removed from team {}", user_id, id);
        self.details(team).await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.store.delete_team(id).await?;
        tracing::info!("Team {} deleted", id);
        Ok(())
    }

    async fn details(&self, team: Team) -> AppResult<TeamDetails> {
        let names = Names::collect(self.store.as_ref(), team.member_ids.clone(), None, None).await?;
        Ok(names.team(team))
    }
}
