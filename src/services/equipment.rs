//! Equipment registry service

use std::sync::Arc;

use validator::Validate;

use super::names::Names;
use crate::{
    error::AppResult,
    models::equipment::{CreateEquipment, Equipment, EquipmentDetails, UpdateEquipment},
    repository::{EquipmentStore, Store, TeamStore, UserStore},
};

#[derive(Clone)]
pub struct EquipmentService {
    store: Arc<dyn Store>,
}

impl EquipmentService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> AppResult<Vec<EquipmentDetails>> {
        let equipment = self.store.list_equipment().await?;
        let names = Names::load_all(self.store.as_ref()).await?;
        Ok(equipment.into_iter().map(|e| names.equipment(e)).collect())
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<EquipmentDetails> {
        let equipment = self.store.get_equipment(id).await?;
        self.details(equipment).await
    }

    pub async fn create(&self, data: &CreateEquipment) -> AppResult<EquipmentDetails> {
        data.validate()?;
        self.check_defaults(data.default_team, data.default_technician).await?;
        let equipment = self.store.create_equipment(data).await?;
        tracing::info!("Equipment '{}' created (id={}, serial={})", equipment.name, equipment.id, equipment.serial_number);
        self.details(equipment).await
    }

    pub async fn update(&self, id: i32, data: &UpdateEquipment) -> AppResult<EquipmentDetails> {
        data.validate()?;
        self.check_defaults(data.default_team.flatten(), data.default_technician.flatten())
            .await?;
        let equipment = self.store.update_equipment(id, data).await?;
        self.details(equipment).await
    }

    /// Direct usability edit. Equipment with a scrapped request cannot be made usable again.
    pub async fn set_usability(&self, id: i32, usable: bool) -> AppResult<EquipmentDetails> {
        let equipment = self.store.set_equipment_usability(id, usable).await?;
        tracing::info!("Equipment {} usability set to {}", id, usable);
        self.details(equipment).await
    }

    /// Delete equipment together with its requests
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.store.delete_equipment(id).await?;
        tracing::info!("Equipment {} deleted", id);
        Ok(())
    }

    async fn check_defaults(&self, team: Option<i32>, technician: Option<i32>) -> AppResult<()> {
        if let Some(team_id) = team {
            self.store.get_team(team_id).await?;
        }
        if let Some(user_id) = technician {
            self.store.get_user(user_id).await?;
        }
        Ok(())
    }

    async fn details(&self, equipment: Equipment) -> AppResult<EquipmentDetails> {
        let names = Names::collect(
            self.store.as_ref(),
            equipment.default_technician,
            equipment.default_team,
            None,
        )
        .await?;
        Ok(names.equipment(equipment))
    }
}
