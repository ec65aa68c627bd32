//! Business logic services

pub mod calendar;
pub mod equipment;
pub mod names;
pub mod requests;
pub mod teams;
pub mod users;

use std::sync::Arc;

use crate::{config::LifecycleConfig, repository::Store};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn Store>,
    pub users: users::UsersService,
    pub teams: teams::TeamsService,
    pub equipment: equipment::EquipmentService,
    pub requests: requests::RequestsService,
    pub calendar: calendar::CalendarService,
}

impl Services {
    /// Create all services on top of the given store
    pub fn new(store: Arc<dyn Store>, lifecycle: &LifecycleConfig) -> Self {
        Self {
            users: users::UsersService::new(store.clone()),
            teams: teams::TeamsService::new(store.clone()),
            equipment: equipment::EquipmentService::new(store.clone()),
            requests: requests::RequestsService::new(store.clone(), lifecycle),
            calendar: calendar::CalendarService::new(store.clone()),
            store,
        }
    }
}
