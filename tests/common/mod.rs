//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use gearguard_server::{
    config::{AppConfig, LifecycleConfig},
    models::{
        equipment::{CreateEquipment, EquipmentDetails},
        request::{CreateRequest, MaintenanceRequestDetails, RequestType},
        team::{CreateTeam, TeamDetails},
        user::{CreateUser, User},
    },
    repository::memory::MemoryStore,
    services::Services,
    AppState,
};

pub fn services() -> Services {
    Services::new(Arc::new(MemoryStore::new()), &LifecycleConfig::default())
}

pub fn state(services: Services) -> AppState {
    AppState {
        config: Arc::new(AppConfig::default()),
        services: Arc::new(services),
    }
}

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap()
}

pub async fn user(services: &Services, username: &str, first: &str, last: &str) -> User {
    services
        .users
        .create(&CreateUser {
            username: username.to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: None,
        })
        .await
        .unwrap()
}

pub async fn team(services: &Services, name: &str, members: &[i32]) -> TeamDetails {
    services
        .teams
        .create(&CreateTeam {
            name: name.to_string(),
            member_ids: members.to_vec(),
        })
        .await
        .unwrap()
}

pub fn equipment_input(name: &str, serial: &str, default_team: Option<i32>) -> CreateEquipment {
    CreateEquipment {
        name: name.to_string(),
        serial_number: serial.to_string(),
        department_or_owner: "Production".to_string(),
        location: "Hall A".to_string(),
        purchase_date: NaiveDate::from_ymd_opt(2022, 1, 15).unwrap(),
        warranty_end: None,
        default_team,
        default_technician: None,
        is_usable: None,
    }
}

pub async fn equipment(services: &Services, name: &str, serial: &str, default_team: Option<i32>) -> EquipmentDetails {
    services
        .equipment
        .create(&equipment_input(name, serial, default_team))
        .await
        .unwrap()
}

pub fn request_input(subject: &str, equipment: i32) -> CreateRequest {
    CreateRequest {
        subject: subject.to_string(),
        equipment,
        request_type: None,
        team: None,
        technician: None,
        scheduled_date: start(),
        duration: None,
        created_by: None,
    }
}

pub async fn request(services: &Services, subject: &str, equipment: i32, kind: RequestType) -> MaintenanceRequestDetails {
    services
        .requests
        .create(&CreateRequest {
            request_type: Some(kind),
            ..request_input(subject, equipment)
        })
        .await
        .unwrap()
}

/// Team T with member A, outsider B, equipment E defaulting to T
pub struct Workshop {
    pub services: Services,
    pub team: i32,
    pub member: i32,
    pub outsider: i32,
    pub equipment: i32,
}

pub async fn workshop() -> Workshop {
    let services = services();
    let member = user(&services, "alice", "Alice", "Martin").await;
    let outsider = user(&services, "bob", "Bob", "Durand").await;
    let team = team(&services, "Mechanics", &[member.id]).await;
    let equipment = equipment(&services, "Hydraulic press", "HP-001", Some(team.id)).await;
    Workshop {
        services,
        team: team.id,
        member: member.id,
        outsider: outsider.id,
        equipment: equipment.id,
    }
}
