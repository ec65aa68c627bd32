//! Equipment API endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        equipment::{CreateEquipment, EquipmentDetails, UpdateEquipment, UsabilityUpdate},
        request::MaintenanceRequestDetails,
    },
};

/// List all equipment
#[utoipa::path(
    get,
    path = "/equipment",
    tag = "equipment",
    responses(
        (status = 200, description = "Equipment list", body = Vec<EquipmentDetails>)
    )
)]
pub async fn list_equipment(
    State(state): State<crate::AppState>,
) -> AppResult<Json<Vec<EquipmentDetails>>> {
    let equipment = state.services.equipment.list().await?;
    Ok(Json(equipment))
}

/// Get equipment by ID
#[utoipa::path(
    get,
    path = "/equipment/{id}",
    tag = "equipment",
    params(("id" = i32, Path, description = "Equipment ID")),
    responses(
        (status = 200, description = "Equipment details", body = EquipmentDetails),
        (status = 404, description = "Equipment not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_equipment(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<EquipmentDetails>> {
    let equipment = state.services.equipment.get_by_id(id).await?;
    Ok(Json(equipment))
}

/// Create equipment
#[utoipa::path(
    post,
    path = "/equipment",
    tag = "equipment",
    request_body = CreateEquipment,
    responses(
        (status = 201, description = "Equipment created", body = EquipmentDetails),
        (status = 409, description = "Serial number already exists", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_equipment(
    State(state): State<crate::AppState>,
    Json(data): Json<CreateEquipment>,
) -> AppResult<(StatusCode, Json<EquipmentDetails>)> {
    let equipment = state.services.equipment.create(&data).await?;
    Ok((StatusCode::CREATED, Json(equipment)))
}

/// Update equipment
#[utoipa::path(
    put,
    path = "/equipment/{id}",
    tag = "equipment",
    params(("id" = i32, Path, description = "Equipment ID")),
    request_body = UpdateEquipment,
    responses(
        (status = 200, description = "Equipment updated", body = EquipmentDetails),
        (status = 409, description = "Duplicate serial or scrapped equipment", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_equipment(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    Json(data): Json<UpdateEquipment>,
) -> AppResult<Json<EquipmentDetails>> {
    let equipment = state.services.equipment.update(id, &data).await?;
    Ok(Json(equipment))
}

/// Set the usability flag
#[utoipa::path(
    post,
    path = "/equipment/{id}/usability",
    tag = "equipment",
    params(("id" = i32, Path, description = "Equipment ID")),
    request_body = UsabilityUpdate,
    responses(
        (status = 200, description = "Usability updated", body = EquipmentDetails),
        (status = 409, description = "Equipment has a scrapped request", body = crate::error::ErrorResponse)
    )
)]
pub async fn set_usability(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    Json(data): Json<UsabilityUpdate>,
) -> AppResult<Json<EquipmentDetails>> {
    let equipment = state.services.equipment.set_usability(id, data.is_usable).await?;
    Ok(Json(equipment))
}

/// Delete equipment and its maintenance requests
#[utoipa::path(
    delete,
    path = "/equipment/{id}",
    tag = "equipment",
    params(("id" = i32, Path, description = "Equipment ID")),
    responses(
        (status = 204, description = "Equipment deleted")
    )
)]
pub async fn delete_equipment(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.equipment.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Maintenance requests of one piece of equipment
#[utoipa::path(
    get,
    path = "/equipment/{id}/requests",
    tag = "equipment",
    params(("id" = i32, Path, description = "Equipment ID")),
    responses(
        (status = 200, description = "Requests for the equipment", body = Vec<MaintenanceRequestDetails>),
        (status = 404, description = "Equipment not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_equipment_requests(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<MaintenanceRequestDetails>>> {
    let requests = state.services.requests.list_for_equipment(id).await?;
    Ok(Json(requests))
}
