//! Maintenance request API endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::request::{
        CreateRequest, MaintenanceRequestDetails, StatusUpdate, TechnicianAssignment, UpdateRequest,
    },
};

/// List maintenance requests, newest first
#[utoipa::path(
    get,
    path = "/requests",
    tag = "requests",
    responses(
        (status = 200, description = "Request list", body = Vec<MaintenanceRequestDetails>)
    )
)]
pub async fn list_requests(
    State(state): State<crate::AppState>,
) -> AppResult<Json<Vec<MaintenanceRequestDetails>>> {
    let requests = state.services.requests.list().await?;
    Ok(Json(requests))
}

/// Get maintenance request by ID
#[utoipa::path(
    get,
    path = "/requests/{id}",
    tag = "requests",
    params(("id" = i32, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Request details", body = MaintenanceRequestDetails),
        (status = 404, description = "Request not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_request(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<MaintenanceRequestDetails>> {
    let request = state.services.requests.get(id).await?;
    Ok(Json(request))
}

/// Create a maintenance request
///
/// The team defaults to the equipment's default team; the status always starts at `NEW`.
#[utoipa::path(
    post,
    path = "/requests",
    tag = "requests",
    request_body = CreateRequest,
    responses(
        (status = 201, description = "Request created", body = MaintenanceRequestDetails),
        (status = 400, description = "Technician not in team or invalid input", body = crate::error::ErrorResponse),
        (status = 404, description = "Referenced record not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_request(
    State(state): State<crate::AppState>,
    Json(data): Json<CreateRequest>,
) -> AppResult<(StatusCode, Json<MaintenanceRequestDetails>)> {
    let request = state.services.requests.create(&data).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// General update of a maintenance request
#[utoipa::path(
    put,
    path = "/requests/{id}",
    tag = "requests",
    params(("id" = i32, Path, description = "Request ID")),
    request_body = UpdateRequest,
    responses(
        (status = 200, description = "Request updated", body = MaintenanceRequestDetails),
        (status = 400, description = "Invalid transition or technician not in team", body = crate::error::ErrorResponse),
        (status = 409, description = "Concurrent modification", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_request(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    Json(data): Json<UpdateRequest>,
) -> AppResult<Json<MaintenanceRequestDetails>> {
    let request = state.services.requests.update(id, &data).await?;
    Ok(Json(request))
}

/// Move a request to another status
#[utoipa::path(
    post,
    path = "/requests/{id}/status",
    tag = "requests",
    params(("id" = i32, Path, description = "Request ID")),
    request_body = StatusUpdate,
    responses(
        (status = 200, description = "Status updated", body = MaintenanceRequestDetails),
        (status = 400, description = "Transition not allowed", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_status(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    Json(data): Json<StatusUpdate>,
) -> AppResult<Json<MaintenanceRequestDetails>> {
    let request = state.services.requests.update_status(id, data.status).await?;
    Ok(Json(request))
}

/// Assign a technician to a request
#[utoipa::path(
    post,
    path = "/requests/{id}/assign",
    tag = "requests",
    params(("id" = i32, Path, description = "Request ID")),
    request_body = TechnicianAssignment,
    responses(
        (status = 200, description = "Technician assigned", body = MaintenanceRequestDetails),
        (status = 400, description = "Technician not in team", body = crate::error::ErrorResponse)
    )
)]
pub async fn assign_technician(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    Json(data): Json<TechnicianAssignment>,
) -> AppResult<Json<MaintenanceRequestDetails>> {
    let request = state.services.requests.assign_technician(id, data.technician).await?;
    Ok(Json(request))
}

/// Delete a maintenance request
#[utoipa::path(
    delete,
    path = "/requests/{id}",
    tag = "requests",
    params(("id" = i32, Path, description = "Request ID")),
    responses(
        (status = 204, description = "Request deleted")
    )
)]
pub async fn delete_request(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.requests.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
