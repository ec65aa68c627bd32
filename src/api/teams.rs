//! Maintenance team API endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::team::{CreateTeam, TeamDetails, TeamMemberInput, UpdateTeam},
};

/// List teams with their members
#[utoipa::path(
    get,
    path = "/teams",
    tag = "teams",
    responses(
        (status = 200, description = "Team list", body = Vec<TeamDetails>)
    )
)]
pub async fn list_teams(State(state): State<crate::AppState>) -> AppResult<Json<Vec<TeamDetails>>> {
    let teams = state.services.teams.list().await?;
    Ok(Json(teams))
}

/// Get team by ID
#[utoipa::path(
    get,
    path = "/teams/{id}",
    tag = "teams",
    params(("id" = i32, Path, description = "Team ID")),
    responses(
        (status = 200, description = "Team details", body = TeamDetails),
        (status = 404, description = "Team not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_team(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<TeamDetails>> {
    let team = state.services.teams.get_by_id(id).await?;
    Ok(Json(team))
}

/// Create team
#[utoipa::path(
    post,
    path = "/teams",
    tag = "teams",
    request_body = CreateTeam,
    responses(
        (status = 201, description = "Team created", body = TeamDetails),
        (status = 409, description = "Team name already exists", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_team(
    State(state): State<crate::AppState>,
    Json(data): Json<CreateTeam>,
) -> AppResult<(StatusCode, Json<TeamDetails>)> {
    let team = state.services.teams.create(&data).await?;
    Ok((StatusCode::CREATED, Json(team)))
}

/// Rename a team or replace its member set
#[utoipa::path(
    put,
    path = "/teams/{id}",
    tag = "teams",
    params(("id" = i32, Path, description = "Team ID")),
    request_body = UpdateTeam,
    responses(
        (status = 200, description = "Team updated", body = TeamDetails),
        (status = 409, description = "Duplicate name or member still assigned", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_team(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    Json(data): Json<UpdateTeam>,
) -> AppResult<Json<TeamDetails>> {
    let team = state.services.teams.update(id, &data).await?;
    Ok(Json(team))
}

/// Delete team
#[utoipa::path(
    delete,
    path = "/teams/{id}",
    tag = "teams",
    params(("id" = i32, Path, description = "Team ID")),
    responses(
        (status = 204, description = "Team deleted")
    )
)]
pub async fn delete_team(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.teams.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Add a member to a team
#[utoipa::path(
    post,
    path = "/teams/{id}/members",
    tag = "teams",
    params(("id" = i32, Path, description = "Team ID")),
    request_body = TeamMemberInput,
    responses(
        (status = 200, description = "Member added", body = TeamDetails)
    )
)]
pub async fn add_member(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    Json(data): Json<TeamMemberInput>,
) -> AppResult<Json<TeamDetails>> {
    let team = state.services.teams.add_member(id, data.user).await?;
    Ok(Json(team))
}

/// Remove a member from a team
#[utoipa::path(
    delete,
    path = "/teams/{id}/members/{user_id}",
    tag = "teams",
    params(
        ("id" = i32, Path, description = "Team ID"),
        ("user_id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Member removed", body = TeamDetails),
        (status = 409, description = "Member is assigned to team requests", body = crate::error::ErrorResponse)
    )
)]
pub async fn remove_member(
    State(state): State<crate::AppState>,
    Path((id, user_id)): Path<(i32, i32)>,
) -> AppResult<Json<TeamDetails>> {
    let team = state.services.teams.remove_member(id, user_id).await?;
    Ok(Json(team))
}
