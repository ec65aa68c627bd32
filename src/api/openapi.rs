//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{calendar, equipment, health, requests, teams, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "GearGuard API",
        version = "1.0.0",
        description = "Equipment maintenance tracking REST API"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Users
        users::list_users,
        users::get_user,
        users::create_user,
        users::delete_user,
        // Teams
        teams::list_teams,
        teams::get_team,
        teams::create_team,
        teams::update_team,
        teams::delete_team,
        teams::add_member,
        teams::remove_member,
        // Equipment
        equipment::list_equipment,
        equipment::get_equipment,
        equipment::create_equipment,
        equipment::update_equipment,
        equipment::set_usability,
        equipment::delete_equipment,
        equipment::list_equipment_requests,
        // Requests
        requests::list_requests,
        requests::get_request,
        requests::create_request,
        requests::update_request,
        requests::update_status,
        requests::assign_technician,
        requests::delete_request,
        // Calendar
        calendar::calendar_events,
    ),
    components(
        schemas(
            // Users
            crate::models::user::User,
            crate::models::user::UserSummary,
            crate::models::user::CreateUser,
            // Teams
            crate::models::team::TeamDetails,
            crate::models::team::CreateTeam,
            crate::models::team::UpdateTeam,
            crate::models::team::TeamMemberInput,
            // Equipment
            crate::models::equipment::EquipmentDetails,
            crate::models::equipment::CreateEquipment,
            crate::models::equipment::UpdateEquipment,
            crate::models::equipment::UsabilityUpdate,
            // Requests
            crate::models::request::RequestType,
            crate::models::request::RequestStatus,
            crate::models::request::MaintenanceRequestDetails,
            crate::models::request::CreateRequest,
            crate::models::request::UpdateRequest,
            crate::models::request::StatusUpdate,
            crate::models::request::TechnicianAssignment,
            // Calendar
            crate::models::calendar::CalendarEvent,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "users", description = "User directory"),
        (name = "teams", description = "Maintenance teams"),
        (name = "equipment", description = "Equipment registry"),
        (name = "requests", description = "Maintenance request lifecycle"),
        (name = "calendar", description = "Preventive maintenance calendar")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
