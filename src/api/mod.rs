//! API handlers for GearGuard REST endpoints

pub mod calendar;
pub mod equipment;
pub mod health;
pub mod openapi;
pub mod requests;
pub mod teams;
pub mod users;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::AppState;

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Users
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/:id", get(users::get_user).delete(users::delete_user))
        // Teams
        .route("/teams", get(teams::list_teams).post(teams::create_team))
        .route(
            "/teams/:id",
            get(teams::get_team).put(teams::update_team).delete(teams::delete_team),
        )
        .route("/teams/:id/members", post(teams::add_member))
        .route("/teams/:id/members/:user_id", axum::routing::delete(teams::remove_member))
        // Equipment
        .route("/equipment", get(equipment::list_equipment).post(equipment::create_equipment))
        .route(
            "/equipment/:id",
            get(equipment::get_equipment)
                .put(equipment::update_equipment)
                .delete(equipment::delete_equipment),
        )
        .route("/equipment/:id/requests", get(equipment::list_equipment_requests))
        .route("/equipment/:id/usability", post(equipment::set_usability))
        // Maintenance requests
        .route("/requests", get(requests::list_requests).post(requests::create_request))
        .route(
            "/requests/:id",
            get(requests::get_request)
                .put(requests::update_request)
                .delete(requests::delete_request),
        )
        .route("/requests/:id/status", post(requests::update_status))
        .route("/requests/:id/assign", post(requests::assign_technician))
        // Calendar
        .route("/calendar", get(calendar::calendar_events))
        .with_state(state);

    // OpenAPI documentation
    let openapi = openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
