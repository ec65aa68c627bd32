//! Calendar API endpoint

use axum::{extract::State, Json};

use crate::{error::AppResult, models::calendar::CalendarEvent};

/// Preventive maintenance as calendar events
#[utoipa::path(
    get,
    path = "/calendar",
    tag = "calendar",
    responses(
        (status = 200, description = "Calendar events", body = Vec<CalendarEvent>)
    )
)]
pub async fn calendar_events(State(state): State<crate::AppState>) -> AppResult<Json<Vec<CalendarEvent>>> {
    let events = state.services.calendar.events().await?;
    Ok(Json(events))
}
