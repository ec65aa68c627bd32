//! Calendar projection of preventive maintenance

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use super::names::Names;
use crate::{
    error::AppResult,
    models::{
        calendar::{CalendarEvent, UNASSIGNED},
        request::{MaintenanceRequest, RequestFilter, RequestType},
    },
    repository::{RequestStore, Store},
};

#[derive(Clone)]
pub struct CalendarService {
    store: Arc<dyn Store>,
}

impl CalendarService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Events for every preventive request, recomputed on each call
    pub async fn events(&self) -> AppResult<Vec<CalendarEvent>> {
        let requests = self
            .store
            .list_requests(&RequestFilter {
                request_type: Some(RequestType::Preventive),
                ..Default::default()
            })
            .await?;
        let names = Names::load_all(self.store.as_ref()).await?;

        Ok(requests
            .iter()
            .map(|request| {
                project(
                    request,
                    names.equipment_name(request.equipment).unwrap_or_default(),
                    names.user_name(request.technician),
                )
            })
            .collect())
    }
}

/// Build the calendar event of one request.
///
/// A missing or zero duration is shown as one hour. An end past the
/// representable range is clamped.
pub fn project(request: &MaintenanceRequest, equipment: String, technician: Option<String>) -> CalendarEvent {
    let length = request
        .duration
        .filter(|d| *d > Duration::zero())
        .unwrap_or_else(|| Duration::hours(1));

    CalendarEvent {
        id: request.id,
        title: request.subject.clone(),
        start: request.scheduled_date,
        end: request
            .scheduled_date
            .checked_add_signed(length)
            .unwrap_or(DateTime::<Utc>::MAX_UTC),
        equipment,
        technician: technician.unwrap_or_else(|| UNASSIGNED.to_string()),
        status: request.status,
        request_type: request.request_type,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::request::RequestStatus;
    use chrono::TimeZone;

    fn request(duration: Option<Duration>) -> MaintenanceRequest {
        let start = Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap();
        MaintenanceRequest {
            id: 4,
            subject: "Quarterly lubrication".to_string(),
            equipment: 1,
            request_type: RequestType::Preventive,
            team: None,
            technician: None,
            scheduled_date: start,
            duration,
            status: RequestStatus::New,
            created_by: None,
            created_at: start,
            updated_at: start,
            version: 0,
        }
    }

    #[test]
    fn missing_duration_defaults_to_one_hour() {
        let event = project(&request(None), "Press".to_string(), None);
        assert_eq!(event.end - event.start, Duration::hours(1));
        assert_eq!(event.technician, "Unassigned");
        assert_eq!(event.title, "Quarterly lubrication");
    }

    #[test]
    fn zero_duration_defaults_to_one_hour() {
        let event = project(&request(Some(Duration::zero())), "Press".to_string(), None);
        assert_eq!(event.end - event.start, Duration::hours(1));
    }

    #[test]
    fn explicit_duration_sets_end() {
        let event = project(
            &request(Some(Duration::minutes(150))),
            "Press".to_string(),
            Some("Alice Martin".to_string()),
        );
        assert_eq!(event.end, Utc.with_ymd_and_hms(2025, 3, 10, 10, 30, 0).unwrap());
        assert_eq!(event.technician, "Alice Martin");
        assert_eq!(event.equipment, "Press");
    }

    #[test]
    fn end_past_the_calendar_range_is_clamped() {
        let mut late = request(Some(Duration::days(crate::models::duration::MAX_DAYS)));
        late.scheduled_date = DateTime::<Utc>::MAX_UTC - Duration::days(1);
        let event = project(&late, "Press".to_string(), None);
        assert_eq!(event.end, DateTime::<Utc>::MAX_UTC);
    }
}
