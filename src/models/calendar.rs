//! Calendar event projected from a preventive request

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::request::{RequestStatus, RequestType};

/// Technician label used when a request has nobody assigned
pub const UNASSIGNED: &str = "Unassigned";

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CalendarEvent {
    /// Request ID
    pub id: i32,
    /// Request subject
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Equipment name
    pub equipment: String,
    /// Technician display name or "Unassigned"
    pub technician: String,
    pub status: RequestStatus,
    pub request_type: RequestType,
}
