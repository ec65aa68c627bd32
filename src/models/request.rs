//! Maintenance request model and its status lifecycle

use std::{fmt, str::FromStr};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::duration;
use crate::error::{AppError, AppResult};

// ---------------------------------------------------------------------------
// RequestType
// ---------------------------------------------------------------------------

/// Kind of maintenance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestType {
    /// Reactive repair
    #[default]
    Corrective,
    /// Scheduled upkeep
    Preventive,
}

impl RequestType {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestType::Corrective => "CORRECTIVE",
            RequestType::Preventive => "PREVENTIVE",
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CORRECTIVE" => Ok(RequestType::Corrective),
            "PREVENTIVE" => Ok(RequestType::Preventive),
            other => Err(AppError::Internal(format!("Unknown request type '{}'", other))),
        }
    }
}

// ---------------------------------------------------------------------------
// RequestStatus
// ---------------------------------------------------------------------------

/// Lifecycle stage of a maintenance request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    New,
    InProgress,
    Repaired,
    /// Terminal: the equipment is written off
    Scrap,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 4] = [
        RequestStatus::New,
        RequestStatus::InProgress,
        RequestStatus::Repaired,
        RequestStatus::Scrap,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::New => "NEW",
            RequestStatus::InProgress => "IN_PROGRESS",
            RequestStatus::Repaired => "REPAIRED",
            RequestStatus::Scrap => "SCRAP",
        }
    }

    /// Statuses reachable in one step from `self`.
    ///
    /// This table is the only definition of the workflow; every mutation path
    /// goes through [`RequestStatus::transition_to`].
    pub fn allowed_transitions(self) -> &'static [RequestStatus] {
        match self {
            RequestStatus::New => &[RequestStatus::InProgress],
            RequestStatus::InProgress => &[RequestStatus::Repaired, RequestStatus::Scrap],
            RequestStatus::Repaired => &[RequestStatus::Scrap],
            RequestStatus::Scrap => &[],
        }
    }

    pub fn can_transition_to(self, target: RequestStatus) -> bool {
        self.allowed_transitions().contains(&target)
    }

    /// Validate a move to `target`. Re-submitting the current status is accepted.
    pub fn transition_to(self, target: RequestStatus) -> AppResult<RequestStatus> {
        if self == target || self.can_transition_to(target) {
            Ok(target)
        } else {
            Err(AppError::InvalidTransition { from: self, to: target })
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RequestStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| AppError::Internal(format!("Unknown request status '{}'", s)))
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Stored maintenance request
#[derive(Debug, Clone, PartialEq)]
pub struct MaintenanceRequest {
    pub id: i32,
    pub subject: String,
    pub equipment: i32,
    pub request_type: RequestType,
    pub team: Option<i32>,
    pub technician: Option<i32>,
    pub scheduled_date: DateTime<Utc>,
    pub duration: Option<Duration>,
    pub status: RequestStatus,
    pub created_by: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency counter, bumped on every committed write
    pub version: i32,
}

/// Fully resolved request ready for insertion (status is always `NEW`)
#[derive(Debug, Clone)]
pub struct NewRequest {
    pub subject: String,
    pub equipment: i32,
    pub request_type: RequestType,
    pub team: Option<i32>,
    pub technician: Option<i32>,
    pub scheduled_date: DateTime<Utc>,
    pub duration: Option<Duration>,
    pub created_by: Option<i32>,
}

/// Versioned write of a request, with the scrap side effect
#[derive(Debug, Clone)]
pub struct RequestCommit {
    /// New state of the request; `version` is the one read before validation
    pub request: MaintenanceRequest,
    /// Equipment to flag unusable in the same transaction
    pub retire_equipment: Option<i32>,
}

/// Store-side filter on requests
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestFilter {
    pub equipment: Option<i32>,
    pub request_type: Option<RequestType>,
}

impl RequestFilter {
    pub fn matches(&self, request: &MaintenanceRequest) -> bool {
        self.equipment.map_or(true, |id| request.equipment == id)
            && self.request_type.map_or(true, |kind| request.request_type == kind)
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Maintenance request as returned by the API
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MaintenanceRequestDetails {
    pub id: i32,
    pub subject: String,
    pub equipment: i32,
    pub equipment_name: Option<String>,
    pub request_type: RequestType,
    pub team: Option<i32>,
    pub team_name: Option<String>,
    pub technician: Option<i32>,
    pub technician_name: Option<String>,
    pub scheduled_date: DateTime<Utc>,
    /// Expected duration (`[D ]HH:MM:SS`)
    #[serde(with = "duration::option")]
    #[schema(value_type = Option<String>, example = "02:00:00")]
    pub duration: Option<Duration>,
    pub status: RequestStatus,
    pub created_by: Option<i32>,
    pub created_by_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create maintenance request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateRequest {
    #[validate(length(min = 1, max = 300, message = "Subject must be 1 to 300 characters"))]
    pub subject: String,
    pub equipment: i32,
    pub request_type: Option<RequestType>,
    /// Defaults to the equipment's default team
    pub team: Option<i32>,
    pub technician: Option<i32>,
    pub scheduled_date: DateTime<Utc>,
    #[serde(default, with = "duration::option")]
    #[schema(value_type = Option<String>, example = "02:00:00")]
    pub duration: Option<Duration>,
    pub created_by: Option<i32>,
}

/// Update maintenance request (every field optional; `null` clears nullable ones)
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateRequest {
    #[validate(length(min = 1, max = 300, message = "Subject must be 1 to 300 characters"))]
    pub subject: Option<String>,
    pub equipment: Option<i32>,
    pub request_type: Option<RequestType>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<i32>)]
    pub team: Option<Option<i32>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<i32>)]
    pub technician: Option<Option<i32>>,
    pub scheduled_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "duration::double_option::deserialize")]
    #[schema(value_type = Option<String>, example = "02:00:00")]
    pub duration: Option<Option<Duration>>,
    pub status: Option<RequestStatus>,
}

/// Status transition request
#[derive(Debug, Deserialize, ToSchema)]
pub struct StatusUpdate {
    pub status: RequestStatus,
}

/// Technician assignment request
#[derive(Debug, Deserialize, ToSchema)]
pub struct TechnicianAssignment {
    /// User ID of the technician
    pub technician: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use RequestStatus::*;

    #[test]
    fn transition_table_matches_workflow() {
        assert_eq!(New.allowed_transitions(), &[InProgress]);
        assert_eq!(InProgress.allowed_transitions(), &[Repaired, Scrap]);
        assert_eq!(Repaired.allowed_transitions(), &[Scrap]);
        assert!(Scrap.allowed_transitions().is_empty());
    }

    #[test]
    fn every_pair_outside_table_is_rejected() {
        for from in RequestStatus::ALL {
            for to in RequestStatus::ALL {
                let result = from.transition_to(to);
                if from == to || from.can_transition_to(to) {
                    assert_eq!(result.ok(), Some(to), "{} -> {}", from, to);
                } else {
                    match result {
                        Err(AppError::InvalidTransition { from: f, to: t }) => {
                            assert_eq!((f, t), (from, to));
                        }
                        other => panic!("{} -> {} should be invalid, got {:?}", from, to, other),
                    }
                }
            }
        }
    }

    #[test]
    fn wire_names_are_preserved() {
        assert_eq!(serde_json::to_value(InProgress).unwrap(), "IN_PROGRESS");
        assert_eq!(serde_json::to_value(RequestType::Preventive).unwrap(), "PREVENTIVE");
        let status: RequestStatus = serde_json::from_str("\"SCRAP\"").unwrap();
        assert_eq!(status, Scrap);
        assert_eq!("REPAIRED".parse::<RequestStatus>().unwrap(), Repaired);
        assert!("DONE".parse::<RequestStatus>().is_err());
    }

    #[test]
    fn update_distinguishes_absent_from_null() {
        let patch: UpdateRequest = serde_json::from_str(r#"{"technician": null}"#).unwrap();
        assert_eq!(patch.technician, Some(None));
        assert_eq!(patch.team, None);

        let patch: UpdateRequest = serde_json::from_str(r#"{"duration": "01:30:00"}"#).unwrap();
        assert_eq!(patch.duration, Some(Some(Duration::minutes(90))));

        let patch: UpdateRequest = serde_json::from_str(r#"{"duration": null}"#).unwrap();
        assert_eq!(patch.duration, Some(None));
    }
}
