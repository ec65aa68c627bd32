//! Error types for GearGuard server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::models::request::RequestStatus;

/// Stable numeric error codes exposed to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    DbFailure = 2,
    NotFound = 3,
    BadValue = 4,
    DuplicateName = 5,
    DuplicateSerial = 6,
    InvalidTransition = 7,
    TechnicianNotInTeam = 8,
    Conflict = 9,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("A team named '{0}' already exists")]
    DuplicateName(String),

    #[error("Equipment with serial number '{0}' already exists")]
    DuplicateSerial(String),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: RequestStatus, to: RequestStatus },

    #[error("Technician {technician} is not a member of {}", team_label(.team))]
    TechnicianNotInTeam { technician: i32, team: Option<i32> },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

fn team_label(team: &Option<i32>) -> String {
    match team {
        Some(id) => format!("team {}", id),
        None => "any team (no team assigned)".to_string(),
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
    /// Field the error is attributed to, when there is one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Offending values
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<Value>,
}

impl AppError {
    fn parts(&self) -> (StatusCode, ErrorCode, Option<&'static str>, Option<Value>) {
        match self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NotFound, None, None),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, ErrorCode::BadValue, None, None),
            AppError::DuplicateName(name) => (
                StatusCode::CONFLICT,
                ErrorCode::DuplicateName,
                Some("name"),
                Some(json!({ "name": name })),
            ),
            AppError::DuplicateSerial(serial) => (
                StatusCode::CONFLICT,
                ErrorCode::DuplicateSerial,
                Some("serial_number"),
                Some(json!({ "serial_number": serial })),
            ),
            AppError::InvalidTransition { from, to } => (
                StatusCode::BAD_REQUEST,
                ErrorCode::InvalidTransition,
                Some("status"),
                Some(json!({
                    "from": from,
                    "to": to,
                    "allowed": from.allowed_transitions(),
                })),
            ),
            AppError::TechnicianNotInTeam { technician, team } => (
                StatusCode::BAD_REQUEST,
                ErrorCode::TechnicianNotInTeam,
                Some("technician"),
                Some(json!({ "technician": technician, "team": team })),
            ),
            AppError::Conflict(_) => (StatusCode::CONFLICT, ErrorCode::Conflict, None, None),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::DbFailure, None, None),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::Failure, None, None),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, field, details) = self.parts();

        let message = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "Database error".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            AppError::NotFound(msg)
            | AppError::Validation(msg)
            | AppError::Conflict(msg) => msg.clone(),
            other => other.to_string(),
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
            field: field.map(str::to_string),
            details,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_transition_is_field_attributed() {
        let err = AppError::InvalidTransition {
            from: RequestStatus::New,
            to: RequestStatus::Scrap,
        };
        let (status, code, field, details) = err.parts();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code, ErrorCode::InvalidTransition);
        assert_eq!(field, Some("status"));
        assert_eq!(
            details,
            Some(json!({ "from": "NEW", "to": "SCRAP", "allowed": ["IN_PROGRESS"] }))
        );
        assert_eq!(err.to_string(), "Invalid status transition from NEW to SCRAP");
    }

    #[test]
    fn technician_error_names_both_sides() {
        let err = AppError::TechnicianNotInTeam { technician: 7, team: Some(2) };
        let (status, _, field, details) = err.parts();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(field, Some("technician"));
        assert_eq!(details, Some(json!({ "technician": 7, "team": 2 })));
        assert_eq!(err.to_string(), "Technician 7 is not a member of team 2");
    }
}
