//! Data models for GearGuard

pub mod calendar;
pub mod duration;
pub mod equipment;
pub mod request;
pub mod team;
pub mod user;

// Re-export commonly used types
pub use calendar::CalendarEvent;
pub use equipment::{Equipment, EquipmentDetails};
pub use request::{MaintenanceRequest, MaintenanceRequestDetails, RequestStatus, RequestType};
pub use team::{Team, TeamDetails};
pub use user::{User, UserSummary};
