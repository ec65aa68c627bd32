//! Maintenance team model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::user::UserSummary;

/// Stored team with its member user IDs
#[derive(Debug, Clone, PartialEq)]
pub struct Team {
    pub id: i32,
    pub name: String,
    /// Sorted, deduplicated
    pub member_ids: Vec<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Team {
    pub fn has_member(&self, user_id: i32) -> bool {
        self.member_ids.binary_search(&user_id).is_ok()
    }
}

/// Team as returned by the API
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TeamDetails {
    pub id: i32,
    pub name: String,
    pub members: Vec<UserSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create team request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateTeam {
    #[validate(length(min = 1, max = 200, message = "Team name must be 1 to 200 characters"))]
    pub name: String,
    /// Initial members
    #[serde(default)]
    pub member_ids: Vec<i32>,
}

/// Update team request
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateTeam {
    #[validate(length(min = 1, max = 200, message = "Team name must be 1 to 200 characters"))]
    pub name: Option<String>,
    /// Replaces the whole member set
    pub member_ids: Option<Vec<i32>>,
}

/// Add member request
#[derive(Debug, Deserialize, ToSchema)]
pub struct TeamMemberInput {
    /// User ID
    pub user: i32,
}

/// Sort and deduplicate a member list
pub fn normalize_members(members: &[i32]) -> Vec<i32> {
    let mut ids = members.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}
