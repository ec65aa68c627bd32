//! Equipment model

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Equipment record
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Equipment {
    pub id: i32,
    pub name: String,
    pub serial_number: String,
    pub department_or_owner: String,
    pub location: String,
    pub purchase_date: NaiveDate,
    pub warranty_end: Option<NaiveDate>,
    #[sqlx(rename = "default_team_id")]
    pub default_team: Option<i32>,
    #[sqlx(rename = "default_technician_id")]
    pub default_technician: Option<i32>,
    /// False once a request on this equipment has been scrapped
    pub is_usable: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Equipment as returned by the API
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EquipmentDetails {
    pub id: i32,
    pub name: String,
    pub serial_number: String,
    pub department_or_owner: String,
    pub location: String,
    pub purchase_date: NaiveDate,
    pub warranty_end: Option<NaiveDate>,
    pub default_team: Option<i32>,
    pub default_team_name: Option<String>,
    pub default_technician: Option<i32>,
    pub default_technician_name: Option<String>,
    pub is_usable: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EquipmentDetails {
    pub fn new(equipment: Equipment, team_name: Option<String>, technician_name: Option<String>) -> Self {
        Self {
            id: equipment.id,
            name: equipment.name,
            serial_number: equipment.serial_number,
            department_or_owner: equipment.department_or_owner,
            location: equipment.location,
            purchase_date: equipment.purchase_date,
            warranty_end: equipment.warranty_end,
            default_team: equipment.default_team,
            default_team_name: team_name,
            default_technician: equipment.default_technician,
            default_technician_name: technician_name,
            is_usable: equipment.is_usable,
            created_at: equipment.created_at,
            updated_at: equipment.updated_at,
        }
    }
}

/// Create equipment request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateEquipment {
    #[validate(length(min = 1, max = 200, message = "Name must be 1 to 200 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 100, message = "Serial number must be 1 to 100 characters"))]
    pub serial_number: String,
    #[validate(length(min = 1, max = 200))]
    pub department_or_owner: String,
    #[validate(length(min = 1, max = 200))]
    pub location: String,
    pub purchase_date: NaiveDate,
    pub warranty_end: Option<NaiveDate>,
    pub default_team: Option<i32>,
    pub default_technician: Option<i32>,
    pub is_usable: Option<bool>,
}

/// Update equipment request (`null` clears nullable fields)
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateEquipment {
    #[validate(length(min = 1, max = 200, message = "Name must be 1 to 200 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Serial number must be 1 to 100 characters"))]
    pub serial_number: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub department_or_owner: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub location: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<NaiveDate>)]
    pub warranty_end: Option<Option<NaiveDate>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<i32>)]
    pub default_team: Option<Option<i32>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<i32>)]
    pub default_technician: Option<Option<i32>>,
    pub is_usable: Option<bool>,
}

/// Direct usability edit
#[derive(Debug, Deserialize, ToSchema)]
pub struct UsabilityUpdate {
    pub is_usable: bool,
}

impl UpdateEquipment {
    /// Apply the patch onto an existing record
    pub fn apply_to(&self, equipment: &mut Equipment) {
        if let Some(ref name) = self.name {
            equipment.name = name.clone();
        }
        if let Some(ref serial) = self.serial_number {
            equipment.serial_number = serial.clone();
        }
        if let Some(ref owner) = self.department_or_owner {
            equipment.department_or_owner = owner.clone();
        }
        if let Some(ref location) = self.location {
            equipment.location = location.clone();
        }
        if let Some(date) = self.purchase_date {
            equipment.purchase_date = date;
        }
        if let Some(warranty) = self.warranty_end {
            equipment.warranty_end = warranty;
        }
        if let Some(team) = self.default_team {
            equipment.default_team = team;
        }
        if let Some(technician) = self.default_technician {
            equipment.default_technician = technician;
        }
        if let Some(usable) = self.is_usable {
            equipment.is_usable = usable;
        }
    }
}
