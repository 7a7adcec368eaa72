//! API models for customers.

use crate::db::models::customers::{CustomerCreateDBRequest, CustomerDBResponse, Gender};
use crate::types::{CustomerId, WorkshopId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CustomerCreate {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub nickname: String,
    pub gender: Gender,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl CustomerCreate {
    pub fn into_db(self, workshop_id: WorkshopId) -> CustomerCreateDBRequest {
        CustomerCreateDBRequest {
            workshop_id,
            first_name: self.first_name,
            last_name: self.last_name,
            nickname: self.nickname,
            gender: self.gender,
            email: self.email,
            phone: self.phone,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CustomerResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: CustomerId,
    #[schema(value_type = String, format = "uuid")]
    pub workshop_id: WorkshopId,
    pub first_name: String,
    pub last_name: String,
    pub nickname: String,
    pub gender: Gender,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<CustomerDBResponse> for CustomerResponse {
    fn from(db: CustomerDBResponse) -> Self {
        Self {
            id: db.id,
            workshop_id: db.workshop_id,
            first_name: db.first_name,
            last_name: db.last_name,
            nickname: db.nickname,
            gender: db.gender,
            email: db.email,
            phone: db.phone,
            created_at: db.created_at,
        }
    }
}
