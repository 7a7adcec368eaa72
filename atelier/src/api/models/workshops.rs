//! API models for workshops.

use crate::db::models::workshops::{WorkshopCreateDBRequest, WorkshopDBResponse};
use crate::types::WorkshopId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WorkshopCreate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub email: Option<String>,
    pub phone: String,
    pub country: String,
    pub city: Option<String>,
    pub address: Option<String>,
}

impl From<WorkshopCreate> for WorkshopCreateDBRequest {
    fn from(api: WorkshopCreate) -> Self {
        Self {
            name: api.name,
            description: api.description,
            email: api.email,
            phone: api.phone,
            country: api.country,
            city: api.city,
            address: api.address,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WorkshopResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: WorkshopId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub email: Option<String>,
    pub phone: String,
    pub country: String,
    pub city: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<WorkshopDBResponse> for WorkshopResponse {
    fn from(db: WorkshopDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            slug: db.slug,
            description: db.description,
            email: db.email,
            phone: db.phone,
            country: db.country,
            city: db.city,
            address: db.address,
            created_at: db.created_at,
        }
    }
}
