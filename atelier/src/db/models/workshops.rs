//! Database models for workshops.

use crate::types::WorkshopId;
use chrono::{DateTime, Utc};

/// Database request for creating a workshop. The slug is derived from the name.
#[derive(Debug, Clone, Default)]
pub struct WorkshopCreateDBRequest {
    pub name: String,
    pub description: String,
    pub email: Option<String>,
    pub phone: String,
    pub country: String,
    pub city: Option<String>,
    pub address: Option<String>,
}

/// Database request for updating a workshop
#[derive(Debug, Clone, Default)]
pub struct WorkshopUpdateDBRequest {
    pub description: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
}

/// Database response for a workshop
#[derive(Debug, Clone)]
pub struct WorkshopDBResponse {
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
    pub updated_at: DateTime<Utc>,
}
