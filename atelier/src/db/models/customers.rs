//! Database models for customers.

use crate::types::{CustomerId, WorkshopId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Garment audience, shared by customers and orders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Gender {
    Man,
    Woman,
    Children,
}

/// Database request for creating a customer
#[derive(Debug, Clone)]
pub struct CustomerCreateDBRequest {
    pub workshop_id: WorkshopId,
    pub first_name: String,
    pub last_name: String,
    pub nickname: String,
    pub gender: Gender,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Database request for updating a customer
#[derive(Debug, Clone, Default)]
pub struct CustomerUpdateDBRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub nickname: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Database response for a customer
#[derive(Debug, Clone, FromRow)]
pub struct CustomerDBResponse {
    pub id: CustomerId,
    pub workshop_id: WorkshopId,
    pub first_name: String,
    pub last_name: String,
    pub nickname: String,
    pub gender: Gender,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
