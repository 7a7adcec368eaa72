//! Database models for the haberdashery: the workshop's supplies inventory.

use crate::types::{ArticleId, ArticleTypeId, WorkshopId};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;

/// Database response for a workshop's haberdashery
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct HaberdasheryDBResponse {
    pub workshop_id: WorkshopId,
    pub is_active: bool,
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database request for updating a haberdashery
#[derive(Debug, Clone, Default)]
pub struct HaberdasheryUpdateDBRequest {
    pub is_active: Option<bool>,
    pub end_date: Option<NaiveDate>,
}

/// Database request for creating an article type. The slug is derived from the name.
#[derive(Debug, Clone)]
pub struct ArticleTypeCreateDBRequest {
    pub workshop_id: WorkshopId,
    pub name: String,
    pub description: String,
}

/// Database request for updating an article type. A new name also renews the slug.
#[derive(Debug, Clone, Default)]
pub struct ArticleTypeUpdateDBRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Database response for an article type
#[derive(Debug, Clone, FromRow)]
pub struct ArticleTypeDBResponse {
    pub id: ArticleTypeId,
    pub workshop_id: WorkshopId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database request for creating an article
#[derive(Debug, Clone)]
pub struct ArticleCreateDBRequest {
    pub article_type_id: ArticleTypeId,
    pub name: String,
    /// Never negative; callers clamp before inserting
    pub quantity: i32,
    pub is_out: bool,
}

/// Database request for updating an article
#[derive(Debug, Clone, Default)]
pub struct ArticleUpdateDBRequest {
    pub article_type_id: Option<ArticleTypeId>,
    pub name: Option<String>,
    pub quantity: Option<i32>,
    pub is_out: Option<bool>,
}

/// Database response for an article
#[derive(Debug, Clone, FromRow)]
pub struct ArticleDBResponse {
    pub id: ArticleId,
    pub article_type_id: ArticleTypeId,
    pub name: String,
    pub quantity: i32,
    pub is_out: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
