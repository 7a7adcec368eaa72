//! API models for the haberdashery, its article types and articles.

use crate::db::models::haberdashery::{
    ArticleCreateDBRequest, ArticleDBResponse, ArticleTypeCreateDBRequest, ArticleTypeDBResponse, ArticleTypeUpdateDBRequest,
    ArticleUpdateDBRequest, HaberdasheryDBResponse, HaberdasheryUpdateDBRequest,
};
use crate::types::{ArticleId, ArticleTypeId, WorkerId, WorkshopId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HaberdasheryResponse {
    #[schema(value_type = String, format = "uuid")]
    pub workshop_id: WorkshopId,
    pub is_active: bool,
    pub end_date: Option<NaiveDate>,
    /// Workers allowed to manage the inventory, besides the owner
    #[schema(value_type = Vec<String>)]
    pub workers: Vec<WorkerId>,
    pub updated_at: DateTime<Utc>,
}

impl HaberdasheryResponse {
    pub fn new(db: HaberdasheryDBResponse, workers: Vec<WorkerId>) -> Self {
        Self {
            workshop_id: db.workshop_id,
            is_active: db.is_active,
            end_date: db.end_date,
            workers,
            updated_at: db.updated_at,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct HaberdasheryUpdate {
    pub is_active: Option<bool>,
    pub end_date: Option<NaiveDate>,
}

impl From<HaberdasheryUpdate> for HaberdasheryUpdateDBRequest {
    fn from(api: HaberdasheryUpdate) -> Self {
        Self {
            is_active: api.is_active,
            end_date: api.end_date,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HaberdasheryWorkersUpdate {
    #[schema(value_type = Vec<String>)]
    pub worker_ids: Vec<WorkerId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HaberdasheryMembership {
    pub member: bool,
}

/// `changed` is false when membership was already as requested
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HaberdasheryMembershipChange {
    pub changed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ArticleTypeCreate {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl ArticleTypeCreate {
    pub fn into_db(self, workshop_id: WorkshopId) -> ArticleTypeCreateDBRequest {
        ArticleTypeCreateDBRequest {
            workshop_id,
            name: self.name.trim().to_string(),
            description: self.description,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ArticleTypeUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl From<ArticleTypeUpdate> for ArticleTypeUpdateDBRequest {
    fn from(api: ArticleTypeUpdate) -> Self {
        Self {
            name: api.name.map(|n| n.trim().to_string()),
            description: api.description,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ArticleTypeResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ArticleTypeId,
    #[schema(value_type = String, format = "uuid")]
    pub workshop_id: WorkshopId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl From<ArticleTypeDBResponse> for ArticleTypeResponse {
    fn from(db: ArticleTypeDBResponse) -> Self {
        Self {
            id: db.id,
            workshop_id: db.workshop_id,
            name: db.name,
            slug: db.slug,
            description: db.description,
            created_at: db.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ArticleCreate {
    #[schema(value_type = String, format = "uuid")]
    pub article_type_id: ArticleTypeId,
    pub name: String,
    /// Negative values are stored as zero
    #[serde(default)]
    pub quantity: i32,
    #[serde(default)]
    pub is_out: bool,
}

impl From<ArticleCreate> for ArticleCreateDBRequest {
    fn from(api: ArticleCreate) -> Self {
        Self {
            article_type_id: api.article_type_id,
            name: api.name.trim().to_string(),
            quantity: api.quantity,
            is_out: api.is_out,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ArticleUpdate {
    #[schema(value_type = Option<String>, format = "uuid")]
    pub article_type_id: Option<ArticleTypeId>,
    pub name: Option<String>,
    pub quantity: Option<i32>,
    pub is_out: Option<bool>,
}

impl From<ArticleUpdate> for ArticleUpdateDBRequest {
    fn from(api: ArticleUpdate) -> Self {
        Self {
            article_type_id: api.article_type_id,
            name: api.name.map(|n| n.trim().to_string()),
            quantity: api.quantity,
            is_out: api.is_out,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ArticleResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ArticleId,
    #[schema(value_type = String, format = "uuid")]
    pub article_type_id: ArticleTypeId,
    pub name: String,
    pub quantity: i32,
    pub is_out: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ArticleDBResponse> for ArticleResponse {
    fn from(db: ArticleDBResponse) -> Self {
        Self {
            id: db.id,
            article_type_id: db.article_type_id,
            name: db.name,
            quantity: db.quantity,
            is_out: db.is_out,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// Optional narrowing of the article listing
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ArticleQuery {
    /// Only list articles of this type
    pub article_type_id: Option<uuid::Uuid>,
}

/// Is `verify` already taken? `exclude` is the name being edited, if any.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NameCheck {
    pub verify: String,
    pub exclude: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NameCheckResponse {
    pub exists: bool,
}
