//! Projects and user stories

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Project {
    pub id: Uuid,
    pub name_th: String,
    pub name_en: String,
    pub description: String,
    pub duration_months: f64,
    pub organization_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Project row joined with its organization's English name.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProjectListing {
    pub id: Uuid,
    pub name_th: String,
    pub name_en: String,
    pub description: String,
    pub duration_months: f64,
    pub created_at: DateTime<Utc>,
    pub organization_id: Option<Uuid>,
    #[serde(rename = "organizationName")]
    pub organization_name: Option<String>,
}

/// Editable project fields.
#[derive(Debug, Clone)]
pub struct ProjectFields {
    pub name_th: String,
    pub name_en: String,
    pub description: String,
    pub duration_months: f64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserStory {
    pub id: Uuid,
    pub project_id: Uuid,
    pub feature_name: String,
    pub story_text: String,
    pub created_at: DateTime<Utc>,
}
