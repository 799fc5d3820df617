//! `organizations` queries

use crate::types::{Organization, OrganizationSummary};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

/// Member row shown on the organization detail page.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrganizationMember {
    pub id: i32,
    pub email: String,
    pub role: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// All organizations with distinct user and project counts, newest first.
pub async fn list_with_counts(pool: &PgPool) -> Result<Vec<OrganizationSummary>, sqlx::Error> {
    sqlx::query_as::<_, OrganizationSummary>(
        "SELECT o.id, o.name_th, o.name_en, o.description, o.created_at, \
                COUNT(DISTINCT u.id) AS user_count, \
                COUNT(DISTINCT p.id) AS project_count \
         FROM organizations o \
         LEFT JOIN users u ON u.organization_id = o.id \
         LEFT JOIN projects p ON p.organization_id = o.id \
         GROUP BY o.id \
         ORDER BY o.created_at DESC",
    )
    .fetch_all(pool)
    .await
}

pub async fn get(pool: &PgPool, id: Uuid) -> Result<Option<Organization>, sqlx::Error> {
    sqlx::query_as::<_, Organization>(
        "SELECT id, name_th, name_en, description, created_at FROM organizations WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn members(pool: &PgPool, id: Uuid) -> Result<Vec<OrganizationMember>, sqlx::Error> {
    sqlx::query_as::<_, OrganizationMember>(
        "SELECT id, email, role, created_at FROM users WHERE organization_id = $1 ORDER BY created_at DESC",
    )
    .bind(id)
    .fetch_all(pool)
    .await
}

pub async fn exists(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM organizations WHERE id = $1)")
        .bind(id)
        .fetch_one(pool)
        .await
}

pub async fn create(
    pool: &PgPool,
    name_th: &str,
    name_en: &str,
    description: &str,
) -> Result<Organization, sqlx::Error> {
    sqlx::query_as::<_, Organization>(
        "INSERT INTO organizations (name_th, name_en, description) VALUES ($1, $2, $3) \
         RETURNING id, name_th, name_en, description, created_at",
    )
    .bind(name_th)
    .bind(name_en)
    .bind(description)
    .fetch_one(pool)
    .await
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    name_th: &str,
    name_en: &str,
    description: &str,
) -> Result<Option<Organization>, sqlx::Error> {
    sqlx::query_as::<_, Organization>(
        "UPDATE organizations SET name_th = $2, name_en = $3, description = $4 WHERE id = $1 \
         RETURNING id, name_th, name_en, description, created_at",
    )
    .bind(id)
    .bind(name_th)
    .bind(name_en)
    .bind(description)
    .fetch_optional(pool)
    .await
}

/// Members and projects are detached, not deleted.
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM organizations WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
