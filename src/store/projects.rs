//! `projects` queries

use crate::types::{Project, ProjectFields, ProjectListing};
use sqlx::PgPool;
use uuid::Uuid;

const PROJECT_COLUMNS: &str =
    "id, name_th, name_en, description, duration_months, organization_id, created_at, updated_at";

/// Projects with their organization name, newest first.
///
/// `organization` limits the listing to one organization; `None` lists all.
pub async fn list(pool: &PgPool, organization: Option<Uuid>) -> Result<Vec<ProjectListing>, sqlx::Error> {
    sqlx::query_as::<_, ProjectListing>(
        "SELECT p.id, p.name_th, p.name_en, p.description, p.duration_months, p.created_at, \
                p.organization_id, o.name_en AS organization_name \
         FROM projects p \
         LEFT JOIN organizations o ON o.id = p.organization_id \
         WHERE ($1::uuid IS NULL OR p.organization_id = $1) \
         ORDER BY p.created_at DESC",
    )
    .bind(organization)
    .fetch_all(pool)
    .await
}

/// Projects owned by one organization, without the join.
pub async fn list_for_organization(pool: &PgPool, organization: Uuid) -> Result<Vec<Project>, sqlx::Error> {
    let sql = format!(
        "SELECT {PROJECT_COLUMNS} FROM projects WHERE organization_id = $1 ORDER BY created_at DESC"
    );
    sqlx::query_as::<_, Project>(&sql)
        .bind(organization)
        .fetch_all(pool)
        .await
}

pub async fn get(pool: &PgPool, id: Uuid) -> Result<Option<Project>, sqlx::Error> {
    let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1");
    sqlx::query_as::<_, Project>(&sql).bind(id).fetch_optional(pool).await
}

pub async fn create(
    pool: &PgPool,
    fields: &ProjectFields,
    organization: Option<Uuid>,
) -> Result<Project, sqlx::Error> {
    let sql = format!(
        "INSERT INTO projects (name_th, name_en, description, duration_months, organization_id) \
         VALUES ($1, $2, $3, $4, $5) RETURNING {PROJECT_COLUMNS}"
    );
    sqlx::query_as::<_, Project>(&sql)
        .bind(&fields.name_th)
        .bind(&fields.name_en)
        .bind(&fields.description)
        .bind(fields.duration_months)
        .bind(organization)
        .fetch_one(pool)
        .await
}

pub async fn update(pool: &PgPool, id: Uuid, fields: &ProjectFields) -> Result<Option<Project>, sqlx::Error> {
    let sql = format!(
        "UPDATE projects SET name_th = $2, name_en = $3, description = $4, duration_months = $5, \
                updated_at = NOW() \
         WHERE id = $1 RETURNING {PROJECT_COLUMNS}"
    );
    sqlx::query_as::<_, Project>(&sql)
        .bind(id)
        .bind(&fields.name_th)
        .bind(&fields.name_en)
        .bind(&fields.description)
        .bind(fields.duration_months)
        .fetch_optional(pool)
        .await
}

/// Delete and return the removed row. Stories cascade; history keeps the
/// row with `project_id` cleared.
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<Option<Project>, sqlx::Error> {
    let sql = format!("DELETE FROM projects WHERE id = $1 RETURNING {PROJECT_COLUMNS}");
    sqlx::query_as::<_, Project>(&sql).bind(id).fetch_optional(pool).await
}
