//! `estimation_history` queries, including pgvector similarity search.
//!
//! Vectors are bound as their text literal (`[0.1,0.2,...]`) and cast with
//! `::vector` in SQL, so no pgvector client type is needed.

use crate::estimation::ReferenceStore;
use crate::types::{
    EstimationRecord, EstimationUpdate, HistoryFilter, HistoryScope, NewEstimation, SimilarEstimation,
};
use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use std::fmt::Write;
use uuid::Uuid;

const RECORD_COLUMNS: &str = "id, project_id, source_project_id, function_name, feature_description, \
     system_prompt, is_reference, sub_tasks, cost, created_at";

/// Render an embedding as a pgvector text literal.
pub fn vector_literal(values: &[f32]) -> String {
    let mut out = String::with_capacity(values.len() * 10 + 2);
    out.push('[');
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        let _ = write!(out, "{v}");
    }
    out.push(']');
    out
}

pub async fn save(pool: &PgPool, new: &NewEstimation) -> Result<EstimationRecord, sqlx::Error> {
    let sql = format!(
        "INSERT INTO estimation_history \
           (project_id, source_project_id, function_name, feature_description, system_prompt, \
            is_reference, sub_tasks, cost, description_vector) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9::vector) \
         RETURNING {RECORD_COLUMNS}"
    );
    sqlx::query_as::<_, EstimationRecord>(&sql)
        .bind(new.project_id)
        .bind(new.source_project_id)
        .bind(&new.function_name)
        .bind(&new.feature_description)
        .bind(&new.system_prompt)
        .bind(new.is_reference)
        .bind(Json(&new.sub_tasks))
        .bind(new.cost)
        .bind(vector_literal(&new.description_vector))
        .fetch_one(pool)
        .await
}

/// Newest first. Every filter is optional; the scope always applies.
pub async fn list(pool: &PgPool, filter: &HistoryFilter) -> Result<Vec<EstimationRecord>, sqlx::Error> {
    let search = filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", escape_like(s)));

    let sql = format!(
        "SELECT {RECORD_COLUMNS} FROM estimation_history \
         WHERE ($1::text IS NULL OR function_name ILIKE $1) \
           AND ($2::uuid IS NULL OR project_id = $2) \
           AND ($3::bool IS NULL OR is_reference = $3) \
           AND (NOT $4::bool OR is_reference OR project_id IS NULL \
                OR project_id IN (SELECT id FROM projects WHERE organization_id = $5::uuid)) \
         ORDER BY created_at DESC"
    );
    let (scoped, organization) = match filter.scope {
        HistoryScope::All => (false, None),
        HistoryScope::Organization(org) => (true, org),
    };
    sqlx::query_as::<_, EstimationRecord>(&sql)
        .bind(search)
        .bind(filter.project_id)
        .bind(filter.is_reference)
        .bind(scoped)
        .bind(organization)
        .fetch_all(pool)
        .await
}

pub async fn get(pool: &PgPool, id: Uuid) -> Result<Option<EstimationRecord>, sqlx::Error> {
    let sql = format!("SELECT {RECORD_COLUMNS} FROM estimation_history WHERE id = $1");
    sqlx::query_as::<_, EstimationRecord>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Update editable fields; the vector is replaced only when one is supplied.
pub async fn update(
    pool: &PgPool,
    id: Uuid,
    changes: &EstimationUpdate,
) -> Result<Option<EstimationRecord>, sqlx::Error> {
    let sql = format!(
        "UPDATE estimation_history SET \
           function_name = $2, \
           feature_description = $3, \
           sub_tasks = $4, \
           cost = $5, \
           description_vector = COALESCE($6::vector, description_vector) \
         WHERE id = $1 \
         RETURNING {RECORD_COLUMNS}"
    );
    sqlx::query_as::<_, EstimationRecord>(&sql)
        .bind(id)
        .bind(&changes.function_name)
        .bind(&changes.feature_description)
        .bind(Json(&changes.sub_tasks))
        .bind(changes.cost)
        .bind(changes.description_vector.as_deref().map(vector_literal))
        .fetch_optional(pool)
        .await
}

/// Delete and return the removed row.
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<Option<EstimationRecord>, sqlx::Error> {
    let sql = format!("DELETE FROM estimation_history WHERE id = $1 RETURNING {RECORD_COLUMNS}");
    sqlx::query_as::<_, EstimationRecord>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Reference rows nearest to `embedding` by cosine distance.
pub async fn nearest_references(
    pool: &PgPool,
    embedding: &[f32],
    limit: usize,
) -> Result<Vec<SimilarEstimation>, sqlx::Error> {
    let sql = format!(
        "SELECT {RECORD_COLUMNS}, (description_vector <=> $1::vector)::float8 AS distance \
         FROM estimation_history \
         WHERE is_reference = TRUE AND description_vector IS NOT NULL \
         ORDER BY description_vector <=> $1::vector \
         LIMIT $2"
    );
    sqlx::query_as::<_, SimilarEstimation>(&sql)
        .bind(vector_literal(embedding))
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(pool)
        .await
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

/// [`ReferenceStore`] backed by the `estimation_history` table.
#[derive(Clone)]
pub struct PgReferenceStore {
    pool: PgPool,
}

impl PgReferenceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReferenceStore for PgReferenceStore {
    async fn nearest_references(
        &self,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<SimilarEstimation>, sqlx::Error> {
        nearest_references(&self.pool, embedding, limit).await
    }
}
