//! Per-project dashboard statistics.

use crate::types::EstimationRecord;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::PgPool;
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    #[serde(rename = "totalMandays")]
    pub total_mandays: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDashboard {
    pub story_count: i64,
    /// Saved, non-reference estimations
    pub total_tasks: i64,
    pub total_mandays: f64,
    pub average_mandays: f64,
    pub recent_history: Vec<EstimationRecord>,
    pub estimation_trend: Vec<TrendPoint>,
}

const RECENT_LIMIT: i64 = 5;

pub async fn project_dashboard(pool: &PgPool, project_id: Uuid) -> Result<ProjectDashboard, sqlx::Error> {
    let story_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_stories WHERE project_id = $1")
        .bind(project_id)
        .fetch_one(pool)
        .await?;

    let (total_tasks, total_mandays): (i64, f64) = sqlx::query_as(
        "SELECT COUNT(*), COALESCE(SUM(cost), 0)::float8 FROM estimation_history \
         WHERE project_id = $1 AND is_reference = FALSE",
    )
    .bind(project_id)
    .fetch_one(pool)
    .await?;

    let recent_history = sqlx::query_as::<_, EstimationRecord>(
        "SELECT id, project_id, source_project_id, function_name, feature_description, system_prompt, \
                is_reference, sub_tasks, cost, created_at \
         FROM estimation_history \
         WHERE project_id = $1 AND is_reference = FALSE \
         ORDER BY created_at DESC LIMIT $2",
    )
    .bind(project_id)
    .bind(RECENT_LIMIT)
    .fetch_all(pool)
    .await?;

    let costs: Vec<(f64, DateTime<Utc>)> = sqlx::query_as(
        "SELECT cost, created_at FROM estimation_history \
         WHERE project_id = $1 AND is_reference = FALSE ORDER BY created_at",
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    Ok(summarize(story_count, total_tasks, total_mandays, recent_history, &costs))
}

fn summarize(
    story_count: i64,
    total_tasks: i64,
    total_mandays: f64,
    recent_history: Vec<EstimationRecord>,
    costs: &[(f64, DateTime<Utc>)],
) -> ProjectDashboard {
    let average = if total_tasks > 0 {
        total_mandays / total_tasks as f64
    } else {
        0.0
    };

    ProjectDashboard {
        story_count,
        total_tasks,
        total_mandays: round2(total_mandays),
        average_mandays: round2(average),
        recent_history,
        estimation_trend: build_trend(costs),
    }
}

/// Sum costs per UTC day, ascending by date.
pub fn build_trend(costs: &[(f64, DateTime<Utc>)]) -> Vec<TrendPoint> {
    let mut by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for (cost, at) in costs {
        *by_day.entry(at.date_naive()).or_default() += cost;
    }
    by_day
        .into_iter()
        .map(|(date, total)| TrendPoint {
            date,
            total_mandays: round2(total),
        })
        .collect()
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
