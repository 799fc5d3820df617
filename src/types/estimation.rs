//! Estimation records and the canonical sub-task shape

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

/// One line of a task breakdown.
///
/// Wire names are kept as `Sub-Task` / `Description` / `Days` because that is
/// the shape stored in `estimation_history.sub_tasks` and used in few-shot
/// examples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubTask {
    #[serde(rename = "Sub-Task")]
    pub name: String,
    #[serde(rename = "Description", default)]
    pub description: String,
    #[serde(rename = "Days", default)]
    pub days: f64,
}

impl SubTask {
    pub fn new(name: impl Into<String>, description: impl Into<String>, days: f64) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            days,
        }
    }
}

/// A row of `estimation_history` (the embedding vector is never selected).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct EstimationRecord {
    pub id: Uuid,
    pub project_id: Option<Uuid>,
    pub source_project_id: Option<Uuid>,
    pub function_name: String,
    pub feature_description: String,
    pub system_prompt: String,
    pub is_reference: bool,
    pub sub_tasks: Json<Vec<SubTask>>,
    pub cost: f64,
    pub created_at: DateTime<Utc>,
}

/// A reference estimation returned by nearest-neighbour search.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SimilarEstimation {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub record: EstimationRecord,
    /// Cosine distance to the query embedding (0 = identical direction)
    pub distance: f64,
}

/// Values written when a new estimation is saved.
#[derive(Debug, Clone)]
pub struct NewEstimation {
    pub project_id: Option<Uuid>,
    pub source_project_id: Option<Uuid>,
    pub function_name: String,
    pub feature_description: String,
    pub system_prompt: String,
    pub sub_tasks: Vec<SubTask>,
    pub is_reference: bool,
    pub cost: f64,
    pub description_vector: Vec<f32>,
}

/// Values written when an estimation is edited.
#[derive(Debug, Clone)]
pub struct EstimationUpdate {
    pub function_name: String,
    pub feature_description: String,
    pub sub_tasks: Vec<SubTask>,
    pub cost: f64,
    /// New embedding, only present when the description changed
    pub description_vector: Option<Vec<f32>>,
}

/// Which project-bound rows a history listing may return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HistoryScope {
    /// Every row
    #[default]
    All,
    /// References, unassigned rows, and rows of this organization's projects
    Organization(Option<Uuid>),
}

/// Filters accepted by the history listing.
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub search: Option<String>,
    pub project_id: Option<Uuid>,
    pub is_reference: Option<bool>,
    pub scope: HistoryScope,
}
