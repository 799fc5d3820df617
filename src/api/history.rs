//! Estimation history handlers
//!
//! Sub-tasks sent by clients go through the same normalizer as model output
//! and the stored cost is always recomputed from them.

use super::projects::visible_project;
use super::{ApiError, ApiJson, ApiPath, ApiQuery, AppState};
use crate::auth::AuthUser;
use crate::estimation::normalize::normalize_sub_task;
use crate::estimation::total_cost;
use crate::store::{history, is_foreign_key_violation};
use crate::types::{
    EstimationRecord, EstimationUpdate, HistoryFilter, HistoryScope, NewEstimation, SimilarEstimation, SubTask,
};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub search: Option<String>,
    pub project_id: Option<Uuid>,
    pub is_reference: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct HistoryList {
    pub history: Vec<EstimationRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveHistoryRequest {
    pub project_id: Option<Uuid>,
    pub source_project_id: Option<Uuid>,
    #[serde(default)]
    pub function_name: String,
    #[serde(default)]
    pub feature_description: String,
    #[serde(default)]
    pub system_prompt: String,
    pub sub_tasks: Option<Vec<Value>>,
    /// Informational; the stored cost is derived from `sub_tasks`
    pub cost: Option<f64>,
    pub is_reference: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateHistoryRequest {
    #[serde(default)]
    pub function_name: String,
    #[serde(default)]
    pub feature_description: String,
    pub sub_tasks: Option<Vec<Value>>,
    pub cost: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindSimilarRequest {
    #[serde(default)]
    pub feature_description: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarTasks {
    pub similar_tasks: Vec<SimilarEstimation>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarProjects {
    pub similar_projects: Vec<SimilarEstimation>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedEstimation {
    pub message: &'static str,
    pub deleted_record: EstimationRecord,
}

fn required(value: &str, field: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        Err(ApiError::bad_request(format!("{field} is required and must be a string.")))
    } else {
        Ok(())
    }
}

/// Normalize client sub-tasks and derive their cost.
fn normalized(items: &[Value], claimed: Option<f64>) -> (Vec<SubTask>, f64) {
    let sub_tasks: Vec<SubTask> = items.iter().map(normalize_sub_task).collect();
    let cost = total_cost(&sub_tasks);
    if let Some(claimed) = claimed {
        if (claimed - cost).abs() > 1e-6 {
            debug!(claimed, derived = cost, "Client cost replaced by derived cost");
        }
    }
    (sub_tasks, cost)
}

const RECORD_NOT_FOUND: &str = "Estimation record not found.";

/// How a loaded record is about to be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Read,
    Write,
}

/// Project whose visibility gates `access` to `record`, if any.
///
/// References are readable by everyone; every other project-bound access
/// follows the project.
fn gating_project(record: &EstimationRecord, access: Access) -> Option<Uuid> {
    if access == Access::Read && record.is_reference {
        None
    } else {
        record.project_id
    }
}

/// Load a record the caller may use, or 404.
async fn visible_record(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    access: Access,
) -> Result<EstimationRecord, ApiError> {
    let record = history::get(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found(RECORD_NOT_FOUND))?;
    if let Some(project_id) = gating_project(&record, access) {
        visible_project(&state.db, user, project_id)
            .await
            .map_err(|e| match e {
                ApiError::NotFound(_) => ApiError::not_found(RECORD_NOT_FOUND),
                other => other,
            })?;
    }
    Ok(record)
}

fn history_scope(user: &AuthUser) -> HistoryScope {
    if user.is_superadmin() {
        HistoryScope::All
    } else {
        HistoryScope::Organization(user.organization_id)
    }
}

fn project_fk(e: sqlx::Error) -> ApiError {
    if is_foreign_key_violation(&e) {
        ApiError::not_found("Project not found.")
    } else {
        e.into()
    }
}

/// GET /api/history
pub async fn list_history(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<HistoryQuery>,
) -> Result<Json<HistoryList>, ApiError> {
    if let Some(project_id) = query.project_id {
        visible_project(&state.db, &user, project_id).await?;
    }

    let filter = HistoryFilter {
        search: query.search,
        project_id: query.project_id,
        is_reference: query.is_reference,
        scope: history_scope(&user),
    };
    Ok(Json(HistoryList {
        history: history::list(&state.db, &filter).await?,
    }))
}

/// GET /api/history/:id
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<EstimationRecord>, ApiError> {
    Ok(Json(visible_record(&state, &user, id, Access::Read).await?))
}

/// POST /api/history
pub async fn save_history(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiJson(req): ApiJson<SaveHistoryRequest>,
) -> Result<(StatusCode, Json<EstimationRecord>), ApiError> {
    required(&req.function_name, "functionName")?;
    required(&req.feature_description, "featureDescription")?;
    required(&req.system_prompt, "systemPrompt")?;
    let items = req
        .sub_tasks
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("subTasks is required and must be an array."))?;
    let is_reference = req
        .is_reference
        .ok_or_else(|| ApiError::bad_request("isReference is required and must be a boolean."))?;

    if let Some(project_id) = req.project_id {
        visible_project(&state.db, &user, project_id).await?;
    }

    let (sub_tasks, cost) = normalized(items, req.cost);
    let description_vector = state.pipeline.embed(&req.feature_description).await?;

    let record = history::save(
        &state.db,
        &NewEstimation {
            project_id: req.project_id,
            source_project_id: req.source_project_id,
            function_name: req.function_name.trim().to_string(),
            feature_description: req.feature_description,
            system_prompt: req.system_prompt,
            sub_tasks,
            is_reference,
            cost,
            description_vector,
        },
    )
    .await
    .map_err(project_fk)?;

    info!(
        id = %record.id,
        is_reference,
        cost = record.cost,
        by = user.id,
        "Estimation saved"
    );
    Ok((StatusCode::CREATED, Json(record)))
}

/// PUT /api/history/:id
pub async fn update_history(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateHistoryRequest>,
) -> Result<Json<EstimationRecord>, ApiError> {
    let items = match req.sub_tasks.as_deref() {
        Some(items) if !req.function_name.trim().is_empty() && !req.feature_description.trim().is_empty() => items,
        _ => return Err(ApiError::bad_request("Invalid data format for update.")),
    };

    let existing = visible_record(&state, &user, id, Access::Write).await?;

    let (sub_tasks, cost) = normalized(items, req.cost);
    let description_vector = if existing.feature_description == req.feature_description {
        None
    } else {
        debug!(id = %id, "Description changed, re-embedding");
        Some(state.pipeline.embed(&req.feature_description).await?)
    };

    let record = history::update(
        &state.db,
        id,
        &EstimationUpdate {
            function_name: req.function_name.trim().to_string(),
            feature_description: req.feature_description,
            sub_tasks,
            cost,
            description_vector,
        },
    )
    .await?
    .ok_or_else(|| ApiError::not_found(RECORD_NOT_FOUND))?;

    info!(id = %id, cost = record.cost, by = user.id, "Estimation updated");
    Ok(Json(record))
}

/// DELETE /api/history/:id
pub async fn delete_history(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<DeletedEstimation>, ApiError> {
    visible_record(&state, &user, id, Access::Write).await?;
    let deleted = history::delete(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found(RECORD_NOT_FOUND))?;
    info!(id = %id, by = user.id, "Estimation deleted");
    Ok(Json(DeletedEstimation {
        message: "Estimation deleted successfully.",
        deleted_record: deleted,
    }))
}

/// POST /api/find-similar
pub async fn find_similar_tasks(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    ApiJson(req): ApiJson<FindSimilarRequest>,
) -> Result<Json<SimilarTasks>, ApiError> {
    let similar_tasks = state.pipeline.find_similar(&req.feature_description).await?;
    Ok(Json(SimilarTasks { similar_tasks }))
}

/// POST /api/history/find-similar
pub async fn find_similar_projects(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    ApiJson(req): ApiJson<FindSimilarRequest>,
) -> Result<Json<SimilarProjects>, ApiError> {
    let similar_projects = state.pipeline.find_similar(&req.feature_description).await?;
    Ok(Json(SimilarProjects { similar_projects }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;
    use serde_json::json;

    fn record(project_id: Option<Uuid>, is_reference: bool) -> EstimationRecord {
        EstimationRecord {
            id: Uuid::new_v4(),
            project_id,
            source_project_id: None,
            function_name: "Login".into(),
            feature_description: "Users log in".into(),
            system_prompt: String::new(),
            is_reference,
            sub_tasks: sqlx::types::Json(Vec::new()),
            cost: 0.0,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_project_rows_are_gated_by_their_project() {
        let project = Uuid::new_v4();
        let plain = record(Some(project), false);
        assert_eq!(gating_project(&plain, Access::Read), Some(project));
        assert_eq!(gating_project(&plain, Access::Write), Some(project));

        // References are shared for reading but edits still need the project
        let reference = record(Some(project), true);
        assert_eq!(gating_project(&reference, Access::Read), None);
        assert_eq!(gating_project(&reference, Access::Write), Some(project));

        assert_eq!(gating_project(&record(None, false), Access::Write), None);
    }

    #[test]
    fn test_listing_scope_follows_role() {
        let org = Uuid::new_v4();
        let user = |role| AuthUser {
            id: 1,
            email: "u@example.com".into(),
            role,
            organization_id: Some(org),
        };
        assert_eq!(history_scope(&user(Role::Superadmin)), HistoryScope::All);
        assert_eq!(history_scope(&user(Role::Admin)), HistoryScope::Organization(Some(org)));
        assert_eq!(history_scope(&user(Role::User)), HistoryScope::Organization(Some(org)));
    }

    #[test]
    fn test_client_sub_tasks_are_normalized_and_cost_derived() {
        let items = vec![
            json!({"Sub-Task": "API", "Description": "REST", "Days": 1.5}),
            json!({"task": "UI", "days": "2"}),
        ];
        let (tasks, cost) = normalized(&items, Some(100.0));
        assert_eq!(tasks[1].name, "UI");
        assert_eq!(cost, 3.5);
    }

    #[test]
    fn test_save_request_field_names() {
        let req: SaveHistoryRequest = serde_json::from_value(json!({
            "functionName": "Login",
            "featureDescription": "Users log in",
            "systemPrompt": "p",
            "subTasks": [],
            "isReference": true
        }))
        .unwrap();
        assert_eq!(req.function_name, "Login");
        assert_eq!(req.is_reference, Some(true));
        assert!(req.cost.is_none());
    }
}
