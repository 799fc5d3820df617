//! Estimation handlers

use super::{ApiError, ApiJson, AppState};
use crate::auth::AuthUser;
use crate::estimation::pipeline::Estimation;
use crate::estimation::{Estimate, EstimateRequest};
use crate::types::SimilarEstimation;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEstimateRequest {
    #[serde(default)]
    pub feature_description: String,
    #[serde(default)]
    pub system_prompt: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferencedEstimateRequest {
    #[serde(default, alias = "featureDescription")]
    pub task_description: String,
    pub project_context: Option<String>,
    pub system_prompt: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferencedEstimate {
    pub estimation: Estimation,
    pub prompt: String,
    pub raw_response: String,
    pub references: Vec<SimilarEstimation>,
    pub references_used: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieval_error: Option<String>,
}

/// POST /api/estimate
pub async fn estimate(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    ApiJson(req): ApiJson<RawEstimateRequest>,
) -> Result<Json<Estimate>, ApiError> {
    let estimate = state
        .pipeline
        .estimate(&req.system_prompt, &req.feature_description)
        .await?;
    Ok(Json(estimate))
}

/// POST /api/estimate/with-references
pub async fn estimate_with_references(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    ApiJson(req): ApiJson<ReferencedEstimateRequest>,
) -> Result<Json<ReferencedEstimate>, ApiError> {
    let out = state
        .pipeline
        .estimate_with_references(&EstimateRequest {
            task_description: req.task_description,
            project_context: req.project_context,
            system_prompt: req.system_prompt,
        })
        .await?;

    Ok(Json(ReferencedEstimate {
        estimation: out.estimate.estimation,
        prompt: out.estimate.prompt,
        raw_response: out.estimate.raw_response,
        references_used: out.references.len(),
        references: out.references,
        retrieval_error: out.retrieval_error,
    }))
}
