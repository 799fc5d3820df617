//! Story suggestion handlers

use super::{ApiError, ApiJson, AppState};
use crate::auth::AuthUser;
use crate::estimation::prompt::ExistingStory;
use crate::estimation::stories;
use crate::estimation::StorySuggestion;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestStoryRequest {
    #[serde(default)]
    pub task_description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateStoriesRequest {
    #[serde(default)]
    pub project_description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestFeaturesRequest {
    #[serde(default)]
    pub project_description: String,
    #[serde(default)]
    pub existing_stories: Vec<ExistingStory>,
}

#[derive(Debug, Serialize)]
pub struct StoryList {
    pub stories: Vec<StorySuggestion>,
}

/// POST /api/suggest-story
pub async fn suggest_story(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    ApiJson(req): ApiJson<SuggestStoryRequest>,
) -> Result<Json<StorySuggestion>, ApiError> {
    let story = stories::suggest_story(
        state.pipeline.generator(),
        state.output_language(),
        &req.task_description,
    )
    .await?;
    Ok(Json(story))
}

/// POST /api/generate-stories
pub async fn generate_stories(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    ApiJson(req): ApiJson<GenerateStoriesRequest>,
) -> Result<Json<StoryList>, ApiError> {
    let stories = stories::generate_stories(
        state.pipeline.generator(),
        state.output_language(),
        &req.project_description,
    )
    .await?;
    Ok(Json(StoryList { stories }))
}

/// POST /api/suggest-features
pub async fn suggest_features(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    ApiJson(req): ApiJson<SuggestFeaturesRequest>,
) -> Result<Json<StoryList>, ApiError> {
    let stories = stories::suggest_features(
        state.pipeline.generator(),
        state.output_language(),
        &req.project_description,
        &req.existing_stories,
    )
    .await?;
    Ok(Json(StoryList { stories }))
}
