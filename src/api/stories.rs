//! User story handlers

use super::projects::visible_project;
use super::{ApiError, ApiJson, ApiPath, ApiQuery, AppState};
use crate::auth::AuthUser;
use crate::store::stories;
use crate::types::UserStory;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoriesQuery {
    pub project_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct StoryList {
    pub stories: Vec<UserStory>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStoryRequest {
    pub project_id: Option<Uuid>,
    #[serde(default)]
    pub feature_name: String,
    #[serde(default)]
    pub story_text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStoryRequest {
    #[serde(default)]
    pub story_text: String,
    pub feature_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedStory {
    pub message: &'static str,
    pub deleted_record: UserStory,
}

/// Load a story whose project the caller may see.
async fn visible_story(state: &AppState, user: &AuthUser, id: Uuid) -> Result<UserStory, ApiError> {
    let story = stories::get(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("User Story not found."))?;
    visible_project(&state.db, user, story.project_id)
        .await
        .map_err(|e| match e {
            ApiError::NotFound(_) => ApiError::not_found("User Story not found."),
            other => other,
        })?;
    Ok(story)
}

/// GET /api/user-stories?projectId=
pub async fn list_stories(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<StoriesQuery>,
) -> Result<Json<StoryList>, ApiError> {
    let project_id = query
        .project_id
        .ok_or_else(|| ApiError::bad_request("projectId query parameter is required."))?;
    visible_project(&state.db, &user, project_id).await?;

    Ok(Json(StoryList {
        stories: stories::list_by_project(&state.db, project_id).await?,
    }))
}

/// POST /api/user-stories
pub async fn create_story(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateStoryRequest>,
) -> Result<(StatusCode, Json<UserStory>), ApiError> {
    let project_id = match req.project_id {
        Some(id) if !req.story_text.trim().is_empty() && !req.feature_name.trim().is_empty() => id,
        _ => {
            return Err(ApiError::bad_request(
                "Missing required fields: projectId, storyText, featureName",
            ))
        }
    };
    visible_project(&state.db, &user, project_id).await?;

    let story = stories::create(&state.db, project_id, req.feature_name.trim(), req.story_text.trim()).await?;
    info!(story_id = %story.id, project_id = %project_id, "User story created");
    Ok((StatusCode::CREATED, Json(story)))
}

/// PUT /api/user-stories/:id
pub async fn update_story(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateStoryRequest>,
) -> Result<Json<UserStory>, ApiError> {
    if req.story_text.trim().is_empty() {
        return Err(ApiError::bad_request("storyText is required."));
    }
    visible_story(&state, &user, id).await?;

    let feature_name = req.feature_name.as_deref().map(str::trim).filter(|n| !n.is_empty());
    let story = stories::update(&state.db, id, req.story_text.trim(), feature_name)
        .await?
        .ok_or_else(|| ApiError::not_found("User Story not found."))?;
    Ok(Json(story))
}

/// DELETE /api/user-stories/:id
pub async fn delete_story(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<DeletedStory>, ApiError> {
    visible_story(&state, &user, id).await?;

    let deleted = stories::delete(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("User Story not found."))?;
    info!(story_id = %id, "User story deleted");
    Ok(Json(DeletedStory {
        message: "User Story deleted successfully.",
        deleted_record: deleted,
    }))
}
