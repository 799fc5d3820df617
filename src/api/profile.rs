//! Own-account handlers

use super::{ApiError, ApiJson, AppState};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::AuthUser;
use crate::store::users;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

/// PUT /api/profile/password, PUT /api/account/profile
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    if req.current_password.is_empty() || req.new_password.is_empty() {
        return Err(ApiError::bad_request("Current and new passwords are required."));
    }

    let record = users::find_by_id(&state.db, user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found."))?;

    if !verify_password(&req.current_password, &record.password_hash).await? {
        return Err(ApiError::bad_request("Incorrect current password."));
    }

    let hash = hash_password(&req.new_password).await?;
    users::update_password(&state.db, user.id, &hash).await?;
    info!(user_id = user.id, "Password changed");

    Ok(StatusCode::NO_CONTENT)
}
