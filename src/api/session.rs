//! Login, logout and current-identity handlers

use super::{ApiError, ApiJson, AppState};
use crate::auth::jwt::{clear_cookie, session_cookie};
use crate::auth::password::verify_password;
use crate::auth::AuthUser;
use crate::store::users;
use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::response::{AppendHeaders, IntoResponse};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

const BAD_CREDENTIALS: &str = "Invalid email or password.";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

#[derive(Debug, Serialize)]
pub struct SessionUser {
    pub id: i32,
    pub email: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: SessionUser,
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required."));
    }

    let key = users::normalize_email(&req.email);
    if let Err(retry_after) = state.throttle.begin_attempt(&key) {
        return Err(ApiError::TooManyRequests(format!(
            "Too many failed login attempts. Try again in {} minutes.",
            retry_after.as_secs().div_ceil(60).max(1)
        )));
    }

    let Some(user) = users::find_by_email(&state.db, &key).await? else {
        return Err(ApiError::Unauthorized(BAD_CREDENTIALS.to_string()));
    };

    if !verify_password(&req.password, &user.password_hash).await? {
        warn!(user_id = user.id, "Failed login");
        return Err(ApiError::Unauthorized(BAD_CREDENTIALS.to_string()));
    }
    state.throttle.reset(&key);

    let role = user
        .role()
        .map_err(|e| ApiError::Internal(format!("Stored account is invalid: {e}")))?;
    let token = state.signer.issue(&user, role)?;
    let cookie = session_cookie(
        &token,
        req.remember_me,
        state.signer.ttl_secs(),
        state.config.auth.cookie_secure,
    );

    info!(user_id = user.id, role = %role, "User logged in");

    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(SessionResponse {
            user: SessionUser {
                id: user.id,
                email: user.email,
                role: role.to_string(),
                organization_id: user.organization_id,
            },
        }),
    ))
}

/// POST /api/auth/logout
pub async fn logout(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        AppendHeaders([(SET_COOKIE, clear_cookie(state.config.auth.cookie_secure))]),
        Json(serde_json::json!({ "message": "Logged out successfully." })),
    )
}

/// GET /api/auth/me
pub async fn me(user: AuthUser) -> Json<SessionResponse> {
    Json(SessionResponse {
        user: SessionUser {
            id: user.id,
            email: user.email,
            role: user.role.to_string(),
            organization_id: user.organization_id,
        },
    })
}
