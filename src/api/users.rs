//! User administration handlers
//!
//! Admins act only inside their own organization and never on superadmin
//! accounts; superadmins act on everyone except themselves.

use super::{ApiError, ApiJson, ApiPath, ApiQuery, AppState};
use crate::auth::password::hash_password;
use crate::auth::{AdminUser, AuthUser, SuperadminUser};
use crate::store::users::{self, UserChanges};
use crate::store::{is_foreign_key_violation, is_unique_violation, organizations};
use crate::types::{Role, UserIdentity, UserSummary};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

const DEFAULT_PAGE_SIZE: i64 = 10;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl ListUsersQuery {
    /// `(limit, offset)` with page >= 1 and 1 <= page size <= 100.
    fn limit_offset(&self) -> (i64, i64) {
        let size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let page = self.page.unwrap_or(1).max(1);
        (size, (page - 1).saturating_mul(size))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPage {
    pub users: Vec<UserSummary>,
    pub total_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub organization_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    /// Absent leaves the organization alone; `null` detaches the user
    #[serde(default, deserialize_with = "present")]
    pub organization_id: Option<Option<Uuid>>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn parse_role(raw: &str) -> Result<Role, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid role specified."))
}

/// GET /api/admin/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    AdminUser(user): AdminUser,
    ApiQuery(query): ApiQuery<ListUsersQuery>,
) -> Result<Json<UserPage>, ApiError> {
    let scope = if user.is_superadmin() {
        None
    } else {
        match user.organization_id {
            Some(org) => Some(org),
            None => {
                return Ok(Json(UserPage {
                    users: Vec::new(),
                    total_count: 0,
                }))
            }
        }
    };

    let (limit, offset) = query.limit_offset();
    let (users, total_count) = users::list(&state.db, scope, limit, offset).await?;
    Ok(Json(UserPage { users, total_count }))
}

/// POST /api/admin/users
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    AdminUser(user): AdminUser,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserIdentity>), ApiError> {
    if req.email.trim().is_empty() || req.password.is_empty() || req.role.trim().is_empty() {
        return Err(ApiError::bad_request("Email, password, and role are required."));
    }
    let role = parse_role(&req.role)?;
    if role == Role::Superadmin {
        return Err(ApiError::bad_request("Invalid role specified."));
    }

    if users::find_by_email(&state.db, &req.email).await?.is_some() {
        return Err(ApiError::Conflict("User with this email already exists.".to_string()));
    }

    let organization = if user.is_superadmin() {
        req.organization_id
    } else {
        user.organization_id
    };
    if let Some(org) = organization {
        if !organizations::exists(&state.db, org).await? {
            return Err(ApiError::not_found("Organization not found."));
        }
    }

    let hash = hash_password(&req.password).await?;
    let created = users::create(&state.db, &req.email, &hash, role, organization)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::Conflict("User with this email already exists.".to_string())
            } else {
                e.into()
            }
        })?;

    info!(user_id = created.id, role = %role, by = user.id, "User created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/admin/users/:id
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    AdminUser(user): AdminUser,
    ApiPath(id): ApiPath<i32>,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> Result<Json<UserIdentity>, ApiError> {
    if user.id == id {
        return Err(ApiError::forbidden("Cannot edit your own account via this endpoint."));
    }

    let password = req.password.filter(|p| !p.is_empty());
    let role = req
        .role
        .as_deref()
        .filter(|r| !r.trim().is_empty())
        .map(parse_role)
        .transpose()?;
    if password.is_none() && role.is_none() && req.organization_id.is_none() {
        return Err(ApiError::bad_request(
            "At least one field (password, role, organization) must be provided.",
        ));
    }

    let target = users::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found."))?;
    let target_role = target
        .role()
        .map_err(|e| ApiError::Internal(format!("Stored account is invalid: {e}")))?;

    check_admin_update(&user, target_role, target.organization_id, role, req.organization_id)?;

    let changes = UserChanges {
        password_hash: match password {
            Some(p) => Some(hash_password(&p).await?),
            None => None,
        },
        role,
        organization_id: req.organization_id,
    };

    let updated = users::update(&state.db, id, &changes)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                ApiError::not_found("Organization not found.")
            } else {
                e.into()
            }
        })?
        .ok_or_else(|| ApiError::not_found("User not found."))?;

    info!(user_id = id, by = user.id, "User updated");
    Ok(Json(updated))
}

/// Restrictions that apply when the caller is an admin rather than a
/// superadmin.
fn check_admin_update(
    caller: &AuthUser,
    target_role: Role,
    target_org: Option<Uuid>,
    new_role: Option<Role>,
    new_org: Option<Option<Uuid>>,
) -> Result<(), ApiError> {
    if caller.is_superadmin() {
        return Ok(());
    }
    if target_role == Role::Superadmin {
        return Err(ApiError::forbidden("Admins cannot edit superadmin accounts."));
    }
    if caller.organization_id.is_none() || target_org != caller.organization_id {
        return Err(ApiError::forbidden("You can only edit users within your own organization."));
    }
    if new_role == Some(Role::Superadmin) {
        return Err(ApiError::forbidden("Admins cannot grant the superadmin role."));
    }
    if matches!(new_org, Some(org) if org != caller.organization_id) {
        return Err(ApiError::forbidden("Admins cannot change a user's organization."));
    }
    Ok(())
}

/// DELETE /api/admin/users/:id
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    SuperadminUser(user): SuperadminUser,
    ApiPath(id): ApiPath<i32>,
) -> Result<StatusCode, ApiError> {
    if user.id == id {
        return Err(ApiError::forbidden("You cannot delete your own account."));
    }

    let target = users::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found."))?;
    if target.role == Role::Superadmin.as_str() {
        return Err(ApiError::forbidden("Cannot delete another superadmin account."));
    }

    users::delete(&state.db, id).await?;
    info!(user_id = id, by = user.id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}
