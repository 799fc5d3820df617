//! Organization administration handlers

use super::{ApiError, ApiJson, ApiPath, AppState};
use crate::auth::{AdminUser, SuperadminUser};
use crate::store::organizations::{self, OrganizationMember};
use crate::store::projects;
use crate::types::{Organization, OrganizationSummary, Project};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct OrganizationRequest {
    #[serde(default)]
    pub name_th: String,
    #[serde(default)]
    pub name_en: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl OrganizationRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if self.name_th.trim().is_empty() || self.name_en.trim().is_empty() {
            return Err(ApiError::bad_request("Thai and English names are required."));
        }
        Ok(())
    }

    fn description(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
pub struct OrganizationDetail {
    pub organization: Organization,
    pub users: Vec<OrganizationMember>,
    pub projects: Vec<Project>,
}

/// GET /api/admin/organizations
pub async fn list_organizations(
    State(state): State<Arc<AppState>>,
    _admin: SuperadminUser,
) -> Result<Json<Vec<OrganizationSummary>>, ApiError> {
    Ok(Json(organizations::list_with_counts(&state.db).await?))
}

/// POST /api/admin/organizations
pub async fn create_organization(
    State(state): State<Arc<AppState>>,
    SuperadminUser(user): SuperadminUser,
    ApiJson(req): ApiJson<OrganizationRequest>,
) -> Result<(StatusCode, Json<Organization>), ApiError> {
    req.validate()?;
    let org = organizations::create(&state.db, req.name_th.trim(), req.name_en.trim(), req.description()).await?;
    info!(org_id = %org.id, by = user.id, "Organization created");
    Ok((StatusCode::CREATED, Json(org)))
}

/// GET /api/admin/organizations/:id
pub async fn get_organization(
    State(state): State<Arc<AppState>>,
    AdminUser(user): AdminUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<OrganizationDetail>, ApiError> {
    if !user.can_access_organization(Some(id)) {
        return Err(ApiError::forbidden("Forbidden: You can only view your own organization."));
    }

    let organization = organizations::get(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Organization not found."))?;
    let (users, projects) = tokio::try_join!(
        organizations::members(&state.db, id),
        projects::list_for_organization(&state.db, id),
    )?;

    Ok(Json(OrganizationDetail {
        organization,
        users,
        projects,
    }))
}

/// PUT /api/admin/organizations/:id
pub async fn update_organization(
    State(state): State<Arc<AppState>>,
    AdminUser(user): AdminUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<OrganizationRequest>,
) -> Result<Json<Organization>, ApiError> {
    if !user.can_access_organization(Some(id)) {
        return Err(ApiError::forbidden("Forbidden: You can only edit your own organization."));
    }
    req.validate()?;

    let org = organizations::update(&state.db, id, req.name_th.trim(), req.name_en.trim(), req.description())
        .await?
        .ok_or_else(|| ApiError::not_found("Organization not found."))?;
    info!(org_id = %id, by = user.id, "Organization updated");
    Ok(Json(org))
}

/// DELETE /api/admin/organizations/:id
pub async fn delete_organization(
    State(state): State<Arc<AppState>>,
    SuperadminUser(user): SuperadminUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !organizations::delete(&state.db, id).await? {
        return Err(ApiError::not_found("Organization not found."));
    }
    info!(org_id = %id, by = user.id, "Organization deleted");
    Ok(StatusCode::NO_CONTENT)
}
