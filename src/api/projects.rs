//! Project handlers
//!
//! Visibility: superadmins see every project; admins and users only the
//! projects of their own organization. Only admins may write.

use super::{ApiError, ApiJson, ApiPath, AppState};
use crate::auth::{AdminUser, AuthUser};
use crate::store::dashboard::{self, ProjectDashboard};
use crate::store::{is_foreign_key_violation, projects};
use crate::types::{Project, ProjectFields, ProjectListing};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ProjectRequest {
    #[serde(default)]
    pub name_th: String,
    #[serde(default)]
    pub name_en: String,
    #[serde(default)]
    pub description: Option<String>,
    pub duration_months: Option<f64>,
    /// Honoured for superadmins only
    #[serde(default)]
    pub organization_id: Option<Uuid>,
}

impl ProjectRequest {
    fn fields(&self) -> Result<ProjectFields, ApiError> {
        let duration = self.duration_months.filter(|d| d.is_finite());
        match duration {
            Some(d) if !self.name_th.trim().is_empty() && !self.name_en.trim().is_empty() => {
                if d < 0.0 {
                    return Err(ApiError::bad_request("duration_months must not be negative."));
                }
                Ok(ProjectFields {
                    name_th: self.name_th.trim().to_string(),
                    name_en: self.name_en.trim().to_string(),
                    description: self.description.clone().unwrap_or_default(),
                    duration_months: d,
                })
            }
            _ => Err(ApiError::bad_request(
                "Missing required fields: name_th, name_en, duration_months",
            )),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedProject {
    pub message: &'static str,
    pub deleted_record: Project,
}

/// Load a project the caller may see, or 404.
///
/// Projects outside the caller's organization are reported as missing so
/// their existence is not revealed.
pub(crate) async fn visible_project(pool: &PgPool, user: &AuthUser, id: Uuid) -> Result<Project, ApiError> {
    projects::get(pool, id)
        .await?
        .filter(|p| user.can_access_organization(p.organization_id))
        .ok_or_else(|| ApiError::not_found("Project not found."))
}

/// GET /api/projects
pub async fn list_projects(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<Vec<ProjectListing>>, ApiError> {
    let scope = if user.is_superadmin() {
        None
    } else {
        Some(user.organization_id.ok_or_else(|| {
            ApiError::forbidden("Forbidden: Admins and Users must belong to an organization to view projects.")
        })?)
    };
    Ok(Json(projects::list(&state.db, scope).await?))
}

/// POST /api/projects
pub async fn create_project(
    State(state): State<Arc<AppState>>,
    AdminUser(user): AdminUser,
    ApiJson(req): ApiJson<ProjectRequest>,
) -> Result<(StatusCode, Json<Project>), ApiError> {
    let fields = req.fields()?;
    let organization = if user.is_superadmin() {
        req.organization_id
    } else {
        user.organization_id
    };

    let project = projects::create(&state.db, &fields, organization)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                ApiError::not_found("Organization not found.")
            } else {
                e.into()
            }
        })?;

    info!(project_id = %project.id, by = user.id, "Project created");
    Ok((StatusCode::CREATED, Json(project)))
}

/// GET /api/projects/:id
pub async fn get_project(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Project>, ApiError> {
    Ok(Json(visible_project(&state.db, &user, id).await?))
}

/// PUT /api/projects/:id
pub async fn update_project(
    State(state): State<Arc<AppState>>,
    AdminUser(user): AdminUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<ProjectRequest>,
) -> Result<Json<Project>, ApiError> {
    let fields = req.fields()?;
    visible_project(&state.db, &user, id).await?;

    let project = projects::update(&state.db, id, &fields)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found."))?;
    info!(project_id = %id, by = user.id, "Project updated");
    Ok(Json(project))
}

/// DELETE /api/projects/:id
pub async fn delete_project(
    State(state): State<Arc<AppState>>,
    AdminUser(user): AdminUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<DeletedProject>, ApiError> {
    visible_project(&state.db, &user, id).await?;

    let deleted = projects::delete(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found."))?;
    info!(project_id = %id, by = user.id, "Project deleted");
    Ok(Json(DeletedProject {
        message: "Project deleted successfully.",
        deleted_record: deleted,
    }))
}

/// GET /api/projects/:id/dashboard
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ProjectDashboard>, ApiError> {
    visible_project(&state.db, &user, id).await?;
    Ok(Json(dashboard::project_dashboard(&state.db, id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(duration: Option<f64>) -> ProjectRequest {
        ProjectRequest {
            name_th: "โครงการ".into(),
            name_en: "Project".into(),
            description: None,
            duration_months: duration,
            organization_id: None,
        }
    }

    #[test]
    fn test_fields_require_names_and_duration() {
        let fields = request(Some(6.0)).fields().unwrap();
        assert_eq!(fields.duration_months, 6.0);
        assert_eq!(fields.description, "");

        assert!(request(None).fields().is_err());
        assert!(request(Some(f64::NAN)).fields().is_err());
        assert!(request(Some(-1.0)).fields().is_err());

        let mut blank = request(Some(1.0));
        blank.name_en = "  ".into();
        assert!(blank.fields().is_err());
    }

    #[test]
    fn test_zero_duration_is_accepted() {
        assert!(request(Some(0.0)).fields().is_ok());
    }
}
