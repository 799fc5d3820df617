//! Request extractors for signed-in users

use super::jwt::token_from_headers;
use super::AuthError;
use crate::api::{ApiError, AppState};
use crate::types::Role;
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::sync::Arc;
use uuid::Uuid;

/// Any signed-in user, taken from the verified token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i32,
    pub email: String,
    pub role: Role,
    pub organization_id: Option<Uuid>,
}

impl AuthUser {
    pub fn is_superadmin(&self) -> bool {
        self.role == Role::Superadmin
    }

    /// Superadmins see everything; others only their own organization.
    pub fn can_access_organization(&self, organization: Option<Uuid>) -> bool {
        self.is_superadmin() || (self.organization_id.is_some() && self.organization_id == organization)
    }
}

/// Admin or superadmin.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

/// Superadmin only.
#[derive(Debug, Clone)]
pub struct SuperadminUser(pub AuthUser);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let token = token_from_headers(&parts.headers).ok_or(AuthError::MissingToken)?;
        let claims = state.signer.verify(&token)?;
        Ok(Self {
            id: claims.sub,
            email: claims.email,
            role: claims.role,
            organization_id: claims.organization_id,
        })
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role.is_admin() {
            Ok(Self(user))
        } else {
            Err(ApiError::Forbidden("Forbidden".to_string()))
        }
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for SuperadminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.is_superadmin() {
            Ok(Self(user))
        } else {
            Err(ApiError::Forbidden("Forbidden".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role, org: Option<Uuid>) -> AuthUser {
        AuthUser {
            id: 1,
            email: "u@example.com".into(),
            role,
            organization_id: org,
        }
    }

    #[test]
    fn test_organization_access() {
        let org = Uuid::new_v4();
        let other = Uuid::new_v4();

        assert!(user(Role::Superadmin, None).can_access_organization(Some(other)));
        assert!(user(Role::Superadmin, None).can_access_organization(None));
        assert!(user(Role::Admin, Some(org)).can_access_organization(Some(org)));
        assert!(!user(Role::Admin, Some(org)).can_access_organization(Some(other)));
        assert!(!user(Role::User, None).can_access_organization(None));
    }
}
