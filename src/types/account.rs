//! Roles, users and organizations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Account role, stored as lowercase TEXT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Superadmin,
    Admin,
    User,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Superadmin => "superadmin",
            Self::Admin => "admin",
            Self::User => "user",
        }
    }

    /// Admins and superadmins may manage accounts and projects.
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Superadmin | Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "superadmin" => Ok(Self::Superadmin),
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Full user row, including the password hash. Never serialized.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRecord {
    pub id: i32,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub organization_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    /// Parsed role; rows are constrained by a CHECK so this only fails on
    /// a schema mismatch.
    pub fn role(&self) -> Result<Role, UnknownRole> {
        self.role.parse()
    }
}

/// User as shown in admin listings.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserSummary {
    pub id: i32,
    pub email: String,
    pub role: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    pub organization_id: Option<Uuid>,
    #[serde(rename = "organizationName")]
    pub organization_name: Option<String>,
}

/// Minimal identity returned after create/update.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserIdentity {
    pub id: i32,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Organization {
    pub id: Uuid,
    pub name_th: String,
    pub name_en: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Organization with distinct member and project counts.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrganizationSummary {
    pub id: Uuid,
    pub name_th: String,
    pub name_en: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "userCount")]
    pub user_count: i64,
    #[serde(rename = "projectCount")]
    pub project_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_text() {
        for role in [Role::Superadmin, Role::Admin, Role::User] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_admin_capability() {
        assert!(Role::Superadmin.is_admin());
        assert!(Role::Admin.is_admin());
        assert!(!Role::User.is_admin());
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::Superadmin).unwrap();
        assert_eq!(json, "\"superadmin\"");
    }
}
