//! `users` queries

use crate::types::{Role, UserIdentity, UserRecord, UserSummary};
use sqlx::PgPool;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, email, password_hash, role, organization_id, created_at";

/// Partial update of an account. `None` leaves a column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub password_hash: Option<String>,
    pub role: Option<Role>,
    /// `Some(None)` clears the organization
    pub organization_id: Option<Option<Uuid>>,
}

/// Emails are stored lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRecord>, sqlx::Error> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
    sqlx::query_as::<_, UserRecord>(&sql)
        .bind(normalize_email(email))
        .fetch_optional(pool)
        .await
}

pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<UserRecord>, sqlx::Error> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    sqlx::query_as::<_, UserRecord>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// One page of users plus the total matching count.
///
/// With `organization` set the listing is limited to that organization and
/// never includes superadmins.
pub async fn list(
    pool: &PgPool,
    organization: Option<Uuid>,
    limit: i64,
    offset: i64,
) -> Result<(Vec<UserSummary>, i64), sqlx::Error> {
    const SCOPE: &str = "($1::uuid IS NULL OR (u.organization_id = $1 AND u.role <> 'superadmin'))";

    let page_sql = format!(
        "SELECT u.id, u.email, u.role, u.created_at, u.organization_id, o.name_en AS organization_name \
         FROM users u \
         LEFT JOIN organizations o ON o.id = u.organization_id \
         WHERE {SCOPE} \
         ORDER BY u.created_at DESC \
         LIMIT $2 OFFSET $3"
    );
    let users = sqlx::query_as::<_, UserSummary>(&page_sql)
        .bind(organization)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    let count_sql = format!("SELECT COUNT(*) FROM users u WHERE {SCOPE}");
    let total: i64 = sqlx::query_scalar(&count_sql)
        .bind(organization)
        .fetch_one(pool)
        .await?;

    Ok((users, total))
}

pub async fn create(
    pool: &PgPool,
    email: &str,
    password_hash: &str,
    role: Role,
    organization: Option<Uuid>,
) -> Result<UserIdentity, sqlx::Error> {
    sqlx::query_as::<_, UserIdentity>(
        "INSERT INTO users (email, password_hash, role, organization_id) VALUES ($1, $2, $3, $4) \
         RETURNING id, email, role",
    )
    .bind(normalize_email(email))
    .bind(password_hash)
    .bind(role.as_str())
    .bind(organization)
    .fetch_one(pool)
    .await
}

pub async fn update(pool: &PgPool, id: i32, changes: &UserChanges) -> Result<Option<UserIdentity>, sqlx::Error> {
    sqlx::query_as::<_, UserIdentity>(
        "UPDATE users SET \
           password_hash = COALESCE($2, password_hash), \
           role = COALESCE($3, role), \
           organization_id = CASE WHEN $4 THEN $5 ELSE organization_id END \
         WHERE id = $1 RETURNING id, email, role",
    )
    .bind(id)
    .bind(changes.password_hash.as_deref())
    .bind(changes.role.map(Role::as_str))
    .bind(changes.organization_id.is_some())
    .bind(changes.organization_id.flatten())
    .fetch_optional(pool)
    .await
}

pub async fn update_password(pool: &PgPool, id: i32, password_hash: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete(pool: &PgPool, id: i32) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Create the account or reset it to superadmin with the given password.
pub async fn upsert_superadmin(
    pool: &PgPool,
    email: &str,
    password_hash: &str,
) -> Result<UserIdentity, sqlx::Error> {
    sqlx::query_as::<_, UserIdentity>(
        "INSERT INTO users (email, password_hash, role) VALUES ($1, $2, 'superadmin') \
         ON CONFLICT (email) DO UPDATE SET password_hash = EXCLUDED.password_hash, role = 'superadmin' \
         RETURNING id, email, role",
    )
    .bind(normalize_email(email))
    .bind(password_hash)
    .fetch_one(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }
}
