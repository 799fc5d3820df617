//! PostgreSQL queries
//!
//! Free async functions over `&PgPool`, one module per table. Functions
//! return `sqlx::Error` and leave HTTP mapping to the API layer; lookups of
//! a single row return `Option` instead of treating absence as an error.

pub mod dashboard;
pub mod history;
pub mod organizations;
pub mod projects;
pub mod stories;
pub mod users;

pub use history::PgReferenceStore;

/// True when `err` is a unique-constraint violation.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// True when `err` is a foreign-key violation (e.g. unknown organization id).
pub fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}
