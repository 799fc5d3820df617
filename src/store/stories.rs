//! `user_stories` queries

use crate::types::UserStory;
use sqlx::PgPool;
use uuid::Uuid;

pub async fn list_by_project(pool: &PgPool, project_id: Uuid) -> Result<Vec<UserStory>, sqlx::Error> {
    sqlx::query_as::<_, UserStory>(
        "SELECT id, project_id, feature_name, story_text, created_at FROM user_stories \
         WHERE project_id = $1 ORDER BY created_at DESC",
    )
    .bind(project_id)
    .fetch_all(pool)
    .await
}

pub async fn get(pool: &PgPool, id: Uuid) -> Result<Option<UserStory>, sqlx::Error> {
    sqlx::query_as::<_, UserStory>(
        "SELECT id, project_id, feature_name, story_text, created_at FROM user_stories WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn create(
    pool: &PgPool,
    project_id: Uuid,
    feature_name: &str,
    story_text: &str,
) -> Result<UserStory, sqlx::Error> {
    sqlx::query_as::<_, UserStory>(
        "INSERT INTO user_stories (project_id, feature_name, story_text) VALUES ($1, $2, $3) \
         RETURNING id, project_id, feature_name, story_text, created_at",
    )
    .bind(project_id)
    .bind(feature_name)
    .bind(story_text)
    .fetch_one(pool)
    .await
}

/// Replace the story text, and the feature name when given.
pub async fn update(
    pool: &PgPool,
    id: Uuid,
    story_text: &str,
    feature_name: Option<&str>,
) -> Result<Option<UserStory>, sqlx::Error> {
    sqlx::query_as::<_, UserStory>(
        "UPDATE user_stories SET story_text = $2, feature_name = COALESCE($3, feature_name) \
         WHERE id = $1 RETURNING id, project_id, feature_name, story_text, created_at",
    )
    .bind(id)
    .bind(story_text)
    .bind(feature_name)
    .fetch_optional(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<Option<UserStory>, sqlx::Error> {
    sqlx::query_as::<_, UserStory>(
        "DELETE FROM user_stories WHERE id = $1 \
         RETURNING id, project_id, feature_name, story_text, created_at",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}
