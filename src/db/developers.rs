use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Developer, DeveloperProfile};

const PROFILE_SELECT: &str = "SELECT d.id, d.user_id, d.organization_id, u.name, u.email,
        (SELECT COUNT(*) FROM chat_assignments a
          WHERE a.developer_id = d.id AND a.is_active) AS active_assignments,
        d.created_at
     FROM developers d
     JOIN users u ON u.id = d.user_id";

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
    organization_id: Uuid,
) -> Result<Developer, sqlx::Error> {
    sqlx::query_as::<_, Developer>(
        "INSERT INTO developers (user_id, organization_id) VALUES ($1, $2) RETURNING *",
    )
    .bind(user_id)
    .bind(organization_id)
    .fetch_one(executor)
    .await
}

pub async fn find_by_user_id(pool: &PgPool, user_id: Uuid) -> Result<Option<Developer>, sqlx::Error> {
    sqlx::query_as::<_, Developer>("SELECT * FROM developers WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_id<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    organization_id: Uuid,
) -> Result<Option<Developer>, sqlx::Error> {
    sqlx::query_as::<_, Developer>(
        "SELECT * FROM developers WHERE id = $1 AND organization_id = $2",
    )
    .bind(id)
    .bind(organization_id)
    .fetch_optional(executor)
    .await
}

pub async fn find_profile(
    pool: &PgPool,
    id: Uuid,
    organization_id: Uuid,
) -> Result<Option<DeveloperProfile>, sqlx::Error> {
    sqlx::query_as::<_, DeveloperProfile>(&format!(
        "{PROFILE_SELECT} WHERE d.id = $1 AND d.organization_id = $2"
    ))
    .bind(id)
    .bind(organization_id)
    .fetch_optional(pool)
    .await
}

pub async fn list_profiles(
    pool: &PgPool,
    organization_id: Uuid,
) -> Result<Vec<DeveloperProfile>, sqlx::Error> {
    sqlx::query_as::<_, DeveloperProfile>(&format!(
        "{PROFILE_SELECT} WHERE d.organization_id = $1 ORDER BY u.name"
    ))
    .bind(organization_id)
    .fetch_all(pool)
    .await
}

/// Count of the given ids that are developers of the organization.
pub async fn count_in_organization<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    ids: &[Uuid],
    organization_id: Uuid,
) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM developers WHERE id = ANY($1) AND organization_id = $2",
    )
    .bind(ids)
    .bind(organization_id)
    .fetch_one(executor)
    .await?;
    Ok(row.0)
}
