use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{AssignmentWithDeveloper, ChatAssignment};

const WITH_DEVELOPER_SELECT: &str = "SELECT a.id, a.developer_id, u.name AS developer_name,
        u.email AS developer_email, a.chat_id, a.chat_name, a.session_id, a.assigned_at,
        a.is_active, a.unassigned_at, a.last_message_at
     FROM chat_assignments a
     JOIN developers d ON d.id = a.developer_id
     JOIN users u ON u.id = d.user_id";

pub struct ListFilter {
    pub organization_id: Uuid,
    pub session_id: Option<String>,
    pub chat_id: Option<String>,
    pub active: Option<bool>,
}

pub async fn find_by_id<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    organization_id: Uuid,
) -> Result<Option<ChatAssignment>, sqlx::Error> {
    sqlx::query_as::<_, ChatAssignment>(
        "SELECT a.* FROM chat_assignments a
         JOIN developers d ON d.id = a.developer_id
         WHERE a.id = $1 AND d.organization_id = $2",
    )
    .bind(id)
    .bind(organization_id)
    .fetch_optional(executor)
    .await
}

pub async fn find_for_developer<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    developer_id: Uuid,
    session_id: &str,
    chat_id: &str,
) -> Result<Option<ChatAssignment>, sqlx::Error> {
    sqlx::query_as::<_, ChatAssignment>(
        "SELECT * FROM chat_assignments
         WHERE developer_id = $1 AND session_id = $2 AND chat_id = $3",
    )
    .bind(developer_id)
    .bind(session_id)
    .bind(chat_id)
    .fetch_optional(executor)
    .await
}

pub async fn insert<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    developer_id: Uuid,
    session_id: &str,
    chat_id: &str,
    chat_name: Option<&str>,
) -> Result<ChatAssignment, sqlx::Error> {
    sqlx::query_as::<_, ChatAssignment>(
        "INSERT INTO chat_assignments (developer_id, session_id, chat_id, chat_name)
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(developer_id)
    .bind(session_id)
    .bind(chat_id)
    .bind(chat_name)
    .fetch_one(executor)
    .await
}

/// Turns an inactive row back on, refreshing its assignment time.
pub async fn reactivate<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    chat_name: Option<&str>,
) -> Result<ChatAssignment, sqlx::Error> {
    sqlx::query_as::<_, ChatAssignment>(
        "UPDATE chat_assignments
            SET is_active = true, unassigned_at = NULL, assigned_at = now(),
                chat_name = COALESCE($2, chat_name)
          WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(chat_name)
    .fetch_one(executor)
    .await
}

pub async fn deactivate<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
) -> Result<ChatAssignment, sqlx::Error> {
    sqlx::query_as::<_, ChatAssignment>(
        "UPDATE chat_assignments SET is_active = false, unassigned_at = now()
          WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .fetch_one(executor)
    .await
}

/// Deactivates every active row for the chat except those held by `keep`.
pub async fn deactivate_others<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    session_id: &str,
    chat_id: &str,
    keep: &[Uuid],
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE chat_assignments SET is_active = false, unassigned_at = now()
          WHERE session_id = $1 AND chat_id = $2 AND is_active
            AND NOT (developer_id = ANY($3))",
    )
    .bind(session_id)
    .bind(chat_id)
    .bind(keep)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM chat_assignments WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn list(
    pool: &PgPool,
    filter: &ListFilter,
) -> Result<Vec<AssignmentWithDeveloper>, sqlx::Error> {
    sqlx::query_as::<_, AssignmentWithDeveloper>(&format!(
        "{WITH_DEVELOPER_SELECT}
         WHERE d.organization_id = $1
           AND ($2::text IS NULL OR a.session_id = $2)
           AND ($3::text IS NULL OR a.chat_id = $3)
           AND ($4::bool IS NULL OR a.is_active = $4)
         ORDER BY a.assigned_at DESC"
    ))
    .bind(filter.organization_id)
    .bind(filter.session_id.as_deref())
    .bind(filter.chat_id.as_deref())
    .bind(filter.active)
    .fetch_all(pool)
    .await
}

/// Active assignments of one developer, most recent activity first.
pub async fn list_active_for_developer(
    pool: &PgPool,
    developer_id: Uuid,
    session_id: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<ChatAssignment>, sqlx::Error> {
    sqlx::query_as::<_, ChatAssignment>(
        "SELECT * FROM chat_assignments
          WHERE developer_id = $1 AND is_active
            AND ($2::text IS NULL OR session_id = $2)
          ORDER BY COALESCE(last_message_at, assigned_at) DESC, id
          LIMIT $3 OFFSET $4",
    )
    .bind(developer_id)
    .bind(session_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn is_assigned(
    pool: &PgPool,
    developer_id: Uuid,
    session_id: &str,
    chat_id: &str,
) -> Result<bool, sqlx::Error> {
    let row: (bool,) = sqlx::query_as(
        "SELECT EXISTS (
            SELECT 1 FROM chat_assignments
             WHERE developer_id = $1 AND session_id = $2 AND chat_id = $3 AND is_active
         )",
    )
    .bind(developer_id)
    .bind(session_id)
    .bind(chat_id)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

pub async fn touch_last_message(
    pool: &PgPool,
    session_id: &str,
    chat_id: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE chat_assignments SET last_message_at = now()
          WHERE session_id = $1 AND chat_id = $2 AND is_active",
    )
    .bind(session_id)
    .bind(chat_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
