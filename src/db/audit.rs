use sqlx::PgPool;
use uuid::Uuid;

use crate::models::AuditEvent;

/// A row about to be written to the audit trail.
#[derive(Debug)]
pub struct NewAuditEvent<'a> {
    pub organization_id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: &'a str,
    pub resource_type: &'a str,
    pub resource_id: Option<Uuid>,
    pub details: Option<serde_json::Value>,
}

pub async fn insert(pool: &PgPool, event: &NewAuditEvent<'_>) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO audit_events (organization_id, user_id, action, resource_type, resource_id, details)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(event.organization_id)
    .bind(event.user_id)
    .bind(event.action)
    .bind(event.resource_type)
    .bind(event.resource_id)
    .bind(&event.details)
    .execute(pool)
    .await?;
    Ok(())
}

/// Newest first, with the acting user's email. `action_prefix` narrows to e.g. `assignment.`.
pub async fn list(
    pool: &PgPool,
    organization_id: Uuid,
    action_prefix: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<AuditEvent>, sqlx::Error> {
    sqlx::query_as::<_, AuditEvent>(
        "SELECT e.id, e.user_id, u.email AS actor_email, e.action, e.resource_type,
                e.resource_id, e.details, e.created_at
         FROM audit_events e
         LEFT JOIN users u ON u.id = e.user_id
         WHERE e.organization_id = $1
           AND ($2::text IS NULL OR starts_with(e.action, $2))
         ORDER BY e.created_at DESC, e.id DESC
         LIMIT $3 OFFSET $4",
    )
    .bind(organization_id)
    .bind(action_prefix)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}
