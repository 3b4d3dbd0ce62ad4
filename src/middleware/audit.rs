use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::db::audit::NewAuditEvent;

/// Appends to the audit trail. A failed write is logged and never fails the request.
pub async fn write(pool: &PgPool, event: NewAuditEvent<'_>) {
    if let Err(e) = crate::db::audit::insert(pool, &event).await {
        tracing::error!(action = %event.action, "Failed to write audit event: {e}");
    }
}

/// Audit an action performed by the authenticated caller.
pub async fn record(
    pool: &PgPool,
    auth: &AuthUser,
    action: &str,
    resource_type: &str,
    resource_id: Option<Uuid>,
    details: Option<serde_json::Value>,
) {
    write(
        pool,
        NewAuditEvent {
            organization_id: auth.organization_id,
            user_id: Some(auth.user_id),
            action,
            resource_type,
            resource_id,
            details,
        },
    )
    .await;
}
