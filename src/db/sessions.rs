use sqlx::PgPool;
use uuid::Uuid;

use crate::models::WhatsAppSession;

/// Gateway status that marks a session as usable.
pub const STATUS_WORKING: &str = "WORKING";

pub async fn upsert_status(
    pool: &PgPool,
    session_id: &str,
    status: &str,
) -> Result<WhatsAppSession, sqlx::Error> {
    sqlx::query_as::<_, WhatsAppSession>(
        "INSERT INTO whatsapp_sessions (session_id, status, is_active)
         VALUES ($1, $2, $3)
         ON CONFLICT (session_id) DO UPDATE
            SET status = EXCLUDED.status, is_active = EXCLUDED.is_active, updated_at = now()
         RETURNING *",
    )
    .bind(session_id)
    .bind(status)
    .bind(status == STATUS_WORKING)
    .fetch_one(pool)
    .await
}

/// Registers a session started by a user. The owner is only set on first sight.
pub async fn upsert_owned(
    pool: &PgPool,
    session_id: &str,
    user_id: Uuid,
    status: &str,
) -> Result<WhatsAppSession, sqlx::Error> {
    sqlx::query_as::<_, WhatsAppSession>(
        "INSERT INTO whatsapp_sessions (session_id, user_id, status, is_active)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (session_id) DO UPDATE
            SET user_id = COALESCE(whatsapp_sessions.user_id, EXCLUDED.user_id),
                status = EXCLUDED.status,
                is_active = EXCLUDED.is_active,
                updated_at = now()
         RETURNING *",
    )
    .bind(session_id)
    .bind(user_id)
    .bind(status)
    .bind(status == STATUS_WORKING)
    .fetch_one(pool)
    .await
}

pub async fn find_by_session_id(
    pool: &PgPool,
    session_id: &str,
) -> Result<Option<WhatsAppSession>, sqlx::Error> {
    sqlx::query_as::<_, WhatsAppSession>("SELECT * FROM whatsapp_sessions WHERE session_id = $1")
        .bind(session_id)
        .fetch_optional(pool)
        .await
}

pub async fn list(pool: &PgPool) -> Result<Vec<WhatsAppSession>, sqlx::Error> {
    sqlx::query_as::<_, WhatsAppSession>("SELECT * FROM whatsapp_sessions ORDER BY session_id")
        .fetch_all(pool)
        .await
}
