use async_trait::async_trait;
use serde_json::json;
use sqlx::PgPool;

use super::{EventHandler, GatewayEvent, HandlerError};
use crate::db;

/// Mirrors `session.status` events into the session registry.
pub struct SessionStatusHandler;

#[async_trait]
impl EventHandler for SessionStatusHandler {
    fn events(&self) -> &[&'static str] {
        &["session.status"]
    }

    async fn handle(
        &self,
        pool: &PgPool,
        event: &GatewayEvent,
    ) -> Result<serde_json::Value, HandlerError> {
        let status = event
            .payload
            .get("status")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| HandlerError::from("payload.status is required"))?;

        let session = db::sessions::upsert_status(pool, &event.session, status).await?;

        tracing::info!(
            session = %session.session_id,
            status = %session.status,
            "Session status updated"
        );

        Ok(json!({
            "session_id": session.session_id,
            "status": session.status,
            "is_active": session.is_active,
        }))
    }
}
