use async_trait::async_trait;
use serde_json::json;
use sqlx::PgPool;

use super::{EventHandler, GatewayEvent, HandlerError};
use crate::db;

/// Records chat activity on active assignments so developer inboxes sort by recency.
pub struct MessageHandler;

/// The remote chat of a message: the sender for inbound, the recipient for outbound.
pub fn chat_of(payload: &serde_json::Value) -> Option<&str> {
    let from_me = payload
        .get("fromMe")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let key = if from_me { "to" } else { "from" };
    payload
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
}

#[async_trait]
impl EventHandler for MessageHandler {
    fn events(&self) -> &[&'static str] {
        &["message", "message.any"]
    }

    async fn handle(
        &self,
        pool: &PgPool,
        event: &GatewayEvent,
    ) -> Result<serde_json::Value, HandlerError> {
        let chat_id = chat_of(&event.payload)
            .ok_or_else(|| HandlerError::from("payload.from is required"))?;

        let touched = db::assignments::touch_last_message(pool, &event.session, chat_id).await?;

        tracing::debug!(
            session = %event.session,
            chat = %chat_id,
            touched,
            "Recorded chat activity"
        );

        Ok(json!({ "chat_id": chat_id, "assignments_touched": touched }))
    }
}
