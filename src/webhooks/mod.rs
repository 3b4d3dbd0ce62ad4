pub mod message;
pub mod session_status;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use sqlx::PgPool;

/// Envelope of every event the gateway pushes to us.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayEvent {
    pub event: String,
    pub session: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Debug)]
pub enum HandlerError {
    /// The event payload is missing something the handler needs.
    Invalid(String),
    Database(sqlx::Error),
}

impl std::fmt::Display for HandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandlerError::Invalid(msg) => write!(f, "{msg}"),
            HandlerError::Database(err) => write!(f, "database error: {err}"),
        }
    }
}

impl From<&str> for HandlerError {
    fn from(s: &str) -> Self {
        HandlerError::Invalid(s.to_string())
    }
}

impl From<sqlx::Error> for HandlerError {
    fn from(err: sqlx::Error) -> Self {
        HandlerError::Database(err)
    }
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Event names this handler consumes.
    fn events(&self) -> &[&'static str];

    async fn handle(
        &self,
        pool: &PgPool,
        event: &GatewayEvent,
    ) -> Result<serde_json::Value, HandlerError>;
}

pub struct HandlerRegistry {
    handlers: HashMap<&'static str, Arc<dyn EventHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registry with every built-in handler.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(session_status::SessionStatusHandler));
        registry.register(Arc::new(message::MessageHandler));
        registry
    }

    pub fn register(&mut self, handler: Arc<dyn EventHandler>) {
        for event in handler.events() {
            self.handlers.insert(*event, handler.clone());
        }
    }

    pub fn get(&self, event: &str) -> Option<&Arc<dyn EventHandler>> {
        self.handlers.get(event)
    }

    pub fn events(&self) -> Vec<&'static str> {
        let mut events: Vec<_> = self.handlers.keys().copied().collect();
        events.sort_unstable();
        events
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
