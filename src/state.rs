use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::gateway::GatewayClient;
use crate::rate_limit::LoginRateLimiter;
use crate::webhooks::HandlerRegistry;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub gateway: GatewayClient,
    pub webhook_handlers: HandlerRegistry,
    pub login_limiter: LoginRateLimiter,
}
