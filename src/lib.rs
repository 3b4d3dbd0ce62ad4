pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod gateway;
pub mod middleware;
pub mod models;
pub mod pagination;
pub mod rate_limit;
pub mod response;
pub mod routes;
pub mod state;
pub mod webhooks;

use std::sync::Arc;

use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::Router;
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::gateway::GatewayClient;
use crate::rate_limit::LoginRateLimiter;
use crate::state::{AppState, SharedState};
use crate::webhooks::HandlerRegistry;

pub fn build_state(pool: PgPool, config: Config) -> Result<SharedState, String> {
    let gateway = GatewayClient::new(&config.gateway)?;

    let webhook_handlers = HandlerRegistry::with_defaults();
    tracing::debug!("Webhook events handled: {:?}", webhook_handlers.events());

    if config.webhook_secret.is_none() {
        tracing::warn!("CHATDESK_WEBHOOK_SECRET not set; gateway webhooks are unauthenticated");
    }

    Ok(Arc::new(AppState {
        pool,
        config,
        gateway,
        webhook_handlers,
        login_limiter: LoginRateLimiter::new(),
    }))
}

pub fn build_router(state: SharedState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);
    let max_body_size = state.config.max_body_size;

    let router = Router::new()
        .merge(routes::api_routes())
        .merge(routes::webhook_routes())
        .route("/health", axum::routing::get(health))
        .layer(RequestBodyLimitLayer::new(max_body_size))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .with_state(state);

    let router = match cors {
        Some(cors) => router.layer(cors),
        None => router,
    };

    router.layer(TraceLayer::new_for_http())
}

pub fn build_app(pool: PgPool, config: Config) -> Result<Router, String> {
    build_state(pool, config).map(build_router)
}

/// Credentialed CORS for the configured frontend origins; none means same-origin only.
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{o}'");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(origins)
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
    )
}

async fn health() -> &'static str {
    "ok"
}
