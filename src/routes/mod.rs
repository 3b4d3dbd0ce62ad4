pub mod assignments;
pub mod audit;
pub mod auth;
pub mod developers;
pub mod webhooks;
pub mod whatsapp;

use axum::routing::{delete, get, post};
use axum::Router;

use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        // Auth
        .route("/api/v1/auth/register", post(auth::register))
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/refresh", post(auth::refresh))
        .route("/api/v1/auth/logout", post(auth::logout))
        .route("/api/v1/auth/me", get(auth::me))
        .route("/api/v1/auth/change-password", post(auth::change_password))
        // Developers
        .route(
            "/api/v1/developers",
            get(developers::list).post(developers::create),
        )
        .route(
            "/api/v1/developers/{id}",
            get(developers::get).delete(developers::delete),
        )
        // Assignments
        .route(
            "/api/v1/assignments",
            get(assignments::list).post(assignments::create),
        )
        .route("/api/v1/assignments/mine", get(assignments::mine))
        .route(
            "/api/v1/assignments/{id}",
            delete(assignments::delete),
        )
        .route("/api/v1/assignments/{id}/unassign", post(assignments::unassign))
        .route("/api/v1/assignments/{id}/reassign", post(assignments::reassign))
        .route(
            "/api/v1/chats/{chat_id}/assignments",
            get(assignments::for_chat),
        )
        // WhatsApp gateway proxy
        .route(
            "/api/v1/whatsapp/sessions",
            get(whatsapp::list_sessions).post(whatsapp::start_session),
        )
        .route("/api/v1/whatsapp/sessions/{name}", get(whatsapp::get_session))
        .route(
            "/api/v1/whatsapp/sessions/{name}/stop",
            post(whatsapp::stop_session),
        )
        .route("/api/v1/whatsapp/sessions/{name}/qr", get(whatsapp::qr_code))
        .route(
            "/api/v1/whatsapp/sessions/{name}/chats",
            get(whatsapp::list_chats),
        )
        .route(
            "/api/v1/whatsapp/sessions/{name}/chats/{chat_id}/messages",
            get(whatsapp::list_messages).post(whatsapp::send_message),
        )
        .route(
            "/api/v1/whatsapp/sessions/{name}/chats/{chat_id}/seen",
            post(whatsapp::mark_seen),
        )
        // Audit
        .route("/api/v1/audit", get(audit::list))
}

pub fn webhook_routes() -> Router<SharedState> {
    Router::new().route("/api/v1/webhooks/gateway", post(webhooks::gateway_event))
}
