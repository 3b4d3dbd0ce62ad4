use std::collections::HashMap;

use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::extract::{Json, Path, Query};
use crate::gateway::ids::{is_valid_chat_id, is_valid_session_name};
use crate::gateway::types::{ChatSummary, LastMessage, Me, Message, QrCode};
use crate::middleware::audit;
use crate::models::{ChatAssignment, WhatsAppSession};
use crate::pagination::{Page, PageParams};
use crate::response::ApiResponse;
use crate::state::SharedState;

/// WhatsApp caps text messages well above this; we keep replies short.
const MAX_TEXT_LEN: usize = 4096;

#[derive(Deserialize)]
pub struct StartSession {
    pub name: String,
}

#[derive(Deserialize)]
pub struct SendMessage {
    pub text: String,
    pub reply_to: Option<String>,
}

/// Gateway session merged with its registry row.
#[derive(Serialize)]
pub struct SessionView {
    pub name: String,
    pub status: String,
    pub me: Option<Me>,
    pub is_active: bool,
    pub known: bool,
    pub on_gateway: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

impl SessionView {
    fn merge(name: String, status: String, me: Option<Me>, row: Option<&WhatsAppSession>) -> Self {
        SessionView {
            is_active: row.map_or(status == db::sessions::STATUS_WORKING, |r| r.is_active),
            known: row.is_some(),
            on_gateway: true,
            updated_at: row.map(|r| r.updated_at),
            name,
            status,
            me,
        }
    }
}

/// One inbox row. Admins see gateway chats, developers see their assignments.
#[derive(Serialize)]
pub struct InboxChat {
    pub id: String,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub last_message: Option<LastMessage>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub last_message_at: Option<DateTime<Utc>>,
}

impl From<ChatSummary> for InboxChat {
    fn from(chat: ChatSummary) -> Self {
        InboxChat {
            id: chat.id,
            name: chat.name,
            picture: chat.picture,
            last_message: chat.last_message,
            assigned_at: None,
            last_message_at: None,
        }
    }
}

impl From<ChatAssignment> for InboxChat {
    fn from(a: ChatAssignment) -> Self {
        InboxChat {
            id: a.chat_id,
            name: a.chat_name,
            picture: None,
            last_message: None,
            assigned_at: Some(a.assigned_at),
            last_message_at: a.last_message_at,
        }
    }
}

fn check_session_name(name: &str) -> Result<(), AppError> {
    if is_valid_session_name(name) {
        Ok(())
    } else {
        Err(AppError::BadRequest("Invalid session name".to_string()))
    }
}

/// Admins may touch any chat; developers only chats actively assigned to them.
async fn authorize_chat(
    state: &SharedState,
    auth: &AuthUser,
    session: &str,
    chat_id: &str,
) -> Result<(), AppError> {
    check_session_name(session)?;
    if !is_valid_chat_id(chat_id) {
        return Err(AppError::BadRequest("Invalid chat_id".to_string()));
    }
    if auth.is_admin() {
        return Ok(());
    }

    let developer_id = auth.require_developer()?;
    if db::assignments::is_assigned(&state.pool, developer_id, session, chat_id).await? {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Chat is not assigned to you".to_string(),
        ))
    }
}

pub async fn list_sessions(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<ApiResponse<Vec<SessionView>>, AppError> {
    auth.require_admin()?;

    let remote = state.gateway.list_sessions().await?;
    let mut registry: HashMap<String, WhatsAppSession> = db::sessions::list(&state.pool)
        .await?
        .into_iter()
        .map(|s| (s.session_id.clone(), s))
        .collect();

    let mut views: Vec<SessionView> = remote
        .into_iter()
        .map(|s| {
            let row = registry.remove(&s.name);
            SessionView::merge(s.name, s.status, s.me, row.as_ref())
        })
        .collect();

    // Registry rows the gateway no longer reports
    let mut stale: Vec<SessionView> = registry
        .into_values()
        .map(|row| SessionView {
            name: row.session_id,
            status: row.status,
            me: None,
            is_active: false,
            known: true,
            on_gateway: false,
            updated_at: Some(row.updated_at),
        })
        .collect();
    stale.sort_by(|a, b| a.name.cmp(&b.name));
    views.extend(stale);

    Ok(ApiResponse::ok(views))
}

pub async fn get_session(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<ApiResponse<SessionView>, AppError> {
    auth.require_admin()?;
    check_session_name(&name)?;

    let remote = state.gateway.get_session(&name).await?;
    let row = db::sessions::find_by_session_id(&state.pool, &name).await?;
    Ok(ApiResponse::ok(SessionView::merge(
        remote.name,
        remote.status,
        remote.me,
        row.as_ref(),
    )))
}

pub async fn start_session(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<StartSession>,
) -> Result<ApiResponse<WhatsAppSession>, AppError> {
    auth.require_admin()?;
    let name = req.name.trim();
    check_session_name(name)?;

    let remote = state.gateway.start_session(name).await?;
    let session =
        db::sessions::upsert_owned(&state.pool, &remote.name, auth.user_id, &remote.status)
            .await?;

    tracing::info!(session = %session.session_id, status = %session.status, "Session started");

    audit::record(
        &state.pool,
        &auth,
        "session.started",
        "whatsapp_session",
        Some(session.id),
        Some(json!({ "session_id": session.session_id })),
    )
    .await;

    Ok(ApiResponse::created(session))
}

pub async fn stop_session(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<ApiResponse<WhatsAppSession>, AppError> {
    auth.require_admin()?;
    check_session_name(&name)?;

    state.gateway.stop_session(&name).await?;
    let session = db::sessions::upsert_status(&state.pool, &name, "STOPPED").await?;

    audit::record(
        &state.pool,
        &auth,
        "session.stopped",
        "whatsapp_session",
        Some(session.id),
        Some(json!({ "session_id": session.session_id })),
    )
    .await;

    Ok(ApiResponse::ok(session))
}

pub async fn qr_code(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<ApiResponse<QrCode>, AppError> {
    auth.require_admin()?;
    check_session_name(&name)?;
    let qr = state.gateway.qr_code(&name).await?;
    Ok(ApiResponse::ok(qr))
}

pub async fn list_chats(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(session): Path<String>,
    Query(page): Query<PageParams>,
) -> Result<ApiResponse<Page<InboxChat>>, AppError> {
    check_session_name(&session)?;

    let chats: Vec<InboxChat> = if auth.is_admin() {
        state
            .gateway
            .list_chats(&session, page.fetch_limit(), page.offset())
            .await?
            .into_iter()
            .map(InboxChat::from)
            .collect()
    } else {
        let developer_id = auth.require_developer()?;
        db::assignments::list_active_for_developer(
            &state.pool,
            developer_id,
            Some(&session),
            page.fetch_limit(),
            page.offset(),
        )
        .await?
        .into_iter()
        .map(InboxChat::from)
        .collect()
    };

    Ok(ApiResponse::ok(Page::from_probe(chats, &page)))
}

pub async fn list_messages(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path((session, chat_id)): Path<(String, String)>,
    Query(page): Query<PageParams>,
) -> Result<ApiResponse<Page<Message>>, AppError> {
    authorize_chat(&state, &auth, &session, &chat_id).await?;

    let messages = state
        .gateway
        .list_messages(&session, &chat_id, page.fetch_limit(), page.offset())
        .await?;

    Ok(ApiResponse::ok(Page::from_probe(messages, &page)))
}

pub async fn send_message(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path((session, chat_id)): Path<(String, String)>,
    Json(req): Json<SendMessage>,
) -> Result<ApiResponse<Message>, AppError> {
    authorize_chat(&state, &auth, &session, &chat_id).await?;

    let text = req.text.trim();
    if text.is_empty() {
        return Err(AppError::BadRequest("Message text is required".to_string()));
    }
    if text.chars().count() > MAX_TEXT_LEN {
        return Err(AppError::BadRequest(format!(
            "Message text must be at most {MAX_TEXT_LEN} characters"
        )));
    }

    let reply_to = req.reply_to.as_deref().filter(|s| !s.is_empty());
    let message = state
        .gateway
        .send_text(&session, &chat_id, text, reply_to)
        .await?;

    // Already delivered: a bookkeeping failure must not turn into a retry
    if let Err(e) = db::assignments::touch_last_message(&state.pool, &session, &chat_id).await {
        tracing::warn!(session = %session, chat = %chat_id, "Failed to record chat activity: {e}");
    }

    audit::record(
        &state.pool,
        &auth,
        "message.sent",
        "chat",
        None,
        Some(json!({ "session_id": session, "chat_id": chat_id, "message_id": message.id })),
    )
    .await;

    Ok(ApiResponse::created(message))
}

pub async fn mark_seen(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path((session, chat_id)): Path<(String, String)>,
) -> Result<ApiResponse<serde_json::Value>, AppError> {
    authorize_chat(&state, &auth, &session, &chat_id).await?;
    state.gateway.mark_seen(&session, &chat_id).await?;
    Ok(ApiResponse::ok(json!({ "chat_id": chat_id, "seen": true })))
}
