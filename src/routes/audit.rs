use axum::extract::State;
use serde::Deserialize;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::extract::Query;
use crate::models::AuditEvent;
use crate::pagination::{Page, PageParams};
use crate::response::ApiResponse;
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct AuditQuery {
    pub action: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(query): Query<AuditQuery>,
) -> Result<ApiResponse<Page<AuditEvent>>, AppError> {
    auth.require_admin()?;
    let page = PageParams {
        limit: query.limit,
        offset: query.offset,
    };

    let events = db::audit::list(
        &state.pool,
        auth.organization_id,
        query.action.as_deref().filter(|s| !s.is_empty()),
        page.fetch_limit(),
        page.offset(),
    )
    .await?;

    Ok(ApiResponse::ok(Page::from_probe(events, &page)))
}
