use axum::extract::State;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::db::assignments::ListFilter;
use crate::error::{conflict_on_unique, AppError};
use crate::extract::{Json, Path, Query};
use crate::gateway::ids::{is_valid_chat_id, is_valid_session_name};
use crate::middleware::audit;
use crate::models::{AssignmentWithDeveloper, ChatAssignment};
use crate::pagination::{Page, PageParams};
use crate::response::ApiResponse;
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct CreateAssignment {
    pub developer_id: Option<Uuid>,
    pub developer_ids: Option<Vec<Uuid>>,
    pub chat_id: String,
    pub chat_name: Option<String>,
    pub session_id: String,
    #[serde(default)]
    pub exclusive: bool,
}

#[derive(Serialize)]
pub struct CreateAssignmentResponse {
    pub assignments: Vec<ChatAssignment>,
    /// Developers that already held an active assignment for the chat.
    pub skipped_developer_ids: Vec<Uuid>,
    /// Active rows of other developers turned off by an exclusive assignment.
    pub displaced: u64,
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub session_id: Option<String>,
    pub chat_id: Option<String>,
    pub active: Option<bool>,
}

#[derive(Deserialize)]
pub struct MineQuery {
    pub session_id: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Deserialize)]
pub struct ChatQuery {
    pub session_id: Option<String>,
}

#[derive(Deserialize)]
pub struct ReassignRequest {
    pub developer_id: Uuid,
}

#[derive(Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub hard: bool,
}

fn validate_target(session_id: &str, chat_id: &str) -> Result<(), AppError> {
    if session_id.is_empty() || chat_id.is_empty() {
        return Err(AppError::BadRequest(
            "session_id and chat_id are required".to_string(),
        ));
    }
    if !is_valid_session_name(session_id) {
        return Err(AppError::BadRequest("Invalid session_id".to_string()));
    }
    if !is_valid_chat_id(chat_id) {
        return Err(AppError::BadRequest("Invalid chat_id".to_string()));
    }
    Ok(())
}

/// Requested developer ids in request order, duplicates removed.
fn requested_developers(req: &CreateAssignment) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = Vec::new();
    let all = req.developer_id.iter().chain(req.developer_ids.iter().flatten());
    for id in all {
        if !ids.contains(id) {
            ids.push(*id);
        }
    }
    ids
}

pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<CreateAssignment>,
) -> Result<ApiResponse<CreateAssignmentResponse>, AppError> {
    auth.require_admin()?;

    let session_id = req.session_id.trim();
    let chat_id = req.chat_id.trim();
    validate_target(session_id, chat_id)?;

    let developer_ids = requested_developers(&req);
    if developer_ids.is_empty() {
        return Err(AppError::BadRequest(
            "developer_id or developer_ids is required".to_string(),
        ));
    }
    let single = developer_ids.len() == 1;
    let chat_name = req
        .chat_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let mut tx = state.pool.begin().await?;

    let known =
        db::developers::count_in_organization(&mut *tx, &developer_ids, auth.organization_id)
            .await?;
    if known != developer_ids.len() as i64 {
        return Err(AppError::NotFound("Developer not found".to_string()));
    }

    let mut assignments = Vec::with_capacity(developer_ids.len());
    let mut skipped = Vec::new();

    for developer_id in &developer_ids {
        let existing =
            db::assignments::find_for_developer(&mut *tx, *developer_id, session_id, chat_id)
                .await?;

        match existing {
            Some(a) if a.is_active => {
                if single {
                    return Err(AppError::Conflict(
                        "Chat is already assigned to this developer".to_string(),
                    ));
                }
                skipped.push(*developer_id);
            }
            Some(a) => {
                assignments.push(db::assignments::reactivate(&mut *tx, a.id, chat_name).await?);
            }
            None => {
                let created = db::assignments::insert(
                    &mut *tx,
                    *developer_id,
                    session_id,
                    chat_id,
                    chat_name,
                )
                .await
                .map_err(|e| {
                    conflict_on_unique(e, "Chat is already assigned to this developer")
                })?;
                assignments.push(created);
            }
        }
    }

    let displaced = if req.exclusive {
        db::assignments::deactivate_others(&mut *tx, session_id, chat_id, &developer_ids).await?
    } else {
        0
    };

    tx.commit().await?;

    for assignment in &assignments {
        audit::record(
            &state.pool,
            &auth,
            "assignment.created",
            "chat_assignment",
            Some(assignment.id),
            Some(json!({
                "developer_id": assignment.developer_id,
                "session_id": assignment.session_id,
                "chat_id": assignment.chat_id,
                "exclusive": req.exclusive,
            })),
        )
        .await;
    }

    Ok(ApiResponse::created(CreateAssignmentResponse {
        assignments,
        skipped_developer_ids: skipped,
        displaced,
    }))
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(query): Query<ListQuery>,
) -> Result<ApiResponse<Vec<AssignmentWithDeveloper>>, AppError> {
    auth.require_admin()?;

    let filter = ListFilter {
        organization_id: auth.organization_id,
        session_id: query.session_id.filter(|s| !s.is_empty()),
        chat_id: query.chat_id.filter(|s| !s.is_empty()),
        active: query.active,
    };
    let assignments = db::assignments::list(&state.pool, &filter).await?;
    Ok(ApiResponse::ok(assignments))
}

pub async fn mine(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(query): Query<MineQuery>,
) -> Result<ApiResponse<Page<ChatAssignment>>, AppError> {
    let developer_id = auth.require_developer()?;
    let page = PageParams {
        limit: query.limit,
        offset: query.offset,
    };

    let rows = db::assignments::list_active_for_developer(
        &state.pool,
        developer_id,
        query.session_id.as_deref().filter(|s| !s.is_empty()),
        page.fetch_limit(),
        page.offset(),
    )
    .await?;

    Ok(ApiResponse::ok(Page::from_probe(rows, &page)))
}

pub async fn for_chat(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(chat_id): Path<String>,
    Query(query): Query<ChatQuery>,
) -> Result<ApiResponse<Vec<AssignmentWithDeveloper>>, AppError> {
    auth.require_admin()?;
    if !is_valid_chat_id(&chat_id) {
        return Err(AppError::BadRequest("Invalid chat_id".to_string()));
    }

    let filter = ListFilter {
        organization_id: auth.organization_id,
        session_id: query.session_id.filter(|s| !s.is_empty()),
        chat_id: Some(chat_id),
        active: Some(true),
    };
    let assignments = db::assignments::list(&state.pool, &filter).await?;
    Ok(ApiResponse::ok(assignments))
}

async fn find_scoped(
    state: &SharedState,
    auth: &AuthUser,
    id: Uuid,
) -> Result<ChatAssignment, AppError> {
    db::assignments::find_by_id(&state.pool, id, auth.organization_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Assignment not found".to_string()))
}

/// Soft delete. Unassigning an inactive row is a no-op.
pub async fn unassign(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<ChatAssignment>, AppError> {
    auth.require_admin()?;

    let assignment = find_scoped(&state, &auth, id).await?;
    if !assignment.is_active {
        return Ok(ApiResponse::ok(assignment));
    }

    let assignment = db::assignments::deactivate(&state.pool, assignment.id).await?;

    audit::record(
        &state.pool,
        &auth,
        "assignment.unassigned",
        "chat_assignment",
        Some(assignment.id),
        None,
    )
    .await;

    Ok(ApiResponse::ok(assignment))
}

/// Moves a chat from the assignment's developer to another one.
pub async fn reassign(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ReassignRequest>,
) -> Result<ApiResponse<ChatAssignment>, AppError> {
    auth.require_admin()?;

    let current = find_scoped(&state, &auth, id).await?;
    if current.developer_id == req.developer_id {
        return Err(AppError::BadRequest(
            "Chat is already assigned to this developer".to_string(),
        ));
    }

    let mut tx = state.pool.begin().await?;

    db::developers::find_by_id(&mut *tx, req.developer_id, auth.organization_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Developer not found".to_string()))?;

    if current.is_active {
        db::assignments::deactivate(&mut *tx, current.id).await?;
    }

    let target = db::assignments::find_for_developer(
        &mut *tx,
        req.developer_id,
        &current.session_id,
        &current.chat_id,
    )
    .await?;

    let assignment = match target {
        Some(a) if a.is_active => a,
        Some(a) => db::assignments::reactivate(&mut *tx, a.id, current.chat_name.as_deref()).await?,
        None => {
            db::assignments::insert(
                &mut *tx,
                req.developer_id,
                &current.session_id,
                &current.chat_id,
                current.chat_name.as_deref(),
            )
            .await?
        }
    };

    tx.commit().await?;

    audit::record(
        &state.pool,
        &auth,
        "assignment.reassigned",
        "chat_assignment",
        Some(assignment.id),
        Some(json!({
            "from_developer_id": current.developer_id,
            "to_developer_id": assignment.developer_id,
        })),
    )
    .await;

    Ok(ApiResponse::ok(assignment))
}

/// Soft delete by default; `?hard=true` removes the row.
pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Query(query): Query<DeleteQuery>,
) -> Result<ApiResponse<serde_json::Value>, AppError> {
    auth.require_admin()?;

    let assignment = find_scoped(&state, &auth, id).await?;

    if query.hard {
        db::assignments::delete(&state.pool, assignment.id).await?;
    } else if assignment.is_active {
        db::assignments::deactivate(&state.pool, assignment.id).await?;
    } else {
        // Soft delete of an inactive row changes nothing
        return Ok(ApiResponse::ok(json!({
            "id": assignment.id,
            "deleted": false,
            "is_active": false,
        })));
    }

    audit::record(
        &state.pool,
        &auth,
        "assignment.deleted",
        "chat_assignment",
        Some(assignment.id),
        Some(json!({ "hard": query.hard })),
    )
    .await;

    Ok(ApiResponse::ok(json!({
        "id": assignment.id,
        "deleted": query.hard,
        "is_active": false,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requested_developers_merges_and_dedupes() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let req = CreateAssignment {
            developer_id: Some(a),
            developer_ids: Some(vec![b, a, b]),
            chat_id: "4915112345678@c.us".into(),
            chat_name: None,
            session_id: "default".into(),
            exclusive: false,
        };
        assert_eq!(requested_developers(&req), vec![a, b]);
    }

    #[test]
    fn target_validation() {
        assert!(validate_target("default", "4915112345678@c.us").is_ok());
        assert!(validate_target("", "4915112345678@c.us").is_err());
        assert!(validate_target("default", "not-a-chat").is_err());
        assert!(validate_target("bad/session", "4915112345678@c.us").is_err());
    }
}
