use axum::extract::State;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::auth::{normalize_email, password};
use crate::db;
use crate::error::{conflict_on_unique, AppError};
use crate::extract::{Json, Path};
use crate::middleware::audit;
use crate::models::{DeveloperProfile, ROLE_DEVELOPER};
use crate::response::ApiResponse;
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct CreateDeveloper {
    pub name: String,
    pub email: String,
    pub password: String,
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<ApiResponse<Vec<DeveloperProfile>>, AppError> {
    auth.require_admin()?;
    let developers = db::developers::list_profiles(&state.pool, auth.organization_id).await?;
    Ok(ApiResponse::ok(developers))
}

pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<DeveloperProfile>, AppError> {
    auth.require_admin()?;
    let developer = db::developers::find_profile(&state.pool, id, auth.organization_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Developer not found".to_string()))?;
    Ok(ApiResponse::ok(developer))
}

pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<CreateDeveloper>,
) -> Result<ApiResponse<DeveloperProfile>, AppError> {
    auth.require_admin()?;

    let name = req.name.trim();
    let email = normalize_email(&req.email);
    if name.is_empty() || email.is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest(
            "Name, email and password are required".to_string(),
        ));
    }
    if !email.contains('@') {
        return Err(AppError::BadRequest("Invalid email address".to_string()));
    }
    password::validate_strength(&req.password)?;

    let pw_hash = password::hash(&req.password).map_err(AppError::Internal)?;

    let mut tx = state.pool.begin().await?;

    let user = db::users::create(
        &mut *tx,
        auth.organization_id,
        &email,
        &pw_hash,
        name,
        ROLE_DEVELOPER,
    )
    .await
    .map_err(|e| conflict_on_unique(e, "A user with this email already exists"))?;

    let developer = db::developers::create(&mut *tx, user.id, auth.organization_id).await?;

    tx.commit().await?;

    audit::record(
        &state.pool,
        &auth,
        "developer.created",
        "developer",
        Some(developer.id),
        Some(json!({ "email": user.email })),
    )
    .await;

    Ok(ApiResponse::created(DeveloperProfile {
        id: developer.id,
        user_id: user.id,
        organization_id: developer.organization_id,
        name: user.name,
        email: user.email,
        active_assignments: 0,
        created_at: developer.created_at,
    }))
}

/// Removes the developer's user; the profile and assignments cascade.
pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<serde_json::Value>, AppError> {
    auth.require_admin()?;

    let developer = db::developers::find_by_id(&state.pool, id, auth.organization_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Developer not found".to_string()))?;

    db::users::delete(&state.pool, developer.user_id).await?;

    audit::record(
        &state.pool,
        &auth,
        "developer.deleted",
        "developer",
        Some(developer.id),
        None,
    )
    .await;

    Ok(ApiResponse::ok(json!({ "id": developer.id, "deleted": true })))
}
