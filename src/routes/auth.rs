use axum::extract::State;
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::auth::jwt::{encode_token, Claims, ACCESS_TOKEN_MINUTES};
use crate::auth::{normalize_email, password};
use crate::db;
use crate::db::audit::NewAuditEvent;
use crate::db::refresh_tokens::Redemption;
use crate::error::{conflict_on_unique, AppError};
use crate::extract::Json;
use crate::middleware::audit;
use crate::models::{User, ROLE_ADMIN, ROLE_DEVELOPER};
use crate::response::ApiResponse;
use crate::state::SharedState;

const REFRESH_TOKEN_DAYS: i64 = 7;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub organization: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub developer_id: Option<Uuid>,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserProfile,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

fn auth_cookies(access_token: &str, refresh_token: &str) -> CookieJar {
    let access = Cookie::build(("access_token", access_token.to_string()))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::minutes(ACCESS_TOKEN_MINUTES))
        .build();

    let refresh = Cookie::build(("refresh_token", refresh_token.to_string()))
        .path("/api/v1/auth")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::days(REFRESH_TOKEN_DAYS))
        .build();

    CookieJar::new().add(access).add(refresh)
}

fn clear_auth_cookies() -> CookieJar {
    let access = Cookie::build(("access_token", ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .build();
    let refresh = Cookie::build(("refresh_token", ""))
        .path("/api/v1/auth")
        .max_age(time::Duration::ZERO)
        .build();
    CookieJar::new().add(access).add(refresh)
}

fn generate_refresh_token() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Resolves the developer profile for developer accounts.
async fn developer_id_for(state: &SharedState, user: &User) -> Result<Option<Uuid>, AppError> {
    if user.role != ROLE_DEVELOPER {
        return Ok(None);
    }
    let developer = db::developers::find_by_user_id(&state.pool, user.id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Developer profile missing".to_string()))?;
    Ok(Some(developer.id))
}

fn profile(user: &User, developer_id: Option<Uuid>) -> UserProfile {
    UserProfile {
        id: user.id,
        organization_id: user.organization_id,
        name: user.name.clone(),
        email: user.email.clone(),
        role: user.role.clone(),
        developer_id,
    }
}

/// Issues an access token and a fresh stored refresh token for the user.
async fn issue_tokens(
    state: &SharedState,
    user: &User,
) -> Result<(CookieJar, AuthResponse), AppError> {
    let developer_id = developer_id_for(state, user).await?;

    let claims = Claims::new(user.id, user.organization_id, user.role.clone(), developer_id);
    let access_token =
        encode_token(&claims, &state.config.jwt_secret).map_err(AppError::Internal)?;

    let refresh = generate_refresh_token();
    db::refresh_tokens::issue(&state.pool, user.id, &hash_token(&refresh), REFRESH_TOKEN_DAYS)
        .await?;

    let jar = auth_cookies(&access_token, &refresh);
    Ok((
        jar,
        AuthResponse {
            access_token,
            refresh_token: refresh,
            user: profile(user, developer_id),
        },
    ))
}

/// Bootstrap: the first account becomes the organization's admin.
pub async fn register(
    State(state): State<SharedState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(CookieJar, ApiResponse<AuthResponse>), AppError> {
    let email = normalize_email(&req.email);
    let name = req.name.trim();
    if email.is_empty() || req.password.is_empty() || name.is_empty() {
        return Err(AppError::BadRequest("All fields are required".to_string()));
    }
    password::validate_strength(&req.password)?;

    let pw_hash = password::hash(&req.password).map_err(AppError::Internal)?;

    // Advisory lock prevents concurrent bootstrap registrations
    let mut tx = state.pool.begin().await?;
    sqlx::query("SELECT pg_advisory_xact_lock(1)")
        .execute(&mut *tx)
        .await?;

    if db::users::count_all(&mut *tx).await? > 0 {
        return Err(AppError::Forbidden(
            "Registration is disabled. Ask an admin for an account.".to_string(),
        ));
    }

    let org_name = req
        .organization
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{name}'s Organization"));
    let organization = db::organizations::create(&mut *tx, &org_name).await?;

    let user = db::users::create(&mut *tx, organization.id, &email, &pw_hash, name, ROLE_ADMIN)
        .await
        .map_err(|e| conflict_on_unique(e, "A user with this email already exists"))?;

    tx.commit().await?;

    tracing::info!(user_id = %user.id, "Bootstrap admin registered");

    audit::write(
        &state.pool,
        NewAuditEvent {
            organization_id: organization.id,
            user_id: Some(user.id),
            action: "user.registered",
            resource_type: "user",
            resource_id: Some(user.id),
            details: None,
        },
    )
    .await;

    let (jar, body) = issue_tokens(&state, &user).await?;
    Ok((jar, ApiResponse::created(body)))
}

pub async fn login(
    State(state): State<SharedState>,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, ApiResponse<AuthResponse>), AppError> {
    let email = normalize_email(&req.email);
    if email.is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }

    if state.login_limiter.check(&email).is_err() {
        return Err(AppError::RateLimited(
            "Too many login attempts. Please try again later.".to_string(),
        ));
    }

    let user = db::users::find_by_email(&state.pool, &email).await?;

    let Some(user) = user else {
        state.login_limiter.record_failure(&email);
        return Err(AppError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    };

    let valid =
        password::verify(&req.password, &user.password_hash).map_err(AppError::Internal)?;
    if !valid {
        state.login_limiter.record_failure(&email);
        return Err(AppError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    state.login_limiter.reset(&email);

    let (jar, body) = issue_tokens(&state, &user).await?;

    audit::write(
        &state.pool,
        NewAuditEvent {
            organization_id: user.organization_id,
            user_id: Some(user.id),
            action: "user.login",
            resource_type: "user",
            resource_id: Some(user.id),
            details: None,
        },
    )
    .await;

    Ok((jar, ApiResponse::ok(body)))
}

pub async fn refresh(
    State(state): State<SharedState>,
    jar: CookieJar,
) -> Result<(CookieJar, ApiResponse<AuthResponse>), AppError> {
    let refresh_value = jar
        .get("refresh_token")
        .map(|c| c.value().to_string())
        .ok_or_else(|| AppError::Unauthorized("Missing refresh token".to_string()))?;

    let stored = match db::refresh_tokens::redeem(&state.pool, &hash_token(&refresh_value)).await? {
        Redemption::Valid(token) => token,
        Redemption::Replayed { user_id } => {
            let revoked = db::refresh_tokens::revoke_for_user(&state.pool, user_id).await?;
            tracing::warn!(%user_id, revoked, "Refresh token replayed, all sessions revoked");
            return Err(AppError::Unauthorized(
                "Refresh token reuse detected. All sessions revoked.".to_string(),
            ));
        }
        Redemption::Unknown => {
            return Err(AppError::Unauthorized("Invalid refresh token".to_string()));
        }
    };

    if stored.expires_at < Utc::now() {
        return Err(AppError::Unauthorized("Refresh token expired".to_string()));
    }

    let user = db::users::find_by_id(&state.pool, stored.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    let (jar, body) = issue_tokens(&state, &user).await?;
    Ok((jar, ApiResponse::ok(body)))
}

pub async fn logout(
    State(state): State<SharedState>,
    jar: CookieJar,
) -> Result<(CookieJar, ApiResponse<MessageResponse>), AppError> {
    if let Some(cookie) = jar.get("refresh_token") {
        db::refresh_tokens::revoke(&state.pool, &hash_token(cookie.value())).await?;
    }

    Ok((
        clear_auth_cookies(),
        ApiResponse::ok(MessageResponse {
            message: "Logged out successfully".to_string(),
        }),
    ))
}

pub async fn me(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<ApiResponse<UserProfile>, AppError> {
    let user = db::users::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;
    Ok(ApiResponse::ok(profile(&user, auth.developer_id)))
}

pub async fn change_password(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<(CookieJar, ApiResponse<AuthResponse>), AppError> {
    password::validate_strength(&req.new_password)?;

    let user = db::users::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    let valid = password::verify(&req.current_password, &user.password_hash)
        .map_err(AppError::Internal)?;
    if !valid {
        return Err(AppError::Unauthorized(
            "Current password is incorrect".to_string(),
        ));
    }

    let pw_hash = password::hash(&req.new_password).map_err(AppError::Internal)?;
    db::users::update_password(&state.pool, user.id, &pw_hash).await?;

    // Every other session must log in again
    db::refresh_tokens::revoke_for_user(&state.pool, user.id).await?;

    audit::record(
        &state.pool,
        &auth,
        "user.password_changed",
        "user",
        Some(user.id),
        None,
    )
    .await;

    let (jar, body) = issue_tokens(&state, &user).await?;
    Ok((jar, ApiResponse::ok(body)))
}
