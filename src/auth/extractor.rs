use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;
use uuid::Uuid;

use crate::auth::jwt::{self, Claims};
use crate::error::AppError;
use crate::models::{ROLE_ADMIN, ROLE_DEVELOPER};
use crate::state::SharedState;

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub role: String,
    pub developer_id: Option<Uuid>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Admin access required".to_string()))
        }
    }

    /// The caller's developer profile id, or 403 for any other role.
    pub fn require_developer(&self) -> Result<Uuid, AppError> {
        match self.developer_id {
            Some(id) if self.role == ROLE_DEVELOPER => Ok(id),
            _ => Err(AppError::Forbidden(
                "Developer access required".to_string(),
            )),
        }
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        AuthUser {
            user_id: claims.sub,
            organization_id: claims.org,
            role: claims.role,
            developer_id: claims.dev,
        }
    }
}

impl FromRequestParts<SharedState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        // Bearer token takes precedence over the cookie
        if let Some(auth_header) = parts.headers.get("authorization") {
            let auth_str = auth_header
                .to_str()
                .map_err(|_| AppError::Unauthorized("Invalid authorization header".to_string()))?;

            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                let claims = jwt::decode_token(token, &state.config.jwt_secret)
                    .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;
                return Ok(claims.into());
            }
        }

        let jar = CookieJar::from_headers(&parts.headers);
        if let Some(cookie) = jar.get("access_token") {
            let claims = jwt::decode_token(cookie.value(), &state.config.jwt_secret)
                .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;
            return Ok(claims.into());
        }

        Err(AppError::Unauthorized(
            "Missing authentication token".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: &str, developer_id: Option<Uuid>) -> AuthUser {
        AuthUser {
            user_id: Uuid::now_v7(),
            organization_id: Uuid::now_v7(),
            role: role.to_string(),
            developer_id,
        }
    }

    #[test]
    fn role_guards() {
        let admin = user(ROLE_ADMIN, None);
        assert!(admin.require_admin().is_ok());
        assert!(admin.require_developer().is_err());

        let dev_id = Uuid::now_v7();
        let dev = user(ROLE_DEVELOPER, Some(dev_id));
        assert!(dev.require_admin().is_err());
        assert_eq!(dev.require_developer().unwrap(), dev_id);
    }

    #[test]
    fn developer_role_without_profile_is_forbidden() {
        assert!(user(ROLE_DEVELOPER, None).require_developer().is_err());
    }
}
