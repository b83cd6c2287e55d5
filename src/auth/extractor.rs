use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;
use uuid::Uuid;

use crate::auth::jwt;
use crate::db;
use crate::error::{AppError, UNAUTHORIZED};
use crate::models::User;
use crate::state::SharedState;

pub const TOKEN_COOKIE: &str = "jwt";

/// The authenticated principal. The user row is re-read on every request so
/// deleted accounts lose access immediately.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub organisation: String,
    pub user: User,
}

impl AuthUser {
    pub fn organisation(&self) -> &str {
        &self.organisation
    }
}

fn bearer_or_cookie(parts: &Parts) -> Result<Option<String>, AppError> {
    if let Some(auth_header) = parts.headers.get("authorization") {
        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::Unauthorized(UNAUTHORIZED))?;

        if let Some(token) = auth_str.strip_prefix("Bearer ") {
            return Ok(Some(token.trim().to_string()));
        }
    }

    let jar = CookieJar::from_headers(&parts.headers);
    Ok(jar.get(TOKEN_COOKIE).map(|c| c.value().to_string()))
}

impl FromRequestParts<SharedState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_or_cookie(parts)?
            .filter(|t| !t.is_empty())
            .ok_or(AppError::Unauthorized(UNAUTHORIZED))?;

        let claims = jwt::decode_token(&token, &state.config.jwt_secret).map_err(|e| {
            tracing::debug!("Rejected token: {e}");
            AppError::Unauthorized(UNAUTHORIZED)
        })?;

        let user = db::users::find_by_id(&state.pool, claims.sub)
            .await?
            .ok_or(AppError::Unauthorized(UNAUTHORIZED))?;

        Ok(AuthUser {
            user_id: user.id,
            organisation: user.organisation.clone(),
            user,
        })
    }
}
