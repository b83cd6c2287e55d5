use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::auth::extractor::{AuthUser, TOKEN_COOKIE};
use crate::auth::jwt::{Claims, encode_token};
use crate::auth::{password, policy};
use crate::config::RegistrationMode;
use crate::db;
use crate::error::{AppError, EMAIL_OR_PASSWORD_INVALID, REGISTRATION_CLOSED, UNAUTHORIZED};
use crate::middleware::audit;
use crate::models::User;
use crate::routes::users::{required, valid_email};
use crate::routes::OkResponse;
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub organisation: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub ok: bool,
    pub token: String,
    pub user: User,
}

fn token_cookie(token: &str, ttl_hours: i64) -> CookieJar {
    let cookie = Cookie::build((TOKEN_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::hours(ttl_hours))
        .build();

    CookieJar::new().add(cookie)
}

fn clear_token_cookie() -> CookieJar {
    let cookie = Cookie::build((TOKEN_COOKIE, ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .build();
    CookieJar::new().add(cookie)
}

/// Stamp `last_login_at` and hand back a fresh token for the user.
async fn issue_session(
    state: &SharedState,
    user: &User,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let Some(user) = db::users::touch_last_login(&state.pool, user.id).await? else {
        return Err(AppError::Unauthorized(UNAUTHORIZED));
    };

    let ttl_hours = state.config.token_ttl_hours;
    let claims = Claims::new(user.id, &user.organisation, Duration::hours(ttl_hours));
    let token = encode_token(&claims, &state.config.jwt_secret).map_err(AppError::Internal)?;

    let jar = token_cookie(&token, ttl_hours);
    Ok((jar, Json(AuthResponse {
        ok: true,
        token,
        user,
    })))
}

pub async fn signin(
    State(state): State<SharedState>,
    payload: Result<Json<SigninRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let Json(req) = payload?;
    let email = req.email.trim().to_lowercase();

    if let Err(retry_after) = state.login_limiter.check(&email) {
        tracing::warn!("Sign-in rate limited for {email}");
        return Err(AppError::RateLimited(retry_after));
    }

    let Some(user) = db::users::find_by_email(&state.pool, &email).await? else {
        password::verify_unknown_account(&req.password);
        return Err(AppError::Unauthorized(EMAIL_OR_PASSWORD_INVALID));
    };

    let valid = password::verify(&req.password, &user.password_hash).map_err(AppError::Internal)?;

    if !valid {
        state.login_limiter.record_failure(&email);
        tracing::warn!(user_id = %user.id, "Failed sign-in");
        return Err(AppError::Unauthorized(EMAIL_OR_PASSWORD_INVALID));
    }

    state.login_limiter.reset(&email);
    issue_session(&state, &user).await
}

pub async fn logout() -> (CookieJar, Json<OkResponse>) {
    (clear_token_cookie(), Json(OkResponse::new()))
}

pub async fn signup(
    State(state): State<SharedState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    if state.config.registration == RegistrationMode::Closed {
        return Err(AppError::Forbidden(REGISTRATION_CLOSED));
    }

    let Json(req) = payload?;

    let name = required(&req.name, "name")?;
    let organisation = required(&req.organisation, "organisation")?;
    let email = valid_email(&req.email)?;
    if !policy::validate_password(&req.password) {
        return Err(AppError::PasswordNotValidated);
    }

    let pw_hash = password::hash(&req.password).map_err(AppError::Internal)?;

    let user = db::users::create(&state.pool, &name, &email, &pw_hash, &organisation)
        .await
        .map_err(AppError::from_write)?;

    tracing::info!(user_id = %user.id, organisation = %user.organisation, "User signed up");

    audit::log_user_event(
        &state.pool,
        &user.organisation,
        Some(user.id),
        "user.signed_up",
        user.id,
        None,
    )
    .await;

    issue_session(&state, &user).await
}

/// Exchange a still-valid token for a fresh one.
pub async fn signin_token(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    issue_session(&state, &auth.user).await
}
