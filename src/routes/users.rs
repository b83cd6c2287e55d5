use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::auth::{password, policy};
use crate::db;
use crate::error::{AppError, INVALID_BODY};
use crate::middleware::audit;
use crate::models::{Availability, User, UserFilter, UserPatch, UserStats, UserStatus};
use crate::routes::{ApiResponse, OkResponse};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub password: String,
    /// Ignored in favour of the caller's organisation.
    pub organisation: Option<String>,
}

/// Partial update. `organisation` and `id` are deliberately absent, so a
/// body carrying them is rejected.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub status: Option<UserStatus>,
    pub availability: Option<Availability>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl UpdateUser {
    fn into_patch(self) -> Result<UserPatch, AppError> {
        let name = match self.name {
            Some(name) => Some(required(&name, "name")?),
            None => None,
        };

        let email = match self.email {
            Some(email) => Some(valid_email(&email)?),
            None => None,
        };

        let password_hash = match self.password {
            Some(pw) => {
                if !policy::validate_password(&pw) {
                    return Err(AppError::PasswordNotValidated);
                }
                Some(password::hash(&pw).map_err(AppError::Internal)?)
            }
            None => None,
        };

        Ok(UserPatch {
            name,
            email,
            password_hash,
            status: self.status,
            availability: self.availability,
            last_login_at: self.last_login_at,
        })
    }
}

pub(crate) fn required(value: &str, field: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::BadRequest(INVALID_BODY, format!("{field} is required")));
    }
    Ok(value.to_string())
}

pub(crate) fn valid_email(email: &str) -> Result<String, AppError> {
    policy::normalize_email(email)
        .ok_or_else(|| AppError::BadRequest(INVALID_BODY, "email is invalid".to_string()))
}

pub async fn list_available(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<ApiResponse<Vec<User>>>, AppError> {
    let users = db::users::list_available(&state.pool, auth.organisation()).await?;
    Ok(Json(ApiResponse::new(users)))
}

pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ApiResponse<Option<User>>>, AppError> {
    let Path(id) = id?;
    let user = db::users::find_in_organisation(&state.pool, auth.organisation(), id).await?;
    Ok(Json(ApiResponse::new(user)))
}

pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    payload: Result<Json<CreateUser>, JsonRejection>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    let Json(req) = payload?;

    let name = required(&req.name, "name")?;
    let email = valid_email(&req.email)?;
    if !policy::validate_password(&req.password) {
        return Err(AppError::PasswordNotValidated);
    }

    if let Some(requested) = req.organisation.as_deref() {
        if requested != auth.organisation() {
            tracing::debug!(
                requested,
                organisation = auth.organisation(),
                "Ignoring organisation from create payload"
            );
        }
    }

    let pw_hash = password::hash(&req.password).map_err(AppError::Internal)?;

    let user = db::users::create(&state.pool, &name, &email, &pw_hash, auth.organisation())
        .await
        .map_err(AppError::from_write)?;

    audit::log_user_event(
        &state.pool,
        auth.organisation(),
        Some(auth.user_id),
        "user.created",
        user.id,
        None,
    )
    .await;

    Ok(Json(ApiResponse::new(user)))
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
    filter: Result<Query<UserFilter>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<User>>>, AppError> {
    let Query(filter) = filter?;
    let users = db::users::list_filtered(&state.pool, auth.organisation(), &filter).await?;
    Ok(Json(ApiResponse::new(users)))
}

pub async fn update(
    auth: AuthUser,
    State(state): State<SharedState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateUser>, JsonRejection>,
) -> Result<Json<ApiResponse<Option<User>>>, AppError> {
    let Path(id) = id?;
    let Json(req) = payload?;
    let user = apply_update(&state, &auth, id, req.into_patch()?).await?;
    Ok(Json(ApiResponse::new(user)))
}

pub async fn update_me(
    auth: AuthUser,
    State(state): State<SharedState>,
    payload: Result<Json<UpdateUser>, JsonRejection>,
) -> Result<Json<ApiResponse<Option<User>>>, AppError> {
    let Json(req) = payload?;
    let user = apply_update(&state, &auth, auth.user_id, req.into_patch()?).await?;
    Ok(Json(ApiResponse::new(user)))
}

async fn apply_update(
    state: &SharedState,
    auth: &AuthUser,
    id: Uuid,
    patch: UserPatch,
) -> Result<Option<User>, AppError> {
    if patch.is_empty() {
        return Ok(db::users::find_in_organisation(&state.pool, auth.organisation(), id).await?);
    }

    let user = db::users::update_in_organisation(&state.pool, auth.organisation(), id, &patch)
        .await
        .map_err(AppError::from_write)?;

    if let Some(ref user) = user {
        audit::log_user_event(
            &state.pool,
            auth.organisation(),
            Some(auth.user_id),
            "user.updated",
            user.id,
            Some(json!({ "fields": patch.changed_fields() })),
        )
        .await;
    }

    Ok(user)
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<OkResponse>, AppError> {
    let Path(id) = id?;
    let removed = db::users::delete_in_organisation(&state.pool, auth.organisation(), id).await?;

    if removed > 0 {
        tracing::info!(user_id = %id, organisation = auth.organisation(), "User deleted");
        audit::log_user_event(
            &state.pool,
            auth.organisation(),
            Some(auth.user_id),
            "user.deleted",
            id,
            None,
        )
        .await;
    }

    Ok(Json(OkResponse::new()))
}

pub async fn stats(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<ApiResponse<UserStats>>, AppError> {
    let stats = db::users::stats(&state.pool, auth.organisation()).await?;
    Ok(Json(ApiResponse::new(stats)))
}
