use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::header::RETRY_AFTER;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

pub const SERVER_ERROR: &str = "SERVER_ERROR";
pub const PASSWORD_NOT_VALIDATED: &str = "PASSWORD_NOT_VALIDATED";
pub const DUPLICATE_FIELD: &str = "DUPLICATE_FIELD";
pub const INVALID_BODY: &str = "INVALID_BODY";
pub const INVALID_QUERY: &str = "INVALID_QUERY";
pub const INVALID_ID: &str = "INVALID_ID";
pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
pub const EMAIL_OR_PASSWORD_INVALID: &str = "EMAIL_OR_PASSWORD_INVALID";
pub const REGISTRATION_CLOSED: &str = "REGISTRATION_CLOSED";
pub const TOO_MANY_ATTEMPTS: &str = "TOO_MANY_ATTEMPTS";

#[derive(Debug)]
pub enum AppError {
    /// Candidate password rejected by the password policy.
    PasswordNotValidated,
    /// Unique constraint violated on the named field.
    DuplicateField(String),
    /// Malformed request: error code plus a human-readable detail.
    BadRequest(&'static str, String),
    Unauthorized(&'static str),
    Forbidden(&'static str),
    /// Seconds until the caller may retry.
    RateLimited(u64),
    Internal(String),
    Database(sqlx::Error),
}

impl AppError {
    /// Maps a failed insert/update, turning unique violations into
    /// `DuplicateField` with the column taken from the constraint name.
    pub fn from_write(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                let field = db_err
                    .constraint()
                    .map(constraint_field)
                    .unwrap_or_else(|| "unknown".to_string());
                return AppError::DuplicateField(field);
            }
        }
        AppError::Database(err)
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::PasswordNotValidated => PASSWORD_NOT_VALIDATED,
            AppError::DuplicateField(_) => DUPLICATE_FIELD,
            AppError::BadRequest(code, _) => *code,
            AppError::Unauthorized(code) => *code,
            AppError::Forbidden(code) => *code,
            AppError::RateLimited(_) => TOO_MANY_ATTEMPTS,
            AppError::Internal(_) | AppError::Database(_) => SERVER_ERROR,
        }
    }
}

/// `users_email_key` -> `email`, `users_pkey` -> `_id`
fn constraint_field(constraint: &str) -> String {
    let name = constraint.strip_prefix("users_").unwrap_or(constraint);
    if name == "pkey" || name.ends_with("_pkey") {
        return "_id".to_string();
    }
    let name = name
        .strip_suffix("_key")
        .or_else(|| name.strip_suffix("_idx"))
        .unwrap_or(name);
    name.to_string()
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::PasswordNotValidated => write!(f, "Bad Request: password not validated"),
            AppError::DuplicateField(field) => write!(f, "Conflict: duplicate {field}"),
            AppError::BadRequest(code, msg) => write!(f, "Bad Request ({code}): {msg}"),
            AppError::Unauthorized(code) => write!(f, "Unauthorized: {code}"),
            AppError::Forbidden(code) => write!(f, "Forbidden: {code}"),
            AppError::RateLimited(secs) => write!(f, "Rate Limited: retry in {secs}s"),
            AppError::Internal(msg) => write!(f, "Internal Error: {msg}"),
            AppError::Database(err) => write!(f, "Database Error: {err}"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, body) = match &self {
            AppError::PasswordNotValidated => {
                (StatusCode::BAD_REQUEST, json!({ "ok": false, "code": code }))
            }
            AppError::DuplicateField(field) => (
                StatusCode::CONFLICT,
                json!({ "ok": false, "code": code, "field": field }),
            ),
            AppError::BadRequest(_, msg) => (
                StatusCode::BAD_REQUEST,
                json!({ "ok": false, "code": code, "message": msg }),
            ),
            AppError::Unauthorized(_) => {
                (StatusCode::UNAUTHORIZED, json!({ "ok": false, "code": code }))
            }
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, json!({ "ok": false, "code": code })),
            AppError::RateLimited(secs) => {
                let body = json!({ "ok": false, "code": code });
                return (
                    StatusCode::TOO_MANY_REQUESTS,
                    [(RETRY_AFTER, secs.to_string())],
                    axum::Json(body),
                )
                    .into_response();
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "ok": false, "code": code }),
                )
            }
            AppError::Database(err) => {
                tracing::error!("Database error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "ok": false, "code": code }),
                )
            }
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(INVALID_BODY, rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(INVALID_QUERY, rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(INVALID_ID, rejection.body_text())
    }
}
