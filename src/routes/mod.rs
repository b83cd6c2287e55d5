pub mod auth;
pub mod users;

use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;

use crate::state::SharedState;

/// Success envelope shared by every controller route: `{ ok: true, data }`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub ok: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { ok: true, data }
    }
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn new() -> Self {
        Self { ok: true }
    }
}

impl Default for OkResponse {
    fn default() -> Self {
        Self::new()
    }
}

/// Routes mounted under `/users`.
pub fn user_routes() -> Router<SharedState> {
    Router::new()
        // Auth
        .route("/signin", post(auth::signin))
        .route("/logout", post(auth::logout))
        .route("/signup", post(auth::signup))
        .route("/signin_token", get(auth::signin_token))
        // Users
        .route("/available", get(users::list_available))
        .route("/stats", get(users::stats))
        .route(
            "/",
            get(users::list)
                .post(users::create)
                .put(users::update_me),
        )
        .route(
            "/{id}",
            get(users::get)
                .put(users::update)
                .delete(users::delete),
        )
}
