//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the HTTP API (saved scene, map library, monster lookup)
//! and the player-view websocket relay under a single Axum router. Error
//! types from the services map to status codes here, once.

pub mod maps;
pub mod monsters;
pub mod scene;
pub mod ws;

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, put};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::monsters::MonsterError;
use crate::state::AppState;
use crate::store::StoreError;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    let body_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    Router::new()
        .route("/api/battlemap-state", get(scene::load_state).put(scene::save_state))
        .route("/api/maps", get(maps::list_maps).post(maps::upload_map))
        .route("/api/maps/{id}", put(maps::update_map).delete(maps::delete_map))
        .route("/api/maps/{id}/image", get(maps::map_image))
        .route("/api/monsters", get(monsters::search))
        .route("/api/monsters/{slug}", get(monsters::get_monster))
        .route("/api/ws", get(ws::handle_ws))
        .route("/healthz", get(healthz))
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// JSON `{ "error": message }` with the given status.
pub(crate) fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

pub(crate) fn store_error_to_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::EmptyUpload | StoreError::InvalidImage(_) => StatusCode::BAD_REQUEST,
        StoreError::Io(_) | StoreError::Json(_) | StoreError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let status = store_error_to_status(&self);
        if status.is_server_error() {
            error!(error = %self, "store request failed");
        }
        error_body(status, self.to_string())
    }
}

pub(crate) fn monster_error_to_status(err: &MonsterError) -> StatusCode {
    match err {
        MonsterError::InvalidSlug(_) => StatusCode::BAD_REQUEST,
        MonsterError::HttpClientBuild(_) => StatusCode::INTERNAL_SERVER_ERROR,
        MonsterError::Upstream(_) => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for MonsterError {
    fn into_response(self) -> Response {
        let status = monster_error_to_status(&self);
        if status.is_server_error() {
            error!(error = %self, "monster lookup failed");
        }
        error_body(status, self.to_string())
    }
}
