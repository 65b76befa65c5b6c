//! Monster lookup routes, proxied to Open5e.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;

use super::error_body;
use crate::monsters::MonsterError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub search: String,
}

/// `GET /api/monsters/:slug`
pub async fn get_monster(State(state): State<AppState>, Path(slug): Path<String>) -> Result<Response, MonsterError> {
    Ok(match state.monsters.monster(&slug).await? {
        Some(record) => Json(record).into_response(),
        None => error_body(StatusCode::NOT_FOUND, format!("monster not found: {slug}")),
    })
}

/// `GET /api/monsters?search=`
pub async fn search(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Result<Response, MonsterError> {
    let query = params.search.trim();
    if query.is_empty() {
        return Ok(error_body(StatusCode::BAD_REQUEST, "search query required"));
    }
    Ok(Json(state.monsters.search(query).await?).into_response())
}

#[cfg(test)]
#[path = "monsters_test.rs"]
mod tests;
