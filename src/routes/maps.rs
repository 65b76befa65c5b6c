//! Map library routes.
//!
//! Uploads arrive as the raw image body with an optional `?name=`; the store
//! decodes, downsizes and thumbnails them before anything is registered.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Json};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::state::AppState;
use crate::store::{MapRecord, StoreError};

#[derive(Debug, Default, Deserialize)]
pub struct UploadParams {
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateMapBody {
    #[serde(default)]
    pub name: Option<String>,
}

/// `GET /api/maps`
pub async fn list_maps(State(state): State<AppState>) -> Result<Json<Vec<MapRecord>>, StoreError> {
    Ok(Json(state.store.list_maps().await?))
}

/// `POST /api/maps?name=`: body is the image file.
pub async fn upload_map(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Result<Json<Value>, StoreError> {
    let map = state.store.put_map(body.to_vec(), params.name).await?;
    Ok(Json(json!({ "success": true, "map": map })))
}

/// `GET /api/maps/:id/image`
pub async fn map_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, StoreError> {
    let png = state.store.map_image(&id).await?;
    Ok(([(header::CONTENT_TYPE, "image/png"), (header::CACHE_CONTROL, "no-cache")], png))
}

/// `PUT /api/maps/:id`: rename and/or mark as recently used.
pub async fn update_map(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateMapBody>,
) -> Result<Json<Value>, StoreError> {
    let map = state.store.update_map(&id, body.name).await?;
    Ok(Json(json!({ "success": true, "map": map })))
}

/// `DELETE /api/maps/:id`
pub async fn delete_map(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, StoreError> {
    state.store.delete_map(&id).await?;
    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
#[path = "maps_test.rs"]
mod tests;
