//! Saved scene routes.

use axum::extract::State;
use axum::response::Json;
use scene::snapshot::SceneSnapshot;
use serde_json::{Value, json};

use crate::state::AppState;
use crate::store::{StoreError, StoredScene};

/// `GET /api/battlemap-state`: the saved scene, or `null` when none exists.
pub async fn load_state(State(state): State<AppState>) -> Result<Json<Option<StoredScene>>, StoreError> {
    Ok(Json(state.store.load_scene().await?))
}

/// `PUT /api/battlemap-state`: replace the saved scene. Unknown fields in the
/// body are dropped before anything touches disk.
pub async fn save_state(
    State(state): State<AppState>,
    Json(snapshot): Json<SceneSnapshot>,
) -> Result<Json<Value>, StoreError> {
    let stored = state.store.save_scene(snapshot).await?;
    tracing::debug!(saved_at = %stored.saved_at, tokens = stored.scene.tokens.len(), "scene saved");
    Ok(Json(json!({ "success": true, "savedAt": stored.saved_at })))
}

#[cfg(test)]
#[path = "scene_test.rs"]
mod tests;
