//! File-backed storage: the saved scene and the map library.
//!
//! DESIGN
//! ======
//! Everything lives under one data directory:
//! - `battlemap-state.json`: the last saved scene snapshot
//! - `maps.json`: the map registry (metadata and thumbnails)
//! - `maps/<id>.png`: map images, downscaled to the configured maximum
//!
//! JSON files are replaced atomically (write to a temp file, then rename).
//! Registry read-modify-write cycles are serialized by one async mutex so
//! concurrent uploads cannot lose entries. Image decoding and encoding run
//! on the blocking pool.

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;

use std::io::Cursor;
use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use scene::snapshot::SceneSnapshot;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::sync::Mutex;
use tracing::{info, warn};

const STATE_FILE: &str = "battlemap-state.json";
const REGISTRY_FILE: &str = "maps.json";
const MAPS_DIR: &str = "maps";
const THUMBNAIL_PX: u32 = 200;
const UNTITLED_MAP: &str = "Untitled Map";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("map not found: {0}")]
    NotFound(String),
    #[error("upload is empty")]
    EmptyUpload,
    #[error("unreadable image: {0}")]
    InvalidImage(#[from] image::ImageError),
    #[error("storage io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored json is invalid: {0}")]
    Json(#[from] serde_json::Error),
    #[error("image task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Registry entry for one uploaded map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapRecord {
    pub id: String,
    pub name: String,
    pub filename: String,
    pub width: u32,
    pub height: u32,
    pub created_at: String,
    pub last_used: String,
    /// `data:image/png;base64,...` preview, 200×200 cover crop.
    pub thumbnail: String,
}

/// Saved scene as written to disk: the whitelisted snapshot fields plus
/// the time of the save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredScene {
    #[serde(flatten)]
    pub scene: SceneSnapshot,
    #[serde(default)]
    pub saved_at: String,
}

/// Map image after upload processing.
#[derive(Debug, Clone)]
pub struct ProcessedMap {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub thumbnail: String,
}

pub struct Store {
    data_dir: PathBuf,
    max_map_dimension: u32,
    registry: Mutex<()>,
}

impl Store {
    /// Open (and create if needed) the data directory.
    ///
    /// # Errors
    ///
    /// Fails when the directories cannot be created.
    pub async fn open(data_dir: impl Into<PathBuf>, max_map_dimension: u32) -> Result<Self, StoreError> {
        let data_dir = data_dir.into();
        tokio::fs::create_dir_all(data_dir.join(MAPS_DIR)).await?;
        info!(dir = %data_dir.display(), "store: opened");
        Ok(Self { data_dir, max_map_dimension, registry: Mutex::new(()) })
    }

    // =========================================================================
    // SCENE STATE
    // =========================================================================

    /// The saved scene, or `None` when nothing was saved yet. A corrupt
    /// state file also reads as `None` so startup never fails on it.
    pub async fn load_scene(&self) -> Result<Option<StoredScene>, StoreError> {
        let Some(raw) = read_optional(&self.data_dir.join(STATE_FILE)).await? else {
            return Ok(None);
        };
        match serde_json::from_slice(&raw) {
            Ok(stored) => Ok(Some(stored)),
            Err(e) => {
                warn!(error = %e, "store: saved scene unreadable, ignoring");
                Ok(None)
            }
        }
    }

    /// Persist a snapshot, stamping the save time.
    pub async fn save_scene(&self, scene: SceneSnapshot) -> Result<StoredScene, StoreError> {
        let stored = StoredScene { scene, saved_at: now_rfc3339() };
        write_json(&self.data_dir.join(STATE_FILE), &stored).await?;
        Ok(stored)
    }

    // =========================================================================
    // MAP LIBRARY
    // =========================================================================

    pub async fn list_maps(&self) -> Result<Vec<MapRecord>, StoreError> {
        self.read_registry().await
    }

    /// Raw PNG bytes of a stored map.
    pub async fn map_image(&self, id: &str) -> Result<Vec<u8>, StoreError> {
        let maps = self.read_registry().await?;
        let record = maps.iter().find(|m| m.id == id).ok_or_else(|| StoreError::NotFound(id.to_owned()))?;
        match tokio::fs::read(self.image_path(&record.filename)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound(id.to_owned())),
            Err(e) => Err(e.into()),
        }
    }

    /// Process and store an uploaded image as a new map.
    pub async fn put_map(&self, bytes: Vec<u8>, name: Option<String>) -> Result<MapRecord, StoreError> {
        if bytes.is_empty() {
            return Err(StoreError::EmptyUpload);
        }
        let max = self.max_map_dimension;
        let processed = tokio::task::spawn_blocking(move || process_map_image(&bytes, max)).await??;

        let id = new_map_id();
        let filename = format!("{id}.png");
        tokio::fs::write(self.image_path(&filename), &processed.png).await?;

        let now = now_rfc3339();
        let record = MapRecord {
            id,
            name: name.filter(|n| !n.trim().is_empty()).unwrap_or_else(|| UNTITLED_MAP.to_owned()),
            filename,
            width: processed.width,
            height: processed.height,
            created_at: now.clone(),
            last_used: now,
            thumbnail: processed.thumbnail,
        };

        let _guard = self.registry.lock().await;
        let mut maps = self.read_registry().await?;
        maps.push(record.clone());
        write_json(&self.data_dir.join(REGISTRY_FILE), &maps).await?;
        info!(id = %record.id, width = record.width, height = record.height, "store: map added");
        Ok(record)
    }

    /// Rename a map (when a non-empty name is given) and mark it used now.
    pub async fn update_map(&self, id: &str, name: Option<String>) -> Result<MapRecord, StoreError> {
        let _guard = self.registry.lock().await;
        let mut maps = self.read_registry().await?;
        let record = maps.iter_mut().find(|m| m.id == id).ok_or_else(|| StoreError::NotFound(id.to_owned()))?;
        if let Some(name) = name.filter(|n| !n.trim().is_empty()) {
            record.name = name;
        }
        record.last_used = now_rfc3339();
        let updated = record.clone();
        write_json(&self.data_dir.join(REGISTRY_FILE), &maps).await?;
        Ok(updated)
    }

    /// Remove a map and its image file.
    pub async fn delete_map(&self, id: &str) -> Result<(), StoreError> {
        let _guard = self.registry.lock().await;
        let mut maps = self.read_registry().await?;
        let Some(idx) = maps.iter().position(|m| m.id == id) else {
            return Err(StoreError::NotFound(id.to_owned()));
        };
        let record = maps.remove(idx);
        if let Err(e) = tokio::fs::remove_file(self.image_path(&record.filename)).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                return Err(e.into());
            }
        }
        write_json(&self.data_dir.join(REGISTRY_FILE), &maps).await?;
        info!(%id, "store: map deleted");
        Ok(())
    }

    async fn read_registry(&self) -> Result<Vec<MapRecord>, StoreError> {
        match read_optional(&self.data_dir.join(REGISTRY_FILE)).await? {
            Some(raw) => Ok(serde_json::from_slice(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    fn image_path(&self, filename: &str) -> PathBuf {
        self.data_dir.join(MAPS_DIR).join(filename)
    }
}

// =============================================================================
// IMAGE PROCESSING
// =============================================================================

/// Decode an upload, shrink it to fit `max_dimension` on the longest side,
/// re-encode as PNG and build a cover-cropped thumbnail.
///
/// # Errors
///
/// Fails when the bytes are not a supported image.
pub fn process_map_image(bytes: &[u8], max_dimension: u32) -> Result<ProcessedMap, StoreError> {
    let mut img = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?.decode()?;
    if img.width() > max_dimension || img.height() > max_dimension {
        img = img.resize(max_dimension, max_dimension, FilterType::Lanczos3);
    }
    let thumb = img.resize_to_fill(THUMBNAIL_PX, THUMBNAIL_PX, FilterType::Triangle);
    Ok(ProcessedMap {
        width: img.width(),
        height: img.height(),
        png: encode_png(&img)?,
        thumbnail: format!("data:image/png;base64,{}", STANDARD.encode(encode_png(&thumb)?)),
    })
}

fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, StoreError> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

// =============================================================================
// HELPERS
// =============================================================================

async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
    match tokio::fs::read(path).await {
        Ok(raw) => Ok(Some(raw)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let raw = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, raw).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// 16 hex characters from 8 random bytes.
fn new_map_id() -> String {
    let bytes: [u8; 8] = rand::random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}
