//! Scene lifecycle: restore on startup, library map loads, explicit scene
//! loads, debounced saves, roster drops and encounter population.
//!
//! The engine is shared as a `RefCell` and borrowed only between awaits, so
//! input and rendering keep running while a collaborator call is pending.
//! Collaborators are host-provided ports; none of their failures panic or
//! corrupt the scene.

#[cfg(test)]
#[path = "lifecycle_test.rs"]
mod lifecycle_test;

use std::cell::RefCell;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::camera::Point;
use crate::doc::new_id;
use crate::engine::{Action, EngineCore, MapLoadTicket};
use crate::roster::{EncounterMonster, MonsterRecord, PartyMember, TokenKind, TokenSeed, drop_token};
use crate::scene::{Background, BackgroundError};
use crate::snapshot::SceneSnapshot;

/// Failure reported by a collaborator.
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Failed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
    #[error("map image unreadable: {0}")]
    Background(#[from] BackgroundError),
}

/// Result of a library map load that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapLoad {
    Applied(Vec<Action>),
    /// A later background change won; nothing was applied.
    Superseded,
}

/// Where the current scene is persisted between sessions.
#[async_trait(?Send)]
pub trait SceneStore {
    /// The last saved scene, if any.
    async fn load(&self) -> Result<Option<SceneSnapshot>, CollaboratorError>;

    async fn save(&self, snapshot: &SceneSnapshot) -> Result<(), CollaboratorError>;
}

/// Library of uploaded maps.
#[async_trait(?Send)]
pub trait MapLibrary {
    /// Full image bytes of a stored map.
    async fn map_image(&self, map_id: &str) -> Result<Vec<u8>, CollaboratorError>;

    /// Record that a map was just used.
    async fn touch(&self, map_id: &str) -> Result<(), CollaboratorError>;
}

/// Monster statblock lookup by slug.
#[async_trait(?Send)]
pub trait MonsterLookup {
    async fn monster(&self, slug: &str) -> Result<Option<MonsterRecord>, CollaboratorError>;
}

pub struct SceneLifecycle<S, L, M> {
    pub store: S,
    pub library: L,
    pub monsters: M,
}

impl<S: SceneStore, L: MapLibrary, M: MonsterLookup> SceneLifecycle<S, L, M> {
    #[must_use]
    pub fn new(store: S, library: L, monsters: M) -> Self {
        Self { store, library, monsters }
    }

    /// Restore the last saved scene. A missing map is logged and skipped;
    /// the rest of the scene still loads. Nothing saved, an unreachable
    /// store, or a newer map load started meanwhile leaves the scene as it is.
    pub async fn restore(&self, engine: &RefCell<EngineCore>, now_ms: f64) -> Vec<Action> {
        let snapshot = match self.store.load().await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return Vec::new(),
            Err(err) => {
                warn!(error = %err, "lifecycle: scene restore failed");
                return Vec::new();
            }
        };
        let mut actions = Vec::new();
        if let Some(map_id) = snapshot.map_id.as_deref() {
            let ticket = engine.borrow_mut().begin_map_load(map_id);
            match self.fetch_map(engine, &ticket, now_ms).await {
                Ok(MapLoad::Applied(loaded)) => actions = loaded,
                Ok(MapLoad::Superseded) => {
                    info!(%map_id, "lifecycle: restore overtaken by a newer map");
                    return Vec::new();
                }
                Err(err) => {
                    if !engine.borrow().is_current(&ticket) {
                        return Vec::new();
                    }
                    warn!(%map_id, error = %err, "lifecycle: saved map unavailable");
                }
            }
        }
        actions.extend(engine.borrow_mut().apply_snapshot(&snapshot, now_ms));
        actions.dedup();
        info!(tokens = snapshot.tokens.len(), "lifecycle: scene restored");
        actions
    }

    /// Load a library map as the background. A load overtaken by a later
    /// background change is dropped and reports [`MapLoad::Superseded`].
    ///
    /// # Errors
    ///
    /// Fails when the library cannot provide the map or its image is
    /// unreadable. The scene is unchanged in that case.
    pub async fn load_from_library(
        &self,
        engine: &RefCell<EngineCore>,
        map_id: &str,
        now_ms: f64,
    ) -> Result<MapLoad, LifecycleError> {
        let ticket = engine.borrow_mut().begin_map_load(map_id);
        self.fetch_map(engine, &ticket, now_ms).await
    }

    async fn fetch_map(
        &self,
        engine: &RefCell<EngineCore>,
        ticket: &MapLoadTicket,
        now_ms: f64,
    ) -> Result<MapLoad, LifecycleError> {
        let map_id = ticket.map_id.as_str();
        let bytes = self.library.map_image(map_id).await?;
        let background = Background::from_bytes(&bytes)?;

        let Some(actions) = engine.borrow_mut().finish_map_load(ticket, background, now_ms) else {
            return Ok(MapLoad::Superseded);
        };
        if let Err(err) = self.library.touch(map_id).await {
            warn!(%map_id, error = %err, "lifecycle: map touch failed");
        }
        Ok(MapLoad::Applied(actions))
    }

    /// Load a stored scene, e.g. one saved with an encounter. The map
    /// resolves first; a scene without one clears the background.
    ///
    /// # Errors
    ///
    /// Fails when the scene names a map that cannot be loaded. Nothing is
    /// applied in that case, nor when a newer background change overtakes
    /// the map load.
    pub async fn load_scene(
        &self,
        engine: &RefCell<EngineCore>,
        snapshot: &SceneSnapshot,
        now_ms: f64,
    ) -> Result<Vec<Action>, LifecycleError> {
        let mut actions = match snapshot.map_id.as_deref() {
            Some(map_id) => match self.load_from_library(engine, map_id, now_ms).await? {
                MapLoad::Applied(actions) => actions,
                MapLoad::Superseded => {
                    info!(%map_id, "lifecycle: scene load overtaken by a newer map");
                    return Ok(Vec::new());
                }
            },
            None => engine.borrow_mut().clear_background(now_ms),
        };
        actions.extend(engine.borrow_mut().apply_snapshot(snapshot, now_ms));
        actions.dedup();
        Ok(actions)
    }

    /// Save right away, dropping any pending debounced save.
    ///
    /// # Errors
    ///
    /// Returns the store's failure.
    pub async fn save_now(&self, engine: &RefCell<EngineCore>) -> Result<(), LifecycleError> {
        let snapshot = {
            let mut core = engine.borrow_mut();
            core.autosave.cancel();
            core.save_current_scene()
        };
        self.store.save(&snapshot).await?;
        Ok(())
    }

    /// Per-frame housekeeping: animations, then the debounced save once it
    /// is due. Save failures are logged and the scene keeps going.
    pub async fn tick(&self, engine: &RefCell<EngineCore>, now_ms: f64) -> Vec<Action> {
        let (actions, due) = {
            let mut core = engine.borrow_mut();
            (core.tick(now_ms), core.take_due_save(now_ms))
        };
        if let Some(snapshot) = due {
            if let Err(err) = self.store.save(&snapshot).await {
                warn!(error = %err, "lifecycle: autosave failed");
            }
        }
        actions
    }

    /// A roster entry was dropped on the canvas at `screen`. Size and HP come
    /// from the monster lookup when the entry has a slug; a failed lookup
    /// still places a default token.
    pub async fn spawn_from_drop(
        &self,
        engine: &RefCell<EngineCore>,
        seed: TokenSeed,
        screen: Point,
        now_ms: f64,
    ) -> Vec<Action> {
        let cell = {
            let mut core = engine.borrow_mut();
            core.scene.set_drop_preview(None);
            core.scene.space().screen_to_cell(screen)
        };
        let monster = match seed.slug.as_deref() {
            Some(slug) => self.lookup(slug).await,
            None => None,
        };
        let token = drop_token(seed, monster.as_ref(), cell);
        engine.borrow_mut().insert_token(token, now_ms)
    }

    /// Place a token for every party member, then every monster copy of an
    /// encounter. Monster sizes come from the lookup; unknown ones are
    /// Medium.
    pub async fn populate_from_encounter(
        &self,
        engine: &RefCell<EngineCore>,
        party: &[PartyMember],
        monsters: &[EncounterMonster],
        now_ms: f64,
    ) -> Vec<Action> {
        let mut actions = Vec::new();
        for member in party {
            let (_, placed) = engine.borrow_mut().add_token(
                &member.name,
                TokenKind::Player.color(),
                1.0,
                None,
                Some(member.id.clone()),
                now_ms,
            );
            actions.extend(placed);
        }
        for entry in monsters {
            let size = self.lookup(&entry.slug).await.map_or(1.0, |m| m.grid_size());
            for name in entry.token_names() {
                let (_, placed) = engine.borrow_mut().add_token(
                    &name,
                    TokenKind::Monster.color(),
                    size,
                    Some(entry.slug.clone()),
                    Some(new_id()),
                    now_ms,
                );
                actions.extend(placed);
            }
        }
        actions.dedup();
        actions
    }

    async fn lookup(&self, slug: &str) -> Option<MonsterRecord> {
        match self.monsters.monster(slug).await {
            Ok(found) => found,
            Err(err) => {
                warn!(%slug, error = %err, "lifecycle: monster lookup failed");
                None
            }
        }
    }
}
