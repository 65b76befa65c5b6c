//! Engine: the scene, the tool controller and the outbound plumbing behind
//! one host-facing API.
//!
//! `EngineCore` holds all logic that does not touch the browser, so it is
//! tested natively. Every mutating call takes the host clock (`now_ms`) and
//! returns [`Action`]s; the [`Change`] each scene mutation reports is turned
//! into an immediate player-view push and a re-armed autosave here, in one
//! place. `Engine` (feature `web`) adds the canvas painter on top.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use tracing::info;

use crate::camera::Size;
use crate::doc::Token;
use crate::input::{Intent, Tool};
use crate::render::{DisplayList, render};
use crate::scene::{Background, BackgroundError, Change, CombatReadyToken, RollKind, Scene};
use crate::snapshot::{PlayerSnapshot, SceneSnapshot};
use crate::sync::{Debouncer, ViewSync, ViewerLink};
use crate::tools::ToolController;

const DEFAULT_GLOW_COLOR: &str = "#f1c40f";

/// Actions returned from engine calls for the host to process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Schedule a repaint.
    RenderNeeded,
    /// A token was clicked without being moved. Carries its combatant id
    /// when linked, its scene id otherwise.
    TokenSelected(String),
}

/// Handle for an in-flight library load. A load completes only if no other
/// background change happened since it began.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapLoadTicket {
    epoch: u64,
    pub map_id: String,
}

type SelectListener = Box<dyn FnMut(&str)>;

/// Core engine state: everything that doesn't depend on the canvas element.
#[derive(Default)]
pub struct EngineCore {
    pub scene: Scene,
    pub tools: ToolController,
    pub sync: ViewSync,
    pub autosave: Debouncer,
    map_epoch: u64,
    on_token_select: Option<SelectListener>,
}

impl EngineCore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the selection-notification callback.
    pub fn set_on_token_select(&mut self, listener: impl FnMut(&str) + 'static) {
        self.on_token_select = Some(Box::new(listener));
    }

    /// Attach a player view and bring it up to date at once.
    pub fn attach_viewer(&mut self, link: Box<dyn ViewerLink>, now_ms: f64) {
        self.sync.attach(link);
        self.push_sync(now_ms);
    }

    // --- Plumbing ---

    fn commit(&mut self, change: Change, now_ms: f64) -> Vec<Action> {
        if change.sync {
            self.push_sync(now_ms);
        }
        if change.persist {
            self.autosave.touch(now_ms);
        }
        if change.render { vec![Action::RenderNeeded] } else { Vec::new() }
    }

    fn push_sync(&mut self, now_ms: f64) {
        if self.sync.is_connected() {
            let snapshot = self.scene.player_snapshot();
            self.sync.push(&snapshot, now_ms);
        }
    }

    // --- Input ---

    /// Feed one pointer or drag intent.
    pub fn handle(&mut self, intent: &Intent, now_ms: f64) -> Vec<Action> {
        let outcome = self.tools.handle(&mut self.scene, intent);
        let mut actions = self.commit(outcome.change, now_ms);
        if let Some(id) = outcome.token_selected {
            if let Some(listener) = self.on_token_select.as_mut() {
                listener(&id);
            }
            actions.push(Action::TokenSelected(id));
        }
        actions
    }

    pub fn set_tool(&mut self, tool: Tool, now_ms: f64) -> Vec<Action> {
        let change = self.tools.set_tool(&mut self.scene, tool);
        self.commit(change, now_ms)
    }

    // --- Layout and background ---

    pub fn layout(&mut self, container: Size, now_ms: f64) -> Vec<Action> {
        let change = self.scene.layout(container);
        self.commit(change | Change::RENDER, now_ms)
    }

    /// Use uploaded image bytes as the background. Not a library map, so the
    /// map id is cleared. Supersedes any library load in flight.
    ///
    /// # Errors
    ///
    /// Fails when the bytes are not a readable image; the scene is unchanged.
    pub fn load_background(&mut self, bytes: &[u8], now_ms: f64) -> Result<Vec<Action>, BackgroundError> {
        let background = Background::from_bytes(bytes)?;
        self.map_epoch += 1;
        let change = self.scene.set_background(Some(background), None);
        Ok(self.commit(change, now_ms))
    }

    pub fn clear_background(&mut self, now_ms: f64) -> Vec<Action> {
        self.map_epoch += 1;
        let change = self.scene.clear_background();
        self.commit(change, now_ms)
    }

    /// Start a library load. Any load started earlier becomes stale.
    pub fn begin_map_load(&mut self, map_id: &str) -> MapLoadTicket {
        self.map_epoch += 1;
        MapLoadTicket { epoch: self.map_epoch, map_id: map_id.to_owned() }
    }

    #[must_use]
    pub fn is_current(&self, ticket: &MapLoadTicket) -> bool {
        ticket.epoch == self.map_epoch
    }

    /// Complete a library load. Returns `None`, leaving the scene untouched,
    /// when the ticket has been superseded.
    pub fn finish_map_load(&mut self, ticket: &MapLoadTicket, background: Background, now_ms: f64) -> Option<Vec<Action>> {
        if !self.is_current(ticket) {
            info!(map_id = %ticket.map_id, "engine: superseded map load discarded");
            return None;
        }
        let change = self.scene.set_background(Some(background), Some(ticket.map_id.clone()));
        Some(self.commit(change, now_ms))
    }

    // --- Settings ---

    pub fn set_grid_size(&mut self, grid_size: f64, now_ms: f64) -> Vec<Action> {
        let change = self.scene.set_grid_size(grid_size);
        self.commit(change, now_ms)
    }

    pub fn set_show_grid(&mut self, show: bool, now_ms: f64) -> Vec<Action> {
        let change = self.scene.set_show_grid(show);
        self.commit(change, now_ms)
    }

    pub fn set_fog_enabled(&mut self, enabled: bool, now_ms: f64) -> Vec<Action> {
        let change = self.scene.set_fog_enabled(enabled);
        self.commit(change, now_ms)
    }

    pub fn reveal_all_fog(&mut self, now_ms: f64) -> Vec<Action> {
        let change = self.scene.reveal_all_fog();
        self.commit(change, now_ms)
    }

    pub fn hide_all_fog(&mut self, now_ms: f64) -> Vec<Action> {
        let change = self.scene.hide_all_fog();
        self.commit(change, now_ms)
    }

    // --- Tokens and shapes ---

    /// Add a token on the first free cell. Returns the placed token.
    pub fn add_token(
        &mut self,
        name: &str,
        color: &str,
        size: f64,
        slug: Option<String>,
        related_id: Option<String>,
        now_ms: f64,
    ) -> (Token, Vec<Action>) {
        let (token, change) = self.scene.add_token(name, color, size, slug, related_id);
        (token, self.commit(change, now_ms))
    }

    pub fn insert_token(&mut self, token: Token, now_ms: f64) -> Vec<Action> {
        let change = self.scene.insert_token(token);
        self.commit(change, now_ms)
    }

    pub fn remove_token(&mut self, id: &str, now_ms: f64) -> Vec<Action> {
        let change = self.scene.remove_token(id);
        self.commit(change, now_ms)
    }

    pub fn update_token_hp(&mut self, id: &str, hp: i32, now_ms: f64) -> Vec<Action> {
        let change = self.scene.update_token_hp(id, hp);
        self.commit(change, now_ms)
    }

    pub fn clear_tokens(&mut self, now_ms: f64) -> Vec<Action> {
        let change = self.scene.clear_tokens();
        self.commit(change, now_ms)
    }

    pub fn clear_area_effects(&mut self, now_ms: f64) -> Vec<Action> {
        let change = self.scene.clear_area_effects();
        self.commit(change, now_ms)
    }

    pub fn end_encounter(&mut self, now_ms: f64) -> Vec<Action> {
        self.map_epoch += 1;
        let change = self.scene.end_encounter();
        self.commit(change, now_ms)
    }

    // --- Combat integration ---

    /// Select by combat instance id; `None` deselects.
    pub fn select_token(&mut self, instance_id: Option<&str>, now_ms: f64) -> Vec<Action> {
        let change = self.scene.select_by_instance(instance_id);
        self.commit(change, now_ms)
    }

    pub fn pan_to_token(&mut self, instance_id: &str, now_ms: f64) -> Vec<Action> {
        let change = self.scene.pan_to_token(instance_id);
        self.commit(change, now_ms)
    }

    #[must_use]
    pub fn combat_ready_tokens(&self) -> Vec<CombatReadyToken> {
        self.scene.combat_ready_tokens()
    }

    /// Float a roll result over a token. Unknown kinds use the default color.
    pub fn show_roll_popup(&mut self, token_id: &str, text: &str, kind: &str, now_ms: f64) -> Vec<Action> {
        let change = self.scene.show_roll_popup(token_id, text, RollKind::parse(kind), now_ms);
        self.commit(change, now_ms)
    }

    pub fn glow_token(&mut self, token_id: &str, color: Option<&str>, now_ms: f64) -> Vec<Action> {
        let change = self.scene.glow_token(token_id, color.unwrap_or(DEFAULT_GLOW_COLOR), now_ms);
        self.commit(change, now_ms)
    }

    pub fn set_active_turn(&mut self, combatant_id: Option<&str>, now_ms: f64) -> Vec<Action> {
        let change = self.scene.set_active_turn(combatant_id);
        self.commit(change, now_ms)
    }

    pub fn update_hp_by_instance(&mut self, instance_id: &str, hp: i32, now_ms: f64) -> Vec<Action> {
        let change = self.scene.update_hp_by_instance(instance_id, hp);
        self.commit(change, now_ms)
    }

    // --- Snapshots ---

    /// The persisted snapshot, e.g. to store with an encounter.
    #[must_use]
    pub fn save_current_scene(&self) -> SceneSnapshot {
        self.scene.snapshot()
    }

    #[must_use]
    pub fn player_snapshot(&self) -> PlayerSnapshot {
        self.scene.player_snapshot()
    }

    /// Apply persisted fields. Background resolution is the caller's job.
    pub fn apply_snapshot(&mut self, snapshot: &SceneSnapshot, now_ms: f64) -> Vec<Action> {
        let change = self.scene.apply_snapshot(snapshot);
        self.commit(change, now_ms)
    }

    // --- Time ---

    /// Advance animations. Keeps requesting frames while popups or glows
    /// are alive.
    pub fn tick(&mut self, now_ms: f64) -> Vec<Action> {
        let change = self.scene.prune_transients(now_ms);
        if change.render || self.scene.has_transients() { vec![Action::RenderNeeded] } else { Vec::new() }
    }

    /// The snapshot to persist, once the autosave quiet period has elapsed.
    pub fn take_due_save(&mut self, now_ms: f64) -> Option<SceneSnapshot> {
        self.autosave.poll(now_ms).then(|| self.scene.snapshot())
    }

    /// The authoring view's display list.
    #[must_use]
    pub fn render(&self, now_ms: f64) -> DisplayList {
        render(&self.scene, now_ms, false)
    }
}

#[cfg(feature = "web")]
pub use web::Engine;

#[cfg(feature = "web")]
mod web {
    use wasm_bindgen::JsValue;
    use web_sys::{HtmlCanvasElement, HtmlImageElement};

    use super::EngineCore;
    use crate::paint::Painter;

    /// The full canvas engine. Wraps `EngineCore` and owns the browser painter.
    pub struct Engine {
        painter: Painter,
        pub core: EngineCore,
    }

    impl Engine {
        /// Create a new engine bound to the given canvas element.
        ///
        /// # Errors
        ///
        /// Fails when the canvas has no 2D context.
        pub fn new(canvas: &HtmlCanvasElement) -> Result<Self, JsValue> {
            Ok(Self { painter: Painter::new(canvas)?, core: EngineCore::new() })
        }

        /// Hand over the decoded background image element.
        pub fn set_background_image(&mut self, image: Option<HtmlImageElement>) {
            self.painter.set_background(image);
        }

        /// Draw the current state to the canvas.
        pub fn render(&mut self, now_ms: f64) {
            let list = self.core.render(now_ms);
            let result = self.painter.upload_fog(&self.core.scene.fog).and_then(|()| self.painter.paint(&list));
            if let Err(err) = result {
                tracing::error!(error = ?err, "engine: paint failed");
            }
        }
    }
}
