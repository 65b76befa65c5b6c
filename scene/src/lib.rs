//! Battlemap scene engine for tabletop sessions.
//!
//! One authoring view (the DM) edits a grid-aligned scene of tokens, area
//! effects and fog of war over a background map; any number of read-only
//! player views mirror it through `scene:sync` frames. Logic and rendering
//! decisions are plain Rust and tested natively. With the `web` feature the
//! crate also compiles to WebAssembly and paints onto a canvas element; the
//! host page only wires DOM events to the engine and acts on the returned
//! [`engine::Action`]s.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Host-facing engine and testable [`engine::EngineCore`] |
//! | [`scene`] | Scene state and every mutation, reporting a [`scene::Change`] |
//! | [`doc`] | Token and area-effect types |
//! | [`camera`] | Pan/zoom camera and screen/world/grid conversions |
//! | [`fog`] | Fog-of-war alpha mask and its portable form |
//! | [`hit`] | Area-effect geometry and hit-testing |
//! | [`input`] | Tools, input intents and gesture state |
//! | [`tools`] | Tool controller turning intents into scene mutations |
//! | [`render`] | Display-list rendering for DM and player views |
//! | [`paint`] | Canvas 2D replay of display lists (feature `web`) |
//! | [`snapshot`] | Persisted and player-view snapshots, ruler distance |
//! | [`sync`] | Player-view push and debounced save timer |
//! | [`viewer`] | Player-view projection of inbound frames |
//! | [`roster`] | Token hydration from party, encounter and statblock data |
//! | [`lifecycle`] | Restore, map loads, saves and roster spawns over async ports |
//! | [`consts`] | Shared numeric constants (zoom limits, grid, lifetimes, etc.) |

pub mod camera;
pub mod consts;
pub mod doc;
pub mod engine;
pub mod fog;
pub mod hit;
pub mod input;
pub mod lifecycle;
#[cfg(feature = "web")]
pub mod paint;
pub mod render;
pub mod roster;
pub mod scene;
pub mod snapshot;
pub mod sync;
pub mod tools;
pub mod viewer;
