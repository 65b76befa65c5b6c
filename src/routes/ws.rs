//! WebSocket handler for the player-view relay.
//!
//! DESIGN
//! ======
//! Every socket joins as either the DM or a player (`?role=dm|player`,
//! players by default). The DM pushes `scene:sync` frames; the relay
//! re-stamps and fans them out to every player socket. A player that sends
//! `viewer:hello` gets the latest frame replayed, which is also done once on
//! connect.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → players subscribe and receive the latest frame, if any
//! 2. Inbound binary frames → `process_inbound` → zero or more replies
//! 3. Relay frames (players only) → forward to socket
//! 4. Close → drop subscription

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use frames::{VIEWER_HELLO, decode_frame};
use serde::Deserialize;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::state::AppState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Dm,
    #[default]
    Player,
}

#[derive(Debug, Default, Deserialize)]
pub struct WsParams {
    #[serde(default)]
    pub role: Role,
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state, params.role))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState, role: Role) {
    let client_id = Uuid::new_v4();

    let mut relay_rx = match role {
        Role::Player => Some(state.relay.subscribe()),
        Role::Dm => None,
    };
    if role == Role::Player {
        if let Some(latest) = state.relay.latest().await {
            if send_bytes(&mut socket, latest.as_ref().clone()).await.is_err() {
                return;
            }
        }
    }

    info!(%client_id, ?role, players = state.relay.player_count(), "ws: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Binary(bytes) => {
                        let mut sent = true;
                        for reply in process_inbound(&state, role, &bytes).await {
                            sent = send_bytes(&mut socket, reply).await.is_ok();
                            if !sent {
                                break;
                            }
                        }
                        if !sent {
                            break;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            frame = next_sync(&mut relay_rx) => {
                match frame {
                    Ok(bytes) => {
                        if send_bytes(&mut socket, bytes.as_ref().clone()).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(%client_id, skipped, "ws: player lagged, skipping to newer frames");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    info!(%client_id, ?role, "ws: client disconnected");
}

/// Next relayed frame for a player. DM sockets have no subscription and
/// never resolve here.
async fn next_sync(rx: &mut Option<broadcast::Receiver<Arc<Vec<u8>>>>) -> Result<Arc<Vec<u8>>, RecvError> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn send_bytes(socket: &mut WebSocket, bytes: Vec<u8>) -> Result<(), axum::Error> {
    socket.send(Message::Binary(bytes.into())).await
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Handle one inbound binary frame. Returns the frames to send back to the
/// same socket.
pub(crate) async fn process_inbound(state: &AppState, role: Role, bytes: &[u8]) -> Vec<Vec<u8>> {
    match role {
        Role::Dm => {
            match state.relay.publish(bytes).await {
                Ok(seq) => debug!(seq, players = state.relay.player_count(), "ws: scene relayed"),
                Err(e) => warn!(error = %e, "ws: dropped frame from dm"),
            }
            Vec::new()
        }
        Role::Player => {
            let frame = match decode_frame(bytes) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(error = %e, "ws: undecodable frame from player");
                    return Vec::new();
                }
            };
            if frame.syscall != VIEWER_HELLO {
                debug!(syscall = %frame.syscall, "ws: ignoring player frame");
                return Vec::new();
            }
            state.relay.latest().await.map(|latest| latest.as_ref().clone()).into_iter().collect()
        }
    }
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
