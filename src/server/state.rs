// src/server/state.rs

//! Application state for the backend server.
//!
//! Holds the address of the game session actor so HTTP/WebSocket handlers
//! can reach it.

use actix::Addr;

use crate::server::game_session::GameSession;

/// Shared application state, injected into HTTP/WebSocket handlers.
pub struct AppState {
    /// Address of the game session actor (single shared session).
    pub game_session: Addr<GameSession>,
}

impl AppState {
    pub fn new(game_session: Addr<GameSession>) -> Self {
        AppState { game_session }
    }
}
