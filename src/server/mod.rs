// src/server/mod.rs

//! Server layer root module.
//!
//! This module organizes the backend server components, including:
//! - Application state management
//! - HTTP/WebSocket routing and health
//! - Connection registry (broadcast fan-out)
//! - Game session orchestration (phase machine driving, client sessions)

pub mod game_session;
pub mod health;
pub mod registry;
pub mod router;
pub mod state;
pub mod ws_error;
