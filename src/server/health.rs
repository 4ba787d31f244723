//! Liveness endpoint.

use actix_web::{HttpResponse, http::StatusCode, web};
use log::warn;
use serde::Serialize;

use crate::game::types::Phase;
use crate::server::game_session::messages::{GetConnectionCount, GetSnapshot};
use crate::server::state::AppState;
use crate::server::ws_error::http_error_response;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub phase: Phase,
    pub round_number: u32,
    pub players: usize,
    pub connections: usize,
}

/// Asks the game session for its state; a dead actor yields 503.
pub async fn health(data: web::Data<AppState>) -> HttpResponse {
    let snapshot = data.game_session.send(GetSnapshot).await;
    let connections = data.game_session.send(GetConnectionCount).await;
    match (snapshot, connections) {
        (Ok(snapshot), Ok(connections)) => HttpResponse::Ok().json(HealthReport {
            status: "ok",
            phase: snapshot.phase,
            round_number: snapshot.round_number,
            players: snapshot.players.len(),
            connections,
        }),
        (Err(e), _) | (_, Err(e)) => {
            warn!("[Health] Game session unreachable: {}", e);
            http_error_response(
                "SESSION_UNAVAILABLE",
                "Game session is not responding",
                StatusCode::SERVICE_UNAVAILABLE,
            )
        }
    }
}
