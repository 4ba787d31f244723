/// Centralized helpers for WebSocket and HTTP error responses.
///
/// Use these helpers so every error frame has the same shape:
/// `{"type":"error","code":"...","message":"..."}`.
use actix_web::{HttpResponse, http::StatusCode};
use log::error;

use crate::game::error::GameError;
use crate::server::game_session::messages::ServerMessage;

/// Formats a WebSocket error frame as a JSON string.
///
/// # Arguments
/// - `code`: Unique error code (e.g. "INVALID_MESSAGE").
/// - `message`: Human-readable error message (in English).
pub fn ws_error_message(code: &str, message: &str) -> String {
    serde_json::to_string(&ServerMessage::error(code, message)).unwrap_or_else(|e| {
        error!("[WsError] Failed to serialize error frame: {}", e);
        r#"{"type":"error","code":"INTERNAL_ERROR","message":"Internal server error"}"#.to_string()
    })
}

/// Error frame for a rejected game action.
pub fn ws_game_error_message(err: &GameError) -> String {
    ws_error_message(err.code(), &err.to_string())
}

/// Returns an HTTP error response with a JSON body.
pub fn http_error_response(code: &str, message: &str, status: StatusCode) -> HttpResponse {
    HttpResponse::build(status).json(serde_json::json!({
        "error": { "code": code, "message": message }
    }))
}
