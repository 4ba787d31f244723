//! External collaborators: image generation and prompt similarity scoring.
//!
//! Both are reached through traits so the session actor never depends on a
//! concrete backend, and tests can plug in deterministic fakes.

pub mod comfyui;
pub mod generation;
pub mod scoring;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("websocket error: {0}")]
    WebSocket(#[from] Box<tokio_tungstenite::tungstenite::Error>),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unexpected response: {0}")]
    Protocol(String),

    #[error("attempt timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("gave up after {attempts} attempts, last error: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<GatewayError>,
    },
}

impl From<tokio_tungstenite::tungstenite::Error> for GatewayError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        GatewayError::WebSocket(Box::new(err))
    }
}
