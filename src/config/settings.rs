//! Runtime settings read from the environment.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use log::warn;

use crate::config::server::{DEFAULT_BIND_ADDR, DEFAULT_COMFYUI_ADDR, DEFAULT_WORKFLOW_PATH};

/// Deployment settings for one server process.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Address the HTTP/WebSocket server listens on (`STABLEPHONE_BIND`).
    pub bind_addr: SocketAddr,
    /// `host:port` of the ComfyUI server (`COMFYUI_ADDR`).
    pub comfyui_addr: String,
    /// API-format workflow sent to ComfyUI (`COMFYUI_WORKFLOW`).
    pub workflow_path: PathBuf,
    /// Embedding endpoint for scoring (`EMBEDDING_URL`); lexical scoring when absent.
    pub embedding_url: Option<String>,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup. Missing or invalid values
    /// fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default_bind: SocketAddr = DEFAULT_BIND_ADDR
            .parse()
            .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 8000)));

        let bind_addr = match lookup("STABLEPHONE_BIND") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!("[Settings] Invalid STABLEPHONE_BIND '{}', using {}", raw, default_bind);
                default_bind
            }),
            None => default_bind,
        };

        let comfyui_addr = non_empty(lookup("COMFYUI_ADDR"))
            .unwrap_or_else(|| DEFAULT_COMFYUI_ADDR.to_string());
        let workflow_path = non_empty(lookup("COMFYUI_WORKFLOW"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_WORKFLOW_PATH));
        let embedding_url = non_empty(lookup("EMBEDDING_URL"));

        Self {
            bind_addr,
            comfyui_addr,
            workflow_path,
            embedding_url,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
