use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize, Serializer};

/// Phase of the shared session.
///
/// `Playing` goes over the wire as `"game"`, the name the web client switches on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Lobby,
    #[serde(rename = "game")]
    Playing,
    Gallery,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub ready: bool,
}

impl Player {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ready: false,
        }
    }
}

/// Generated picture, kept base64-encoded so snapshots clone it for free.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image(Arc<str>);

impl Image {
    pub fn from_png(bytes: &[u8]) -> Self {
        Self(Arc::from(STANDARD.encode(bytes)))
    }

    pub fn as_base64(&self) -> &str {
        &self.0
    }
}

impl Serialize for Image {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// One prompt or description and the image generated from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    #[serde(rename = "player")]
    pub author: String,
    pub prompt: String,
    pub image: Image,
}

/// Turns of one chain, oldest first. Keyed by the owner's name in the session.
pub type Chain = Vec<Turn>;
