use std::sync::Arc;

use actix::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::error::GameError;
use crate::game::state::GameSnapshot;

/// Client -> server events, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Join {
        name: String,
    },
    Ready {
        name: String,
    },
    SubmitPrompt {
        name: String,
        prompt: String,
    },
    SubmitDescription {
        name: String,
        description: String,
        chain_owner: String,
    },
    RestartGame,
}

impl ClientMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Join { .. } => "join",
            ClientMessage::Ready { .. } => "ready",
            ClientMessage::SubmitPrompt { .. } => "submit_prompt",
            ClientMessage::SubmitDescription { .. } => "submit_description",
            ClientMessage::RestartGame => "restart_game",
        }
    }
}

/// Server -> client frames, tagged by `type`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    GameState(GameSnapshot),
    Error { code: String, message: String },
}

impl ServerMessage {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }

    pub fn from_game_error(err: &GameError) -> Self {
        Self::error(err.code(), err.to_string())
    }
}

/// Already-serialized frame, shared by every recipient of a broadcast.
#[derive(Message, Debug, Clone)]
#[rtype(result = "()")]
pub struct OutboundText(pub Arc<str>);

impl OutboundText {
    pub fn encode(msg: &ServerMessage) -> Result<Self, serde_json::Error> {
        Ok(Self(Arc::from(serde_json::to_string(msg)?)))
    }
}

/// One client event, answered with the outcome for the sending connection.
#[derive(Message)]
#[rtype(result = "Result<(), GameError>")]
pub struct ProcessClientMessage {
    pub conn_id: Uuid,
    pub msg: ClientMessage,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Connect {
    pub conn_id: Uuid,
    pub addr: Recipient<OutboundText>,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Disconnect {
    pub conn_id: Uuid,
}

#[derive(Message)]
#[rtype(result = "GameSnapshot")]
pub struct GetSnapshot;

/// Number of connections currently in the broadcast set.
#[derive(Message)]
#[rtype(result = "usize")]
pub struct GetConnectionCount;
