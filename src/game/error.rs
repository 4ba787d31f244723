//! Errors raised by session transitions.

use thiserror::Error;

use crate::game::types::Phase;
use crate::gateway::GatewayError;

#[derive(Debug, Error)]
pub enum GameError {
    #[error("unknown player '{0}'")]
    UnknownPlayer(String),

    #[error("unknown chain owner '{0}'")]
    UnknownChainOwner(String),

    #[error("no valid chain assignment for {players} players after {trials} trials")]
    AssignmentExhausted { players: usize, trials: usize },

    #[error("image generation failed after {attempts} attempt(s): {cause}")]
    GenerationFailed {
        attempts: u32,
        #[source]
        cause: GatewayError,
    },

    #[error("'{action}' is not allowed in {phase:?} (round {round})")]
    WrongPhase {
        action: &'static str,
        phase: Phase,
        round: u32,
    },

    #[error("{player} is not assigned to the chain of {requested}")]
    NotAssigned { player: String, requested: String },

    #[error("{0} has already submitted this round")]
    AlreadySubmitted(String),

    #[error("a submission from {0} is still being generated")]
    SubmissionPending(String),

    #[error("a game is in progress, {0} cannot join until it is restarted")]
    GameInProgress(String),

    #[error("submission discarded after a game restart")]
    StaleSubmission,
}

impl GameError {
    /// Stable code sent to clients in error frames.
    pub fn code(&self) -> &'static str {
        match self {
            GameError::UnknownPlayer(_) => "UNKNOWN_PLAYER",
            GameError::UnknownChainOwner(_) => "UNKNOWN_CHAIN_OWNER",
            GameError::AssignmentExhausted { .. } => "ASSIGNMENT_EXHAUSTED",
            GameError::GenerationFailed { .. } => "GENERATION_FAILED",
            GameError::WrongPhase { .. } => "WRONG_PHASE",
            GameError::NotAssigned { .. } => "NOT_ASSIGNED",
            GameError::AlreadySubmitted(_) => "ALREADY_SUBMITTED",
            GameError::SubmissionPending(_) => "SUBMISSION_PENDING",
            GameError::GameInProgress(_) => "GAME_IN_PROGRESS",
            GameError::StaleSubmission => "STALE_SUBMISSION",
        }
    }

    /// Errors that leave the session untouched and are not worth reporting.
    pub fn is_noop(&self) -> bool {
        matches!(
            self,
            GameError::UnknownPlayer(_)
                | GameError::UnknownChainOwner(_)
                | GameError::StaleSubmission
        )
    }
}

impl From<GatewayError> for GameError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::RetriesExhausted { attempts, last } => GameError::GenerationFailed {
                attempts,
                cause: *last,
            },
            other => GameError::GenerationFailed {
                attempts: 1,
                cause: other,
            },
        }
    }
}
