use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::room::{PlayerId, RoomCode, RoomStatus};

/// Top-level error type for the entire mindmeld system
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum MindmeldError {
    #[error("Room error: {0}")]
    Room(#[from] RoomError),

    #[error("Game error: {0}")]
    Game(#[from] GameError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
}

/// Roster and lifecycle errors
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum RoomError {
    #[error("Room not found: {code}")]
    RoomNotFound { code: RoomCode },

    #[error("Room {code} is full")]
    RoomFull { code: RoomCode },

    #[error("Room {code} is already {status}")]
    NotJoinable { code: RoomCode, status: RoomStatus },

    #[error("Only the host can {action}")]
    NotHost { action: String },

    #[error("Player not found: {player_id}")]
    PlayerNotFound { player_id: PlayerId },
}

/// Round-engine errors
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum GameError {
    #[error("No game in progress in room {code}")]
    NotInProgress { code: RoomCode },

    #[error("Card pool exhausted: requested {requested} with {remaining} undealt")]
    DeckExhausted { requested: usize, remaining: usize },
}

/// WebSocket framing errors
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum NetworkError {
    #[error("Message serialization failed: {details}")]
    SerializationFailed { details: String },

    #[error("Message deserialization failed: {details}")]
    DeserializationFailed { details: String },
}

/// Result type aliases for convenience
pub type MindmeldResult<T> = Result<T, MindmeldError>;
pub type RoomResult<T> = Result<T, RoomError>;
pub type GameResult<T> = Result<T, GameError>;

/// Helper methods for creating common errors
impl RoomError {
    pub fn not_found(code: impl Into<RoomCode>) -> Self {
        Self::RoomNotFound { code: code.into() }
    }

    pub fn not_host(action: impl Into<String>) -> Self {
        Self::NotHost {
            action: action.into(),
        }
    }
}
