// Mindmeld Server Library - Core Module Organization
//
// This file serves as the central organization point for the mindmeld game
// server: the room/session engine, the wire protocol, and the WebSocket
// transport.

// Core game data structures
pub mod deck;
pub mod game;
pub mod room;

// Wire protocol
pub mod messages;

// Server implementation
pub mod service;
pub mod ws;

// Error types
pub mod errors;

// Re-export common types for convenient access
pub use crate::deck::CardDeck;
pub use crate::errors::{GameError, MindmeldError, MindmeldResult, NetworkError, RoomError};
pub use crate::game::{GameState, PlayOutcome, MAX_LIVES};
pub use crate::messages::{ClientMessage, ServerMessage};
pub use crate::room::{Participant, Room, RoomStatus, MAX_PLAYERS};
pub use crate::service::RoomService;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
