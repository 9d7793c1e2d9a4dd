use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::errors::RoomError;
use crate::game::GameState;
use crate::messages::ServerMessage;

/// Unique identifier for participants
pub type PlayerId = String;

/// Short join code identifying a live room
pub type RoomCode = String;

pub const MAX_PLAYERS: usize = 4;

const CODE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CODE_LEN: usize = 6;

/// Room lifecycle status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Lobby,
    Playing,
    Finished,
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomStatus::Lobby => write!(f, "in the lobby"),
            RoomStatus::Playing => write!(f, "playing"),
            RoomStatus::Finished => write!(f, "finished"),
        }
    }
}

/// One connected player inside a room. The hand stays sorted ascending; the
/// outbound channel handle is how every message reaches this player's
/// connection.
#[derive(Debug)]
pub struct Participant {
    pub id: PlayerId,
    pub name: String,
    pub is_host: bool,
    pub hand: Vec<u8>,
    pub tx: UnboundedSender<ServerMessage>,
}

impl Participant {
    pub fn new(name: String, is_host: bool, tx: UnboundedSender<ServerMessage>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            is_host,
            hand: Vec::new(),
            tx,
        }
    }

    pub fn lowest_card(&self) -> Option<u8> {
        // hands are kept sorted, so the minimum is the first entry
        self.hand.first().copied()
    }

    pub fn summary(&self) -> PlayerSummary {
        PlayerSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            is_host: self.is_host,
            hand_size: self.hand.len(),
        }
    }
}

/// Roster entry as it appears on the wire. Carries the hand size, never the
/// hand itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub name: String,
    pub is_host: bool,
    pub hand_size: usize,
}

/// A hand exposed to the whole room during the round-over reveal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealedHand {
    pub id: PlayerId,
    pub name: String,
    pub hand: Vec<u8>,
}

/// What happened to the room when a participant was removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// The roster became empty; the caller must drop the room.
    RoomDeleted,
    /// Others remain. `new_host` is set when host authority moved to the
    /// earliest-joined remaining participant.
    Departed {
        remaining: usize,
        new_host: Option<(PlayerId, String)>,
    },
}

/// An isolated game session: join code, lifecycle status, join-ordered
/// roster, and the active round state while playing.
#[derive(Debug)]
pub struct Room {
    pub code: RoomCode,
    pub status: RoomStatus,
    pub players: Vec<Participant>,
    pub game: Option<GameState>,
}

impl Room {
    pub fn new(code: RoomCode, host: Participant) -> Self {
        Self {
            code,
            status: RoomStatus::Lobby,
            players: vec![host],
            game: None,
        }
    }

    pub fn player(&self, player_id: &str) -> Option<&Participant> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn is_host(&self, player_id: &str) -> bool {
        self.player(player_id).is_some_and(|p| p.is_host)
    }

    /// Add a participant to the roster. Rooms accept players only while in
    /// the lobby and below the player cap.
    pub fn add_player(&mut self, player: Participant) -> Result<(), RoomError> {
        if self.players.len() >= MAX_PLAYERS {
            return Err(RoomError::RoomFull {
                code: self.code.clone(),
            });
        }
        if self.status != RoomStatus::Lobby {
            return Err(RoomError::NotJoinable {
                code: self.code.clone(),
                status: self.status.clone(),
            });
        }
        self.players.push(player);
        Ok(())
    }

    /// Remove a participant. Reassigns the host flag to the earliest-joined
    /// remaining participant when the host departs, and abandons any game in
    /// progress (the room falls back to the lobby; the round state is
    /// dropped, not resumable). Returns `None` when the id is not in the
    /// roster.
    pub fn remove_player(&mut self, player_id: &str) -> Option<(Participant, LeaveOutcome)> {
        let idx = self.players.iter().position(|p| p.id == player_id)?;
        let departed = self.players.remove(idx);

        if self.players.is_empty() {
            return Some((departed, LeaveOutcome::RoomDeleted));
        }

        let new_host = if departed.is_host {
            let next = &mut self.players[0];
            next.is_host = true;
            Some((next.id.clone(), next.name.clone()))
        } else {
            None
        };

        if self.status == RoomStatus::Playing {
            self.status = RoomStatus::Lobby;
            self.game = None;
        }

        Some((
            departed,
            LeaveOutcome::Departed {
                remaining: self.players.len(),
                new_host,
            },
        ))
    }

    pub fn summaries(&self) -> Vec<PlayerSummary> {
        self.players.iter().map(Participant::summary).collect()
    }

    pub fn revealed_hands(&self) -> Vec<RevealedHand> {
        self.players
            .iter()
            .map(|p| RevealedHand {
                id: p.id.clone(),
                name: p.name.clone(),
                hand: p.hand.clone(),
            })
            .collect()
    }
}

/// Generate a 6-character join code. Uniqueness against the live registry is
/// the caller's job (collision-retry on insert).
pub fn generate_room_code() -> RoomCode {
    let mut rng = rand::thread_rng();
    (0..CODE_LEN)
        .map(|_| CODE_CHARS[rng.gen_range(0..CODE_CHARS.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn participant(name: &str, is_host: bool) -> Participant {
        let (tx, _rx) = mpsc::unbounded_channel();
        Participant::new(name.to_string(), is_host, tx)
    }

    fn room_with(names: &[&str]) -> Room {
        let mut room = Room::new("TEST01".to_string(), participant(names[0], true));
        for name in &names[1..] {
            room.add_player(participant(name, false)).unwrap();
        }
        room
    }

    #[test]
    fn test_room_code_shape() {
        for _ in 0..50 {
            let code = generate_room_code();
            assert_eq!(code.len(), 6);
            assert!(code
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()));
        }
    }

    #[test]
    fn test_join_fails_when_full() {
        let mut room = room_with(&["Alice", "Bob", "Carol", "Dave"]);

        let err = room.add_player(participant("Eve", false)).unwrap_err();
        assert!(matches!(err, RoomError::RoomFull { .. }));
        assert_eq!(room.players.len(), MAX_PLAYERS);
    }

    #[test]
    fn test_join_fails_outside_lobby() {
        let mut room = room_with(&["Alice"]);
        room.status = RoomStatus::Playing;

        let err = room.add_player(participant("Bob", false)).unwrap_err();
        assert!(matches!(
            err,
            RoomError::NotJoinable {
                status: RoomStatus::Playing,
                ..
            }
        ));
    }

    #[test]
    fn test_host_leaving_promotes_earliest_joined() {
        let mut room = room_with(&["Alice", "Bob", "Carol"]);
        let host_id = room.players[0].id.clone();
        let bob_id = room.players[1].id.clone();

        let (departed, outcome) = room.remove_player(&host_id).unwrap();
        assert_eq!(departed.name, "Alice");
        assert_eq!(
            outcome,
            LeaveOutcome::Departed {
                remaining: 2,
                new_host: Some((bob_id.clone(), "Bob".to_string())),
            }
        );
        assert!(room.is_host(&bob_id));
    }

    #[test]
    fn test_non_host_leaving_keeps_host() {
        let mut room = room_with(&["Alice", "Bob"]);
        let bob_id = room.players[1].id.clone();

        let (_, outcome) = room.remove_player(&bob_id).unwrap();
        assert_eq!(
            outcome,
            LeaveOutcome::Departed {
                remaining: 1,
                new_host: None,
            }
        );
    }

    #[test]
    fn test_last_player_leaving_deletes_room() {
        let mut room = room_with(&["Alice"]);
        let id = room.players[0].id.clone();

        let (_, outcome) = room.remove_player(&id).unwrap();
        assert_eq!(outcome, LeaveOutcome::RoomDeleted);
    }

    #[test]
    fn test_leave_mid_game_abandons_the_round() {
        let mut room = room_with(&["Alice", "Bob", "Carol"]);
        room.start_game().unwrap();
        let bob_id = room.players[1].id.clone();

        room.remove_player(&bob_id).unwrap();

        assert_eq!(room.status, RoomStatus::Lobby);
        assert!(room.game.is_none());
    }

    #[test]
    fn test_remove_unknown_player_is_a_noop() {
        let mut room = room_with(&["Alice"]);
        assert!(room.remove_player("no-such-id").is_none());
        assert_eq!(room.players.len(), 1);
    }
}
