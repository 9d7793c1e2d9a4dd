use serde::{Deserialize, Serialize};

use crate::game::{FinalScore, HintCard, PlayedCard};
use crate::room::{PlayerId, PlayerSummary, RevealedHand, RoomCode};

/// Messages sent by clients over the game socket. Events with no payload
/// omit the `data` field entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    #[serde(rename_all = "camelCase")]
    CreateRoom { player_name: String },

    #[serde(rename_all = "camelCase")]
    JoinRoom {
        room_code: RoomCode,
        player_name: String,
    },

    StartGame,

    PlayCard { card: u8 },

    UseHint,

    Emotion { emotion: String },

    LeaveRoom,

    RestartGame,
}

/// Why a participant dropped out of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaveReason {
    Left,
    Disconnected,
}

/// Messages sent to clients. Variants carrying a `hand` are built per
/// recipient; everything else fans out to the whole room.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    #[serde(rename_all = "camelCase")]
    RoomCreated {
        room_code: RoomCode,
        player_id: PlayerId,
        players: Vec<PlayerSummary>,
    },

    /// `player_id` is echoed only on the copy delivered to the joiner.
    #[serde(rename_all = "camelCase")]
    PlayerJoined {
        player: PlayerSummary,
        all_players: Vec<PlayerSummary>,
        #[serde(skip_serializing_if = "Option::is_none")]
        player_id: Option<PlayerId>,
    },

    #[serde(rename_all = "camelCase")]
    GameStarted {
        round: u32,
        total_rounds: u32,
        lives: u8,
        hand: Vec<u8>,
        players: Vec<PlayerSummary>,
    },

    #[serde(rename_all = "camelCase")]
    CardPlayed {
        card: u8,
        player_id: PlayerId,
        player_name: String,
        is_correct: bool,
    },

    #[serde(rename_all = "camelCase")]
    RoundCompleted {
        round: u32,
        hand: Vec<u8>,
        hint_cards: Vec<HintCard>,
        lives: u8,
        players: Vec<PlayerSummary>,
    },

    #[serde(rename_all = "camelCase")]
    RoundOver {
        incorrect_card: u8,
        player_name: String,
        round: u32,
        lives: u8,
        played_cards: Vec<PlayedCard>,
        all_players_cards: Vec<RevealedHand>,
    },

    #[serde(rename_all = "camelCase")]
    RoundRestarted {
        round: u32,
        hand: Vec<u8>,
        lives: u8,
        players: Vec<PlayerSummary>,
    },

    #[serde(rename_all = "camelCase")]
    HintUsed {
        player_id: PlayerId,
        player_name: String,
        hint_cards: Vec<HintCard>,
    },

    #[serde(rename_all = "camelCase")]
    Emotion {
        player_id: PlayerId,
        player_name: String,
        emotion: String,
    },

    #[serde(rename_all = "camelCase")]
    PlayerLeft {
        player_id: PlayerId,
        player_name: String,
        reason: LeaveReason,
        remaining_players: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        new_host: Option<PlayerId>,
        #[serde(skip_serializing_if = "Option::is_none")]
        new_host_name: Option<String>,
    },

    #[serde(rename_all = "camelCase")]
    GameOver {
        success: bool,
        final_score: FinalScore,
    },

    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_round_trips_from_wire_format() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"create_room","data":{"playerName":"Alice"}}"#)
                .unwrap();
        assert!(matches!(msg, ClientMessage::CreateRoom { player_name } if player_name == "Alice"));

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"play_card","data":{"card":42}}"#).unwrap();
        assert!(matches!(msg, ClientMessage::PlayCard { card: 42 }));

        // payload-less events carry no data field
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"start_game"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::StartGame));
    }

    #[test]
    fn test_server_message_uses_camel_case_payload_fields() {
        let msg = ServerMessage::RoomCreated {
            room_code: "AB12CD".to_string(),
            player_id: "p1".to_string(),
            players: Vec::new(),
        };
        let json = serde_json::to_string(&msg).unwrap();

        assert!(json.contains(r#""type":"room_created""#));
        assert!(json.contains(r#""roomCode":"AB12CD""#));
        assert!(json.contains(r#""playerId":"p1""#));
    }

    #[test]
    fn test_joiner_echo_is_omitted_when_absent() {
        let msg = ServerMessage::PlayerJoined {
            player: PlayerSummary {
                id: "p2".to_string(),
                name: "Bob".to_string(),
                is_host: false,
                hand_size: 0,
            },
            all_players: Vec::new(),
            player_id: None,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains("playerId"));
    }
}
