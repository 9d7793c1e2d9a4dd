use std::collections::HashMap;
use std::sync::Arc;

use log;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::RwLock;

use crate::errors::{MindmeldError, RoomError};
use crate::game::{HintCard, PlayOutcome, RESTART_DELAY};
use crate::messages::{ClientMessage, LeaveReason, ServerMessage};
use crate::room::{generate_room_code, LeaveOutcome, Participant, PlayerId, Room, RoomCode, RoomStatus};

/// Opaque id of one connection, minted by the transport layer.
pub type SessionId = String;

/// Where a connection's identity lives in game state. The session table is
/// the only place transport ids resolve to rooms and participants.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub room_code: RoomCode,
    pub player_id: PlayerId,
}

type SharedRoom = Arc<RwLock<Room>>;

/// Session coordinator: owns the room registry and the session table, routes
/// every inbound event to the room it belongs to, and fans resulting state
/// changes back out. Each room sits behind its own lock; the registry lock is
/// held only for lookup, insert and remove, so unrelated rooms never
/// serialize each other.
#[derive(Clone)]
pub struct RoomService {
    rooms: Arc<RwLock<HashMap<RoomCode, SharedRoom>>>,
    sessions: Arc<RwLock<HashMap<SessionId, SessionHandle>>>,
}

impl RoomService {
    pub fn new() -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Live room and connection counts for the status endpoint.
    pub async fn stats(&self) -> (usize, usize) {
        let rooms = self.rooms.read().await.len();
        let sessions = self.sessions.read().await.len();
        (rooms, sessions)
    }

    /// Route one decoded client event. `tx` is the originating connection's
    /// outbound channel, used for direct replies (room creation, join
    /// errors, host-gate rejections).
    pub async fn dispatch(
        &self,
        session_id: &str,
        message: ClientMessage,
        tx: &UnboundedSender<ServerMessage>,
    ) {
        match message {
            ClientMessage::CreateRoom { player_name } => {
                self.create_room(session_id, player_name, tx).await
            }
            ClientMessage::JoinRoom {
                room_code,
                player_name,
            } => self.join_room(session_id, room_code, player_name, tx).await,
            ClientMessage::StartGame => self.start_game(session_id, tx).await,
            ClientMessage::PlayCard { card } => self.play_card(session_id, card).await,
            ClientMessage::UseHint => self.use_hint(session_id).await,
            ClientMessage::Emotion { emotion } => self.relay_emotion(session_id, emotion).await,
            ClientMessage::LeaveRoom => self.remove_session(session_id, LeaveReason::Left).await,
            ClientMessage::RestartGame => self.restart_game(session_id, tx).await,
        }
    }

    /// Disconnect path; the transport invokes this exactly once per closed
    /// connection.
    pub async fn disconnect(&self, session_id: &str) {
        self.remove_session(session_id, LeaveReason::Disconnected)
            .await;
    }

    async fn create_room(
        &self,
        session_id: &str,
        player_name: String,
        tx: &UnboundedSender<ServerMessage>,
    ) {
        let host = Participant::new(player_name, true, tx.clone());
        let player_id = host.id.clone();

        let (code, players) = {
            let mut rooms = self.rooms.write().await;
            let mut code = generate_room_code();
            while rooms.contains_key(&code) {
                code = generate_room_code();
            }
            let room = Room::new(code.clone(), host);
            let players = room.summaries();
            rooms.insert(code.clone(), Arc::new(RwLock::new(room)));
            (code, players)
        };

        self.sessions.write().await.insert(
            session_id.to_string(),
            SessionHandle {
                room_code: code.clone(),
                player_id: player_id.clone(),
            },
        );

        log::info!("Room {} created", code);
        send_to(
            tx,
            ServerMessage::RoomCreated {
                room_code: code,
                player_id,
                players,
            },
        );
    }

    async fn join_room(
        &self,
        session_id: &str,
        room_code: RoomCode,
        player_name: String,
        tx: &UnboundedSender<ServerMessage>,
    ) {
        let Some(room_arc) = self.room(&room_code).await else {
            send_to(tx, error_reply(RoomError::not_found(room_code).into()));
            return;
        };

        let joiner = Participant::new(player_name, false, tx.clone());
        let player_id = joiner.id.clone();
        let joined = joiner.summary();

        {
            let mut room = room_arc.write().await;
            if let Err(err) = room.add_player(joiner) {
                send_to(tx, error_reply(err.into()));
                return;
            }

            let all_players = room.summaries();
            // everyone already present learns about the newcomer; the
            // newcomer additionally gets their own id echoed back
            for p in &room.players {
                let echo = (p.id == player_id).then(|| player_id.clone());
                send_to(
                    &p.tx,
                    ServerMessage::PlayerJoined {
                        player: joined.clone(),
                        all_players: all_players.clone(),
                        player_id: echo,
                    },
                );
            }
        }

        self.sessions.write().await.insert(
            session_id.to_string(),
            SessionHandle {
                room_code: room_code.clone(),
                player_id,
            },
        );

        log::info!("{} joined room {}", joined.name, room_code);
    }

    async fn start_game(&self, session_id: &str, tx: &UnboundedSender<ServerMessage>) {
        let Some((handle, room_arc)) = self.resolve(session_id).await else {
            log::debug!("start_game from unresolved session {}", session_id);
            return;
        };
        let mut room = room_arc.write().await;

        if !room.is_host(&handle.player_id) {
            send_to(tx, error_reply(RoomError::not_host("start the game").into()));
            return;
        }
        if room.status != RoomStatus::Lobby {
            send_to(
                tx,
                error_reply(
                    RoomError::NotJoinable {
                        code: room.code.clone(),
                        status: room.status.clone(),
                    }
                    .into(),
                ),
            );
            return;
        }

        if let Err(err) = room.start_game() {
            log::error!("Failed to start game in room {}: {}", room.code, err);
            send_to(tx, error_reply(err));
            return;
        }

        send_game_started(&room);
        log::info!(
            "Game started in room {} ({} players)",
            room.code,
            room.players.len()
        );
    }

    /// Host-gated full reset; unlike `start_game`, it works from any
    /// lifecycle state.
    async fn restart_game(&self, session_id: &str, tx: &UnboundedSender<ServerMessage>) {
        let Some((handle, room_arc)) = self.resolve(session_id).await else {
            log::debug!("restart_game from unresolved session {}", session_id);
            return;
        };
        let mut room = room_arc.write().await;

        if !room.is_host(&handle.player_id) {
            send_to(
                tx,
                error_reply(RoomError::not_host("restart the game").into()),
            );
            return;
        }

        if let Err(err) = room.start_game() {
            log::error!("Failed to restart game in room {}: {}", room.code, err);
            send_to(tx, error_reply(err));
            return;
        }

        send_game_started(&room);
        log::info!("Game restarted in room {}", room.code);
    }

    async fn play_card(&self, session_id: &str, card: u8) {
        let Some((handle, room_arc)) = self.resolve(session_id).await else {
            log::debug!("play_card from unresolved session {}", session_id);
            return;
        };
        let mut room = room_arc.write().await;

        let outcome = match room.play_card(&handle.player_id, card) {
            Ok(outcome) => outcome,
            Err(err) => {
                log::debug!("play_card ignored in room {}: {}", room.code, err);
                return;
            }
        };

        match outcome {
            PlayOutcome::Rejected => {
                log::debug!(
                    "Player {} tried to play {} without holding it",
                    handle.player_id,
                    card
                );
            }
            PlayOutcome::Accepted { played } => {
                broadcast(
                    &room,
                    &ServerMessage::CardPlayed {
                        card: played.card,
                        player_id: played.player_id,
                        player_name: played.player_name,
                        is_correct: true,
                    },
                );
            }
            PlayOutcome::RoundCompleted { round, hints } => {
                send_round_completed(&room, &hints);
                log::info!("Room {} advanced to round {}", room.code, round);
            }
            PlayOutcome::GameWon { score } => {
                broadcast(
                    &room,
                    &ServerMessage::GameOver {
                        success: true,
                        final_score: score,
                    },
                );
                log::info!("Room {} cleared the final round", room.code);
            }
            PlayOutcome::RoundOver {
                incorrect,
                round,
                lives,
                played_cards,
                game_over,
            } => {
                broadcast(
                    &room,
                    &ServerMessage::RoundOver {
                        incorrect_card: incorrect.card,
                        player_name: incorrect.player_name,
                        round,
                        lives,
                        played_cards,
                        all_players_cards: room.revealed_hands(),
                    },
                );
                if game_over {
                    broadcast(
                        &room,
                        &ServerMessage::GameOver {
                            success: false,
                            final_score: crate::game::FinalScore { round, lives },
                        },
                    );
                    log::info!("Room {} ran out of lives", room.code);
                } else if let Some(game) = room.game.as_ref() {
                    self.schedule_restart(room.code.clone(), game.generation);
                }
            }
        }
    }

    async fn use_hint(&self, session_id: &str) {
        let Some((handle, room_arc)) = self.resolve(session_id).await else {
            log::debug!("use_hint from unresolved session {}", session_id);
            return;
        };
        let room = room_arc.read().await;

        if room.status != RoomStatus::Playing {
            log::debug!("use_hint outside an active game in room {}", room.code);
            return;
        }
        let Some(player) = room.player(&handle.player_id) else {
            return;
        };

        let hints = room.hints();
        broadcast(
            &room,
            &ServerMessage::HintUsed {
                player_id: player.id.clone(),
                player_name: player.name.clone(),
                hint_cards: hints,
            },
        );
    }

    /// Pure relay: attach the sender's identity and fan out. No state
    /// changes.
    async fn relay_emotion(&self, session_id: &str, emotion: String) {
        let Some((handle, room_arc)) = self.resolve(session_id).await else {
            log::debug!("emotion from unresolved session {}", session_id);
            return;
        };
        let room = room_arc.read().await;
        let Some(player) = room.player(&handle.player_id) else {
            return;
        };

        broadcast(
            &room,
            &ServerMessage::Emotion {
                player_id: player.id.clone(),
                player_name: player.name.clone(),
                emotion,
            },
        );
    }

    async fn remove_session(&self, session_id: &str, reason: LeaveReason) {
        let Some(handle) = self.sessions.write().await.remove(session_id) else {
            return;
        };
        let Some(room_arc) = self.room(&handle.room_code).await else {
            return;
        };

        let deleted = {
            let mut room = room_arc.write().await;
            match room.remove_player(&handle.player_id) {
                None => false,
                Some((departed, LeaveOutcome::RoomDeleted)) => {
                    log::info!(
                        "Room {} emptied by {} and deleted",
                        handle.room_code,
                        departed.name
                    );
                    true
                }
                Some((
                    departed,
                    LeaveOutcome::Departed {
                        remaining,
                        new_host,
                    },
                )) => {
                    let (new_host_id, new_host_name) = match new_host {
                        Some((id, name)) => (Some(id), Some(name)),
                        None => (None, None),
                    };
                    broadcast(
                        &room,
                        &ServerMessage::PlayerLeft {
                            player_id: departed.id.clone(),
                            player_name: departed.name.clone(),
                            reason,
                            remaining_players: remaining,
                            new_host: new_host_id,
                            new_host_name,
                        },
                    );
                    false
                }
            }
        };

        if deleted {
            let mut rooms = self.rooms.write().await;
            // re-check under the registry lock so a join that raced the
            // leave is not clobbered
            let still_empty = match rooms.get(&handle.room_code) {
                Some(arc) => arc.read().await.players.is_empty(),
                None => false,
            };
            if still_empty {
                rooms.remove(&handle.room_code);
            }
        }
    }

    /// Schedule the delayed same-round restart after a failed play. The
    /// generation snapshot makes the timer a no-op once any
    /// state-invalidating transition lands before it fires.
    fn schedule_restart(&self, room_code: RoomCode, generation: u64) {
        let service = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(RESTART_DELAY).await;
            service.run_scheduled_restart(&room_code, generation).await;
        });
    }

    async fn run_scheduled_restart(&self, room_code: &str, generation: u64) {
        let Some(room_arc) = self.room(room_code).await else {
            log::debug!("Scheduled restart for vanished room {}", room_code);
            return;
        };
        let mut room = room_arc.write().await;

        let current = room.game.as_ref().map(|g| g.generation);
        if room.status != RoomStatus::Playing || current != Some(generation) {
            log::debug!("Stale scheduled restart for room {} dropped", room_code);
            return;
        }

        match room.restart_round() {
            Ok(round) => {
                send_round_restarted(&room);
                log::info!("Room {} restarted round {}", room_code, round);
            }
            Err(err) => {
                log::error!("Failed to restart round in room {}: {}", room_code, err);
            }
        }
    }

    async fn room(&self, code: &str) -> Option<SharedRoom> {
        self.rooms.read().await.get(code).cloned()
    }

    /// Resolve a session to its live room. Events from sessions with no
    /// room are dropped by the callers.
    async fn resolve(&self, session_id: &str) -> Option<(SessionHandle, SharedRoom)> {
        let handle = self.sessions.read().await.get(session_id).cloned()?;
        let room = self.room(&handle.room_code).await?;
        Some((handle, room))
    }
}

impl Default for RoomService {
    fn default() -> Self {
        Self::new()
    }
}

/// Deliver a message on one outbound channel. A closed channel is skipped
/// without error; dead connections are pruned by the disconnect path, not
/// here.
fn send_to(tx: &UnboundedSender<ServerMessage>, message: ServerMessage) {
    if tx.send(message).is_err() {
        log::debug!("Outbound channel closed, dropping message");
    }
}

/// Fan a message out to every participant in the room.
fn broadcast(room: &Room, message: &ServerMessage) {
    for p in &room.players {
        send_to(&p.tx, message.clone());
    }
}

fn error_reply(err: MindmeldError) -> ServerMessage {
    ServerMessage::Error {
        message: err.to_string(),
    }
}

/// Per-participant view of a freshly (re)started game: everyone sees the
/// shared round facts and their own hand only.
fn send_game_started(room: &Room) {
    let Some(game) = room.game.as_ref() else {
        return;
    };
    let players = room.summaries();
    for p in &room.players {
        send_to(
            &p.tx,
            ServerMessage::GameStarted {
                round: game.round,
                total_rounds: game.total_rounds,
                lives: game.lives,
                hand: p.hand.clone(),
                players: players.clone(),
            },
        );
    }
}

fn send_round_completed(room: &Room, hints: &[HintCard]) {
    let Some(game) = room.game.as_ref() else {
        return;
    };
    let players = room.summaries();
    for p in &room.players {
        send_to(
            &p.tx,
            ServerMessage::RoundCompleted {
                round: game.round,
                hand: p.hand.clone(),
                hint_cards: hints.to_vec(),
                lives: game.lives,
                players: players.clone(),
            },
        );
    }
}

fn send_round_restarted(room: &Room) {
    let Some(game) = room.game.as_ref() else {
        return;
    };
    let players = room.summaries();
    for p in &room.players {
        send_to(
            &p.tx,
            ServerMessage::RoundRestarted {
                round: game.round,
                hand: p.hand.clone(),
                lives: game.lives,
                players: players.clone(),
            },
        );
    }
}
