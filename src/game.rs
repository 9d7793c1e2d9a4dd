use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::deck::CardDeck;
use crate::errors::{GameError, MindmeldResult, RoomError};
use crate::room::{Participant, PlayerId, Room, RoomStatus};

pub const MAX_LIVES: u8 = 3;

/// Rounds whose start reveals everyone's lowest card.
pub const HINT_ROUNDS: [u32; 3] = [3, 6, 9];

/// Pause between a failed play and the automatic same-round restart.
pub const RESTART_DELAY: Duration = Duration::from_secs(3);

/// One entry of the played sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayedCard {
    pub card: u8,
    pub player_id: PlayerId,
    pub player_name: String,
}

/// A participant's lowest held card, as revealed by hints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HintCard {
    pub card: u8,
    pub player_id: PlayerId,
    pub player_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalScore {
    pub round: u32,
    pub lives: u8,
}

/// Round state of one active game. Owned by its room; dropped when the game
/// is abandoned or replaced on restart.
#[derive(Debug, Clone)]
pub struct GameState {
    pub round: u32,
    pub total_rounds: u32,
    pub lives: u8,
    pub played_cards: Vec<PlayedCard>,
    pub hint_cards: Vec<HintCard>,
    pub deck: CardDeck,
    /// Bumped on every state-invalidating transition. Deferred restarts
    /// snapshot it and no-op when it has moved on.
    pub generation: u64,
}

impl GameState {
    pub fn new(total_rounds: u32, generation: u64) -> Self {
        Self {
            round: 1,
            total_rounds,
            lives: MAX_LIVES,
            played_cards: Vec::new(),
            hint_cards: Vec::new(),
            deck: CardDeck::new(),
            generation,
        }
    }

    pub fn final_score(&self) -> FinalScore {
        FinalScore {
            round: self.round,
            lives: self.lives,
        }
    }
}

/// Two-player games run 12 rounds, larger rooms 10.
pub fn total_rounds_for(player_count: usize) -> u32 {
    if player_count == 2 {
        12
    } else {
        10
    }
}

/// What a card play did to the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayOutcome {
    /// The card was not in the player's hand; nothing changed.
    Rejected,
    /// Valid play, round still going.
    Accepted { played: PlayedCard },
    /// Valid play emptied every hand; the game advanced to `round` with
    /// fresh hands dealt (hints attached on hint rounds).
    RoundCompleted { round: u32, hints: Vec<HintCard> },
    /// Valid play completed the final round.
    GameWon { score: FinalScore },
    /// Out-of-order play. The offending card is already appended to the
    /// played sequence for the reveal. `game_over` is set when the last
    /// life was spent, which ends the game instead of restarting the round.
    RoundOver {
        incorrect: PlayedCard,
        round: u32,
        lives: u8,
        played_cards: Vec<PlayedCard>,
        game_over: bool,
    },
}

impl Room {
    /// Start a fresh game (also the host-gated restart path): round 1, full
    /// lives, fresh card pool, a 1-card hand for everyone.
    pub fn start_game(&mut self) -> MindmeldResult<()> {
        // carry the generation forward so timers from the previous game
        // can never match the new one
        let generation = self.game.as_ref().map(|g| g.generation + 1).unwrap_or(0);
        let mut game = GameState::new(total_rounds_for(self.players.len()), generation);

        for p in self.players.iter_mut() {
            p.hand = game.deck.deal_hand(1)?;
        }

        self.game = Some(game);
        self.status = RoomStatus::Playing;
        Ok(())
    }

    /// Play one card out of `player_id`'s hand and validate the ordering.
    pub fn play_card(&mut self, player_id: &str, card: u8) -> MindmeldResult<PlayOutcome> {
        if self.status != RoomStatus::Playing {
            return Err(GameError::NotInProgress {
                code: self.code.clone(),
            }
            .into());
        }
        let Some(game) = self.game.as_mut() else {
            return Err(GameError::NotInProgress {
                code: self.code.clone(),
            }
            .into());
        };
        let Some(player_idx) = self.players.iter().position(|p| p.id == player_id) else {
            return Err(RoomError::PlayerNotFound {
                player_id: player_id.to_string(),
            }
            .into());
        };
        let Some(card_idx) = self.players[player_idx].hand.iter().position(|&c| c == card) else {
            return Ok(PlayOutcome::Rejected);
        };

        self.players[player_idx].hand.remove(card_idx);

        let valid = order_is_valid(&self.players, &game.played_cards, card);
        let played = PlayedCard {
            card,
            player_id: self.players[player_idx].id.clone(),
            player_name: self.players[player_idx].name.clone(),
        };
        // the offending card joins the sequence too, so a round-over reveal
        // shows what was actually laid down
        game.played_cards.push(played.clone());

        if !valid {
            game.lives = game.lives.saturating_sub(1);
            game.generation += 1;
            let game_over = game.lives == 0;
            if game_over {
                self.status = RoomStatus::Finished;
            }
            return Ok(PlayOutcome::RoundOver {
                incorrect: played,
                round: game.round,
                lives: game.lives,
                played_cards: game.played_cards.clone(),
                game_over,
            });
        }

        if self.players.iter().any(|p| !p.hand.is_empty()) {
            return Ok(PlayOutcome::Accepted { played });
        }

        // every hand is empty: the round is complete
        if game.round + 1 > game.total_rounds {
            self.status = RoomStatus::Finished;
            game.generation += 1;
            return Ok(PlayOutcome::GameWon {
                score: game.final_score(),
            });
        }

        game.round += 1;
        game.played_cards.clear();
        game.deck.reset();
        game.generation += 1;
        let size = game.round as usize;
        for p in self.players.iter_mut() {
            p.hand = game.deck.deal_hand(size)?;
        }
        game.hint_cards = if HINT_ROUNDS.contains(&game.round) {
            compute_hints(&self.players)
        } else {
            Vec::new()
        };

        Ok(PlayOutcome::RoundCompleted {
            round: game.round,
            hints: game.hint_cards.clone(),
        })
    }

    /// Re-deal the current round after a failed play: cleared sequence,
    /// fresh pool, hands sized to the round. Returns the round number.
    pub fn restart_round(&mut self) -> MindmeldResult<u32> {
        if self.status != RoomStatus::Playing {
            return Err(GameError::NotInProgress {
                code: self.code.clone(),
            }
            .into());
        }
        let Some(game) = self.game.as_mut() else {
            return Err(GameError::NotInProgress {
                code: self.code.clone(),
            }
            .into());
        };

        game.played_cards.clear();
        game.deck.reset();
        game.generation += 1;
        let size = game.round as usize;
        for p in self.players.iter_mut() {
            p.hand = game.deck.deal_hand(size)?;
        }
        Ok(game.round)
    }

    /// Every participant's lowest held card, ascending. Purely
    /// informational; nothing in the room changes.
    pub fn hints(&self) -> Vec<HintCard> {
        compute_hints(&self.players)
    }
}

/// A play is invalid when a strictly smaller card is still held anywhere
/// (the candidate has already left the player's hand at this point) or when
/// a previously played card exceeds the candidate.
fn order_is_valid(players: &[Participant], played: &[PlayedCard], card: u8) -> bool {
    if players
        .iter()
        .flat_map(|p| p.hand.iter())
        .any(|&held| held < card)
    {
        return false;
    }
    played.iter().all(|pc| pc.card <= card)
}

/// Lowest card per participant with a non-empty hand, sorted ascending by
/// card value. Participants who already emptied their hand are skipped.
fn compute_hints(players: &[Participant]) -> Vec<HintCard> {
    let mut hints: Vec<HintCard> = players
        .iter()
        .filter_map(|p| {
            p.lowest_card().map(|card| HintCard {
                card,
                player_id: p.id.clone(),
                player_name: p.name.clone(),
            })
        })
        .collect();
    hints.sort_by_key(|h| h.card);
    hints
}
