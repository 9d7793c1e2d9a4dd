use std::collections::HashSet;

use rand::Rng;

use crate::errors::GameError;

/// Bounds of the card pool, inclusive.
pub const CARD_MIN: u8 = 1;
pub const CARD_MAX: u8 = 100;

/// Per-game card pool. Tracks which values have been dealt since the last
/// epoch reset so no two hands in the same round share a card. Owned by the
/// game state of one room; never shared across rooms.
#[derive(Debug, Clone, Default)]
pub struct CardDeck {
    used: HashSet<u8>,
}

impl CardDeck {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of values still undealt in the current epoch.
    pub fn remaining(&self) -> usize {
        CARD_MAX as usize - self.used.len()
    }

    /// Clear the used set. Called once before the deals of every round;
    /// calling it again before any deal is a no-op.
    pub fn reset(&mut self) {
        self.used.clear();
    }

    /// Draw `size` distinct values from the undealt pool, marking each one
    /// used, and return them sorted ascending.
    pub fn deal_hand(&mut self, size: usize) -> Result<Vec<u8>, GameError> {
        if size > self.remaining() {
            return Err(GameError::DeckExhausted {
                requested: size,
                remaining: self.remaining(),
            });
        }

        let mut rng = rand::thread_rng();
        let mut hand = Vec::with_capacity(size);
        while hand.len() < size {
            let card = rng.gen_range(CARD_MIN..=CARD_MAX);
            if self.used.insert(card) {
                hand.push(card);
            }
        }
        hand.sort_unstable();
        Ok(hand)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deal_hand_is_sorted_and_in_range() {
        let mut deck = CardDeck::new();
        let hand = deck.deal_hand(10).unwrap();

        assert_eq!(hand.len(), 10);
        assert!(hand.windows(2).all(|w| w[0] < w[1]));
        assert!(hand.iter().all(|&c| (CARD_MIN..=CARD_MAX).contains(&c)));
    }

    #[test]
    fn test_hands_never_share_cards_within_an_epoch() {
        let mut deck = CardDeck::new();
        let mut seen = HashSet::new();

        for _ in 0..4 {
            for card in deck.deal_hand(12).unwrap() {
                assert!(seen.insert(card), "card {} dealt twice", card);
            }
        }
        assert_eq!(deck.remaining(), 100 - 48);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut deck = CardDeck::new();
        deck.deal_hand(30).unwrap();

        deck.reset();
        deck.reset();

        assert_eq!(deck.remaining(), 100);
        assert_eq!(deck.deal_hand(100).unwrap().len(), 100);
    }

    #[test]
    fn test_deal_fails_when_pool_exhausted() {
        let mut deck = CardDeck::new();
        deck.deal_hand(100).unwrap();

        let err = deck.deal_hand(1).unwrap_err();
        assert!(matches!(
            err,
            GameError::DeckExhausted {
                requested: 1,
                remaining: 0
            }
        ));
    }
}
