// Pair Sequencer - infinite, shuffled, replay-safe pair stream
//
// Owns a shuffled copy of the pair deck and a cursor. One full pass serves
// every pair exactly once; exhausting the deck reshuffles in place and
// resets the cursor, so the stream never terminates. A pair may land last
// before a reshuffle and first after it - an accepted artifact, not a bug.
//
// Shared mutable state lives here and nowhere else, so one sequencer
// belongs to exactly one player session; never share an instance across
// sessions.

use crate::pairing::Pair;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fmt;

// ============================================================================
// ERROR
// ============================================================================

/// A sequencer cannot be built from zero pairs - gameplay has nothing to
/// serve, and the caller must hear about it rather than spin forever.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmptyDeckError;

impl fmt::Display for EmptyDeckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no valid card pairs to sequence")
    }
}

impl std::error::Error for EmptyDeckError {}

// ============================================================================
// SEQUENCER
// ============================================================================

pub struct PairSequencer {
    deck: Vec<Pair>,
    cursor: usize,
    rng: StdRng,
}

impl PairSequencer {
    /// Build a sequencer over a non-empty pair list. The deck is shuffled
    /// immediately (Fisher-Yates via `SliceRandom::shuffle`).
    pub fn new(pairs: Vec<Pair>, rng: StdRng) -> Result<Self, EmptyDeckError> {
        if pairs.is_empty() {
            return Err(EmptyDeckError);
        }

        let mut sequencer = PairSequencer {
            deck: pairs,
            cursor: 0,
            rng,
        };
        sequencer.deck.shuffle(&mut sequencer.rng);
        Ok(sequencer)
    }

    /// Deterministic sequencer for tests and replays.
    pub fn from_seed(pairs: Vec<Pair>, seed: u64) -> Result<Self, EmptyDeckError> {
        Self::new(pairs, StdRng::seed_from_u64(seed))
    }

    /// Production sequencer with an unpredictable (not cryptographic)
    /// shuffle order.
    pub fn from_entropy(pairs: Vec<Pair>) -> Result<Self, EmptyDeckError> {
        Self::new(pairs, StdRng::from_entropy())
    }

    /// Number of pairs in one full pass.
    pub fn len(&self) -> usize {
        self.deck.len()
    }

    /// Always false - construction rejects empty decks.
    pub fn is_empty(&self) -> bool {
        self.deck.is_empty()
    }

    /// Serve the next pair. Calls must be strictly sequential; the cursor
    /// and deck are shared mutable state with a single-owner contract.
    pub fn next_pair(&mut self) -> Pair {
        if self.cursor >= self.deck.len() {
            self.deck.shuffle(&mut self.rng);
            self.cursor = 0;
        }

        let pair = self.deck[self.cursor].clone();
        self.cursor += 1;
        pair
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CardImages, CardRecord, GradingCompany};
    use crate::pairing::Side;
    use std::collections::HashMap;
    use std::collections::HashSet;

    fn card(player: &str, grade: f64) -> CardRecord {
        CardRecord {
            id: String::new(),
            player_name: player.to_string(),
            year: "1984".to_string(),
            set_name: "Topps".to_string(),
            number: "123".to_string(),
            grading_company: GradingCompany::PSA,
            grade,
            price: None,
            cert_number: None,
            images: CardImages::default(),
            source_url: None,
            updated_at: None,
            extra: HashMap::new(),
        }
    }

    fn pair(player: &str) -> Pair {
        Pair {
            card_a: card(player, 10.0),
            card_b: card(player, 8.0),
            correct_answer: Side::A,
        }
    }

    fn deck(n: usize) -> Vec<Pair> {
        (0..n).map(|i| pair(&format!("Player {}", i))).collect()
    }

    #[test]
    fn test_empty_deck_rejected() {
        let result = PairSequencer::from_seed(Vec::new(), 1);
        assert_eq!(result.err(), Some(EmptyDeckError));
    }

    #[test]
    fn test_full_pass_serves_every_pair_once() {
        let n = 12;
        let mut seq = PairSequencer::from_seed(deck(n), 5).unwrap();
        assert_eq!(seq.len(), n);

        let mut seen = HashSet::new();
        for _ in 0..n {
            seen.insert(seq.next_pair().card_a.player_name.clone());
        }
        assert_eq!(seen.len(), n);
    }

    #[test]
    fn test_never_terminates_and_each_pass_is_complete() {
        let n = 8;
        let mut seq = PairSequencer::from_seed(deck(n), 11).unwrap();

        // 3N draws: no panic, and every window of N is a full pass
        for _ in 0..3 {
            let mut seen = HashSet::new();
            for _ in 0..n {
                seen.insert(seq.next_pair().card_a.player_name.clone());
            }
            assert_eq!(seen.len(), n);
        }
    }

    #[test]
    fn test_seeded_order_is_reproducible() {
        let n = 6;
        let order = |seed: u64| -> Vec<String> {
            let mut seq = PairSequencer::from_seed(deck(n), seed).unwrap();
            (0..n * 2).map(|_| seq.next_pair().card_a.player_name).collect()
        };

        assert_eq!(order(42), order(42));
    }

    #[test]
    fn test_single_pair_deck_repeats() {
        let mut seq = PairSequencer::from_seed(deck(1), 3).unwrap();
        for _ in 0..5 {
            assert_eq!(seq.next_pair().card_a.player_name, "Player 0");
        }
    }
}
