// Pair Builder - every valid "which graded higher?" matchup in the catalog
//
// A valid pair is two copies of the same physical card, from a supported
// grading company, whose grades differ by 1 to 3 points. Ties have no
// decidable answer; gaps over 3 are uninterestingly obvious. Both copies
// must have a front photo or the pair cannot be shown to a player.

use crate::dedup::{group_by_identity, Deduplicator};
use crate::model::CardRecord;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Grade-gap bounds for a playable comparison.
pub const MIN_GRADE_GAP: f64 = 1.0;
pub const MAX_GRADE_GAP: f64 = 3.0;

const GAP_EPSILON: f64 = 1e-6;

// ============================================================================
// PAIR
// ============================================================================

/// Which display side holds the strictly higher grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::A => write!(f, "A"),
            Side::B => write!(f, "B"),
        }
    }
}

/// One matchup served to the game: two same-identity copies at different
/// grades, with the correct answer precomputed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pair {
    pub card_a: CardRecord,
    pub card_b: CardRecord,
    pub correct_answer: Side,
}

impl Pair {
    /// The higher-graded record (the one the correct answer points at).
    pub fn winner(&self) -> &CardRecord {
        match self.correct_answer {
            Side::A => &self.card_a,
            Side::B => &self.card_b,
        }
    }
}

// ============================================================================
// PAIR ENGINE
// ============================================================================

pub struct PairEngine {
    pub min_grade_gap: f64,
    pub max_grade_gap: f64,
    dedup: Deduplicator,
}

impl PairEngine {
    pub fn new() -> Self {
        PairEngine {
            min_grade_gap: MIN_GRADE_GAP,
            max_grade_gap: MAX_GRADE_GAP,
            dedup: Deduplicator::new(),
        }
    }

    /// Pair validation predicate. Returns a plain boolean - a failing
    /// combination is filtered, never an error.
    ///
    /// All five identity fields must be equal, the company must be one of
    /// the four supported, and the grade gap must sit in
    /// [min_grade_gap, max_grade_gap]. Non-finite grades never validate.
    pub fn is_valid_pair(&self, a: &CardRecord, b: &CardRecord) -> bool {
        if a.identity_key() != b.identity_key() {
            return false;
        }

        if !a.grading_company.is_supported() {
            return false;
        }

        if !a.grade.is_finite() || !b.grade.is_finite() {
            return false;
        }

        let gap = (a.grade - b.grade).abs();
        gap + GAP_EPSILON >= self.min_grade_gap && gap - GAP_EPSILON <= self.max_grade_gap
    }

    /// Which side holds the strictly higher grade; None for invalid pairs.
    pub fn correct_answer(&self, a: &CardRecord, b: &CardRecord) -> Option<Side> {
        if !self.is_valid_pair(a, b) {
            return None;
        }
        if a.grade > b.grade {
            Some(Side::A)
        } else {
            Some(Side::B)
        }
    }

    /// Build every valid pair in the record list.
    ///
    /// Groups by identity key, collapses duplicate grades, then checks
    /// every unordered grade combination within each group. The A/B side
    /// is assigned by coin flip so the higher grade is never positionally
    /// predictable; the RNG is injected so tests can fix a seed.
    ///
    /// Pure aside from the RNG: no I/O, input never mutated. The set of
    /// grade combinations produced is fully deterministic for a given
    /// input; only side assignment consumes randomness.
    pub fn build_pairs<R: Rng>(&self, records: &[CardRecord], rng: &mut R) -> Vec<Pair> {
        let mut pairs = Vec::new();

        for (_, group) in group_by_identity(records) {
            if group.len() < 2 {
                continue;
            }

            let cards = self.dedup.collapse_grades(&group);

            for i in 0..cards.len() {
                for j in (i + 1)..cards.len() {
                    // No placeholder pairs - both sides need a real photo
                    if !cards[i].has_front_image() || !cards[j].has_front_image() {
                        continue;
                    }
                    if !self.is_valid_pair(&cards[i], &cards[j]) {
                        continue;
                    }

                    let (card_a, card_b) = if rng.gen_bool(0.5) {
                        (cards[i].clone(), cards[j].clone())
                    } else {
                        (cards[j].clone(), cards[i].clone())
                    };

                    let correct_answer = if card_a.grade > card_b.grade {
                        Side::A
                    } else {
                        Side::B
                    };

                    pairs.push(Pair {
                        card_a,
                        card_b,
                        correct_answer,
                    });
                }
            }
        }

        pairs
    }
}

impl Default for PairEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CardImages, GradingCompany};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

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
            images: CardImages {
                front: Some("https://img.example.com/front.jpg".to_string()),
                back: None,
                label: None,
            },
            source_url: None,
            updated_at: None,
            extra: HashMap::new(),
        }
    }

    #[test]
    fn test_valid_pair_gap_bounds() {
        let engine = PairEngine::new();

        assert!(engine.is_valid_pair(&card("X", 10.0), &card("X", 8.0))); // gap 2
        assert!(engine.is_valid_pair(&card("X", 10.0), &card("X", 7.0))); // gap 3
        assert!(engine.is_valid_pair(&card("X", 9.0), &card("X", 8.0))); // gap 1
        assert!(!engine.is_valid_pair(&card("X", 9.0), &card("X", 9.0))); // tie
        assert!(!engine.is_valid_pair(&card("X", 10.0), &card("X", 6.0))); // gap 4
        assert!(!engine.is_valid_pair(&card("X", 9.5), &card("X", 9.0))); // gap 0.5
        assert!(engine.is_valid_pair(&card("X", 9.5), &card("X", 8.5))); // half-point gap 1
    }

    #[test]
    fn test_valid_pair_identity_and_company() {
        let engine = PairEngine::new();

        // Different player: different identity
        assert!(!engine.is_valid_pair(&card("X", 10.0), &card("Y", 8.0)));

        // Unsupported company
        let mut a = card("X", 10.0);
        let mut b = card("X", 8.0);
        a.grading_company = GradingCompany::Unknown;
        b.grading_company = GradingCompany::Unknown;
        assert!(!engine.is_valid_pair(&a, &b));

        // Non-finite grade is a non-match, not a panic
        let mut c = card("X", 10.0);
        c.grade = f64::NAN;
        assert!(!engine.is_valid_pair(&c, &card("X", 8.0)));
    }

    #[test]
    fn test_correct_answer_points_at_higher_grade() {
        let engine = PairEngine::new();
        assert_eq!(
            engine.correct_answer(&card("X", 10.0), &card("X", 8.0)),
            Some(Side::A)
        );
        assert_eq!(
            engine.correct_answer(&card("X", 8.0), &card("X", 10.0)),
            Some(Side::B)
        );
        assert_eq!(engine.correct_answer(&card("X", 9.0), &card("X", 9.0)), None);
    }

    #[test]
    fn test_four_grade_scenario_yields_three_pairs() {
        // Grades [10, 8, 6, 4]: (10,8) (8,6) (6,4) are in range,
        // (10,6) (10,4) (8,4) are too far apart.
        let engine = PairEngine::new();
        let records = vec![card("X", 10.0), card("X", 8.0), card("X", 6.0), card("X", 4.0)];

        let mut rng = StdRng::seed_from_u64(7);
        let pairs = engine.build_pairs(&records, &mut rng);
        assert_eq!(pairs.len(), 3);

        for pair in &pairs {
            let gap = (pair.card_a.grade - pair.card_b.grade).abs();
            assert!((1.0..=3.0).contains(&gap));
            assert!(pair.winner().grade > pair.card_a.grade.min(pair.card_b.grade));
        }
    }

    #[test]
    fn test_missing_image_drops_combination() {
        let engine = PairEngine::new();
        let mut low = card("X", 8.0);
        low.images = CardImages::default();
        let records = vec![card("X", 10.0), low, card("X", 6.0)];

        let mut rng = StdRng::seed_from_u64(7);
        let pairs = engine.build_pairs(&records, &mut rng);

        // 10 vs 8 and 8 vs 6 lose their image; 10 vs 6 is out of range
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_duplicate_grades_collapsed_before_pairing() {
        let engine = PairEngine::new();
        let mut cheap = card("X", 10.0);
        cheap.price = Some(100.0);
        let mut dear = card("X", 10.0);
        dear.price = Some(150.0);

        let records = vec![cheap, dear, card("X", 8.0)];
        let mut rng = StdRng::seed_from_u64(7);
        let pairs = engine.build_pairs(&records, &mut rng);

        // One pair, built from the higher-priced grade-10 copy
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].winner().price, Some(150.0));
    }

    #[test]
    fn test_combination_set_is_deterministic() {
        let engine = PairEngine::new();
        let records = vec![card("X", 10.0), card("X", 8.0), card("Y", 9.0), card("Y", 7.5)];

        let combos = |pairs: &[Pair]| -> Vec<(String, i64, i64)> {
            let mut keys: Vec<_> = pairs
                .iter()
                .map(|p| {
                    let lo = p.card_a.grade_key().min(p.card_b.grade_key());
                    let hi = p.card_a.grade_key().max(p.card_b.grade_key());
                    (p.card_a.identity_key().to_string(), lo, hi)
                })
                .collect();
            keys.sort();
            keys
        };

        let mut rng1 = StdRng::seed_from_u64(1);
        let mut rng2 = StdRng::seed_from_u64(99);
        let a = engine.build_pairs(&records, &mut rng1);
        let b = engine.build_pairs(&records, &mut rng2);

        // Different seeds may swap sides, but never change the combinations
        assert_eq!(combos(&a), combos(&b));
    }

    #[test]
    fn test_same_seed_same_sides() {
        let engine = PairEngine::new();
        let records = vec![card("X", 10.0), card("X", 8.0), card("X", 9.0)];

        let mut rng1 = StdRng::seed_from_u64(42);
        let mut rng2 = StdRng::seed_from_u64(42);
        let a = engine.build_pairs(&records, &mut rng1);
        let b = engine.build_pairs(&records, &mut rng2);

        assert_eq!(a.len(), b.len());
        for (pa, pb) in a.iter().zip(b.iter()) {
            assert_eq!(pa.card_a.grade, pb.card_a.grade);
            assert_eq!(pa.correct_answer, pb.correct_answer);
        }
    }
}
