// Player rank calculation
//
// Ranks require both an accuracy floor and a minimum round count, so a
// lucky two-round streak never mints a Gold player.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rank {
    Gold,
    Silver,
    Bronze,
}

impl Rank {
    pub fn label(&self) -> &'static str {
        match self {
            Rank::Gold => "Gold",
            Rank::Silver => "Silver",
            Rank::Bronze => "Bronze",
        }
    }

    pub fn min_accuracy(&self) -> f64 {
        match self {
            Rank::Gold => 0.80,
            Rank::Silver => 0.65,
            Rank::Bronze => 0.50,
        }
    }

    pub fn min_rounds(&self) -> u32 {
        match self {
            Rank::Gold => 20,
            Rank::Silver => 10,
            Rank::Bronze => 5,
        }
    }
}

/// Highest rank earned by `correct` right answers over `total` rounds,
/// or None below every threshold.
pub fn rank_for(correct: u32, total: u32) -> Option<Rank> {
    if total == 0 {
        return None;
    }

    let accuracy = correct as f64 / total as f64;

    [Rank::Gold, Rank::Silver, Rank::Bronze]
        .into_iter()
        .find(|rank| total >= rank.min_rounds() && accuracy >= rank.min_accuracy())
}

/// Accuracy as a rounded integer percentage (0-100).
pub fn accuracy_percent(correct: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    ((correct as f64 / total as f64) * 100.0).round() as u32
}
