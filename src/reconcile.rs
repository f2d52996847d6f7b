// Set-Name Reconciler + feed-to-catalog matching
//
// External feeds spell set names loosely ("Panini" vs the catalog's
// "Panini Prizm"). sets_match() is a heuristic tie-break, never a proof of
// identity: callers only apply it to candidates that already matched
// exactly on player, year, company and grade. A catalog record with zero
// candidates is a normal "no match" outcome, not an error.

use crate::feed::FeedRow;
use crate::model::{CardPatch, CardRecord};
use chrono::Utc;

/// Numeric grades compare within this tolerance (9.5 stored as 9.5000001
/// must still match).
const GRADE_EPSILON: f64 = 1e-6;

// ============================================================================
// SET-NAME MATCHING
// ============================================================================

/// Fuzzy set-name comparison, in priority order:
///   1. case-insensitive trimmed equality
///   2. containment either direction ("Topps" vs "Topps Update")
///   3. first-whitespace-token equality ("Panini" vs "Panini Prizm")
///
/// Ranking signal only - the exact identity-field matches required upstream
/// carry the real evidence.
pub fn sets_match(candidate: &str, canonical: &str) -> bool {
    let a = candidate.trim().to_lowercase();
    let b = canonical.trim().to_lowercase();

    if a == b {
        return true;
    }

    if a.contains(&b) || b.contains(&a) {
        return true;
    }

    let first_a = a.split_whitespace().next();
    let first_b = b.split_whitespace().next();
    match (first_a, first_b) {
        (Some(wa), Some(wb)) => wa == wb,
        _ => false,
    }
}

// ============================================================================
// FEED MATCHER
// ============================================================================

/// Matches external feed rows against catalog records and emits patches
/// for the catalog collaborator to apply. Never writes anything itself.
pub struct FeedMatcher;

impl FeedMatcher {
    pub fn new() -> Self {
        FeedMatcher
    }

    /// Find the best feed row for one catalog record.
    ///
    /// Candidates must match exactly on player (case-insensitive
    /// containment, feeds append suffixes like "RC" or "HOF"), year as
    /// text, grading company, and numeric grade. Candidates are ranked by
    /// sets_match() success and, within ties, order of appearance.
    pub fn find_match<'a>(&self, card: &CardRecord, rows: &'a [FeedRow]) -> Option<&'a FeedRow> {
        let player = card.player_name.trim().to_lowercase();

        let candidates: Vec<&FeedRow> = rows
            .iter()
            .filter(|row| {
                row.player_name.to_lowercase().contains(&player)
                    && row.year == card.year
                    && row.company == card.grading_company
                    && (row.grade - card.grade).abs() < GRADE_EPSILON
            })
            .collect();

        candidates
            .iter()
            .find(|row| sets_match(&row.set_name, &card.set_name))
            .or_else(|| candidates.first())
            .copied()
    }

    /// Build the patch that applies one matched row to its catalog entity.
    pub fn patch_for(&self, card: &CardRecord, row: &FeedRow) -> CardPatch {
        CardPatch {
            target_key: card.upsert_key(),
            cert_number: row.cert_number.clone(),
            price: row.price,
            source_url: row.listing_url.clone(),
            image_front: row.image_url.clone(),
            updated_at: Utc::now(),
        }
    }

    /// Match every catalog record against the feed. Records without a
    /// candidate are reported, not failed.
    pub fn reconcile(&self, cards: &[CardRecord], rows: &[FeedRow]) -> FeedMatchReport {
        let mut patches = Vec::new();
        let mut unmatched = Vec::new();

        for card in cards {
            match self.find_match(card, rows) {
                Some(row) => patches.push(self.patch_for(card, row)),
                None => unmatched.push(card.identity_key().to_string()),
            }
        }

        FeedMatchReport { patches, unmatched }
    }
}

impl Default for FeedMatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone)]
pub struct FeedMatchReport {
    pub patches: Vec<CardPatch>,
    /// Display keys of catalog records no feed row matched.
    pub unmatched: Vec<String>,
}

impl FeedMatchReport {
    pub fn matched_count(&self) -> usize {
        self.patches.len()
    }

    pub fn unmatched_count(&self) -> usize {
        self.unmatched.len()
    }
}

// ============================================================================
// TESTS
// ============================================================================
