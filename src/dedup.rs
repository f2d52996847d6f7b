// Record Deduplicator - one canonical copy per (identity, grade)
//
// Two duplication problems, both handled here:
//   1. Within one identity group a feed or the catalog may hold several
//      records at the same grade. We keep exactly one representative.
//   2. Across import batches the same entity may arrive again; the upsert
//      key on CardRecord (cert number, else identity+grade hash) makes the
//      second write an in-place update instead of a duplicate. The catalog
//      adapter enforces that; this module only picks representatives.

use crate::model::{CardRecord, IdentityKey};
use std::collections::HashMap;

// ============================================================================
// GROUPING
// ============================================================================

/// Partition records into identity groups, preserving first-seen order of
/// both the groups and the records inside each group.
pub fn group_by_identity(records: &[CardRecord]) -> Vec<(IdentityKey, Vec<CardRecord>)> {
    let mut order: Vec<IdentityKey> = Vec::new();
    let mut groups: HashMap<IdentityKey, Vec<CardRecord>> = HashMap::new();

    for record in records {
        let key = record.identity_key();
        if !groups.contains_key(&key) {
            order.push(key.clone());
        }
        groups.entry(key).or_default().push(record.clone());
    }

    order
        .into_iter()
        .map(|key| {
            let group = groups.remove(&key).unwrap_or_default();
            (key, group)
        })
        .collect()
}

// ============================================================================
// DEDUPLICATOR
// ============================================================================

pub struct Deduplicator;

impl Deduplicator {
    pub fn new() -> Self {
        Deduplicator
    }

    /// Collapse one identity group down to a single record per distinct
    /// grade. Tie-break, in order:
    ///   (a) the record holding a cert number beats one without,
    ///   (b) the higher non-null price wins,
    ///   (c) first-seen wins.
    ///
    /// Output preserves the first-seen order of grades.
    pub fn collapse_grades(&self, group: &[CardRecord]) -> Vec<CardRecord> {
        let mut slot_of: HashMap<i64, usize> = HashMap::new();
        let mut kept: Vec<CardRecord> = Vec::new();

        for record in group {
            match slot_of.get(&record.grade_key()) {
                None => {
                    slot_of.insert(record.grade_key(), kept.len());
                    kept.push(record.clone());
                }
                Some(&slot) => {
                    if prefer_over(record, &kept[slot]) {
                        kept[slot] = record.clone();
                    }
                }
            }
        }

        kept
    }

    /// Full pass over a mixed record list: group by identity, collapse each
    /// group, flatten. The result holds at most one record per
    /// (identity key, grade) combination, ready for pairing.
    pub fn dedupe(&self, records: &[CardRecord]) -> Vec<CardRecord> {
        group_by_identity(records)
            .into_iter()
            .flat_map(|(_, group)| self.collapse_grades(&group))
            .collect()
    }
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new()
    }
}

/// True when `candidate` should replace the already-kept record.
fn prefer_over(candidate: &CardRecord, kept: &CardRecord) -> bool {
    // Cert number is authoritative when exactly one side has one
    match (candidate.has_cert(), kept.has_cert()) {
        (true, false) => return true,
        (false, true) => return false,
        _ => {}
    }

    // Highest non-null price wins
    match (candidate.price, kept.price) {
        (Some(c), Some(k)) => c > k,
        (Some(_), None) => true,
        // Neither (or only kept) priced: first-seen stays
        _ => false,
    }
}

// ============================================================================
// TESTS
// ============================================================================
