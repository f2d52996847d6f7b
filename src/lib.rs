// gradeit - Card Identity Matching & Pairing Engine
// Exposes all modules for use in the CLI, import tooling, and tests

pub mod catalog;
pub mod dedup;
pub mod feed;
pub mod model;
pub mod pairing;
pub mod ranking;
pub mod reconcile;
pub mod sequence;

// Re-export commonly used types
pub use catalog::{
    apply_patch, count_cards, get_all_cards, setup_database, upsert_cards, UpsertStats,
};
pub use dedup::{group_by_identity, Deduplicator};
pub use feed::{load_feed_csv, parse_grade_label, parse_price, FeedRow};
pub use model::{CardImages, CardPatch, CardRecord, GradingCompany, IdentityKey};
pub use pairing::{Pair, PairEngine, Side, MAX_GRADE_GAP, MIN_GRADE_GAP};
pub use ranking::{accuracy_percent, rank_for, Rank};
pub use reconcile::{sets_match, FeedMatchReport, FeedMatcher};
pub use sequence::{EmptyDeckError, PairSequencer};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
