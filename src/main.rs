use anyhow::{bail, Context, Result};
use rusqlite::Connection;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use gradeit::{
    apply_patch, count_cards, get_all_cards, load_feed_csv, setup_database, upsert_cards,
    FeedMatcher, PairEngine, PairSequencer, Side,
};

const DEFAULT_DB: &str = "cards.db";

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("import") => {
            let csv = required_path(&args, 2, "import <feed.csv> [db]")?;
            run_import(&csv, &db_path(&args, 3))
        }
        Some("enrich") => {
            let csv = required_path(&args, 2, "enrich <feed.csv> [db]")?;
            run_enrich(&csv, &db_path(&args, 3))
        }
        Some("pairs") => run_pairs(&db_path(&args, 2)),
        Some("play") => {
            let rounds = args.get(3).map(|r| r.parse()).transpose()?.unwrap_or(5);
            run_play(&db_path(&args, 2), rounds)
        }
        _ => {
            eprintln!("Usage: gradeit <command>");
            eprintln!("  import <feed.csv> [db]   import pair-ready cards from a listing feed");
            eprintln!("  enrich <feed.csv> [db]   match feed rows to the catalog, patch matches");
            eprintln!("  pairs  [db]              report every buildable pair");
            eprintln!("  play   [db] [rounds]     serve a few rounds from the sequencer");
            std::process::exit(2);
        }
    }
}

fn required_path(args: &[String], index: usize, usage: &str) -> Result<PathBuf> {
    match args.get(index) {
        Some(p) => Ok(PathBuf::from(p)),
        None => bail!("Usage: gradeit {}", usage),
    }
}

fn db_path(args: &[String], index: usize) -> PathBuf {
    args.get(index)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB))
}

fn open_catalog(db: &Path) -> Result<Connection> {
    let conn = Connection::open(db)
        .with_context(|| format!("Failed to open catalog: {}", db.display()))?;
    setup_database(&conn)?;
    Ok(conn)
}

/// Import only the cards that can actually form pairs: rows with an image
/// and a same-identity partner at a grade 1-3 points away.
fn run_import(csv: &Path, db: &Path) -> Result<()> {
    println!("Reading feed: {}", csv.display());
    let rows = load_feed_csv(csv)?;
    let pairable: Vec<_> = rows.iter().filter(|r| r.has_image()).collect();
    println!(
        "  {} usable rows ({} with images)",
        rows.len(),
        pairable.len()
    );

    let records: Vec<_> = pairable.iter().map(|r| r.to_card_record()).collect();

    let engine = PairEngine::new();
    let mut rng = rand::thread_rng();
    let pairs = engine.build_pairs(&records, &mut rng);
    println!("  {} valid pairs found", pairs.len());

    if pairs.is_empty() {
        println!("No pairs found - the feed needs multiple grades of the same card.");
        return Ok(());
    }

    // A card may appear in several pairs; write each entity once
    let mut unique = HashMap::new();
    for pair in &pairs {
        for card in [&pair.card_a, &pair.card_b] {
            unique.entry(card.upsert_key()).or_insert_with(|| card.clone());
        }
    }
    let to_write: Vec<_> = unique.into_values().collect();

    let conn = open_catalog(db)?;
    let stats = upsert_cards(&conn, &to_write)?;
    println!(
        "Done: {} pairs, {} cards written ({} new, {} updated), catalog now {}",
        pairs.len(),
        to_write.len(),
        stats.inserted,
        stats.updated,
        count_cards(&conn)?
    );

    Ok(())
}

/// Match feed rows against existing catalog records and patch the matches
/// with cert numbers, prices, listing URLs and images.
fn run_enrich(csv: &Path, db: &Path) -> Result<()> {
    println!("Reading feed: {}", csv.display());
    let rows = load_feed_csv(csv)?;
    println!("  {} usable rows", rows.len());

    let conn = open_catalog(db)?;
    let cards = get_all_cards(&conn)?;
    println!("  {} catalog cards loaded", cards.len());

    let matcher = FeedMatcher::new();
    let report = matcher.reconcile(&cards, &rows);

    let mut applied = 0;
    for patch in &report.patches {
        if apply_patch(&conn, patch)? {
            applied += 1;
        }
    }

    for key in &report.unmatched {
        println!("  — no feed match: {}", key);
    }
    println!(
        "Done: {} matched ({} applied), {} without a feed match",
        report.matched_count(),
        applied,
        report.unmatched_count()
    );

    Ok(())
}

fn run_pairs(db: &Path) -> Result<()> {
    let conn = open_catalog(db)?;
    let cards = get_all_cards(&conn)?;
    println!("{} cards in catalog", cards.len());

    let engine = PairEngine::new();
    let mut rng = rand::thread_rng();
    let pairs = engine.build_pairs(&cards, &mut rng);

    for pair in &pairs {
        let hi = pair.winner();
        println!(
            "  {} {} — {} {} vs {} (answer {})",
            hi.year,
            hi.player_name,
            hi.grading_company,
            pair.card_a.grade,
            pair.card_b.grade,
            pair.correct_answer
        );
    }
    println!("{} valid pairs", pairs.len());

    Ok(())
}

fn run_play(db: &Path, rounds: usize) -> Result<()> {
    let conn = open_catalog(db)?;
    let cards = get_all_cards(&conn)?;

    let engine = PairEngine::new();
    let mut rng = rand::thread_rng();
    let pairs = engine.build_pairs(&cards, &mut rng);

    let mut sequencer =
        PairSequencer::from_entropy(pairs).context("Cannot start a game from this catalog")?;
    println!("Deck of {} pairs\n", sequencer.len());

    for round in 1..=rounds {
        let pair = sequencer.next_pair();
        println!(
            "Round {}: {} {} ({}) — side A grade {}, side B grade {}",
            round,
            pair.card_a.year,
            pair.card_a.player_name,
            pair.card_a.set_name,
            pair.card_a.grade,
            pair.card_b.grade
        );
        let answer = match pair.correct_answer {
            Side::A => "A",
            Side::B => "B",
        };
        println!("         higher grade: {}\n", answer);
    }

    Ok(())
}
