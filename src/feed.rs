// External listing feed ingestion
//
// Listing exports arrive as CSV with positional columns:
//   0 cert number | 1 grade label ("PSA 9 MINT") | 2 player | 3 set
//   4 year | 5 card number | 6 price ("$34,000") | 7 listing URL | 8 image URL
//
// Rows whose grade label has no numeric grade (e.g. "PSA Authentic") are
// unusable and dropped at load time. Network fetching of the listings
// themselves is out of scope; their exports arrive as files.

use crate::model::{CardImages, CardRecord, GradingCompany};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

// ============================================================================
// FEED ROW
// ============================================================================

/// One listing row from an external feed, parsed but not yet matched
/// against the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedRow {
    pub cert_number: Option<String>,
    pub company: GradingCompany,
    pub grade: f64,
    pub player_name: String,
    pub set_name: String,
    pub year: String,
    pub number: String,
    pub price: Option<f64>,
    pub listing_url: Option<String>,
    pub image_url: Option<String>,
}

impl FeedRow {
    /// Parse one positional CSV record. Returns None when the grade label
    /// carries no numeric grade - those rows cannot participate in matching.
    pub fn from_csv_record(record: &csv::StringRecord) -> Option<FeedRow> {
        let field = |i: usize| record.get(i).unwrap_or("").trim().to_string();

        let (company, grade) = parse_grade_label(&field(1))?;

        Some(FeedRow {
            cert_number: digits_only(&field(0)),
            company,
            grade,
            player_name: field(2),
            set_name: field(3),
            year: field(4),
            number: field(5),
            price: parse_price(&field(6)),
            listing_url: non_empty(field(7)),
            image_url: non_empty(field(8)),
        })
    }

    pub fn has_image(&self) -> bool {
        self.image_url.as_deref().is_some_and(|u| !u.is_empty())
    }

    /// Promote a feed row to a catalog record (used by the pair importer,
    /// which writes whole cards rather than patches).
    pub fn to_card_record(&self) -> CardRecord {
        CardRecord {
            id: String::new(),
            player_name: self.player_name.clone(),
            year: self.year.clone(),
            set_name: self.set_name.clone(),
            number: self.number.clone(),
            grading_company: self.company,
            grade: self.grade,
            price: self.price,
            cert_number: self.cert_number.clone(),
            images: CardImages {
                front: self.image_url.clone(),
                back: None,
                label: None,
            },
            source_url: self.listing_url.clone(),
            updated_at: None,
            extra: HashMap::new(),
        }
    }
}

// ============================================================================
// LOADING
// ============================================================================

/// Load every usable row from a feed CSV (header line expected).
pub fn load_feed_csv(path: &Path) -> Result<Vec<FeedRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open feed CSV: {}", path.display()))?;

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.context("Failed to read feed CSV record")?;
        if let Some(row) = FeedRow::from_csv_record(&record) {
            rows.push(row);
        }
    }

    Ok(rows)
}

// ============================================================================
// FIELD PARSERS
// ============================================================================

/// "PSA 9 MINT" -> (PSA, 9.0). "BGS 9.5" -> (BGS, 9.5).
/// Non-numeric grades ("PSA Authentic") -> None.
pub fn parse_grade_label(label: &str) -> Option<(GradingCompany, f64)> {
    let mut parts = label.split_whitespace();
    let company: GradingCompany = parts.next()?.parse().ok()?;
    let grade: f64 = parts.next()?.parse().ok()?;
    if !grade.is_finite() {
        return None;
    }
    Some((company, grade))
}

/// "$34,000" -> 34000.0. Unparseable -> None.
pub fn parse_price(price: &str) -> Option<f64> {
    let cleaned: String = price.chars().filter(|c| *c != '$' && *c != ',').collect();
    let n: f64 = cleaned.trim().parse().ok()?;
    n.is_finite().then_some(n)
}

/// Strip everything but digits; None when nothing is left.
pub fn digits_only(s: &str) -> Option<String> {
    let digits: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
    (!digits.is_empty()).then_some(digits)
}

fn non_empty(s: String) -> Option<String> {
    (!s.is_empty()).then_some(s)
}

// ============================================================================
// TESTS
// ============================================================================
