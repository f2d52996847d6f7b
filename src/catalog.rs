// Catalog store adapter - SQLite-backed card catalog
//
// External collaborator from the engine's point of view: all it offers is
// "read every card", "upsert a batch" and "apply a patch". No matching
// logic lives here; the UNIQUE upsert key computed by the model
// (cert number, else identity+grade hash) is what turns a re-import of an
// existing entity into an in-place update instead of a duplicate row.

use crate::model::{CardImages, CardPatch, CardRecord, GradingCompany};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

// ============================================================================
// SCHEMA
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS cards (
            id TEXT PRIMARY KEY,
            upsert_key TEXT UNIQUE NOT NULL,
            player_name TEXT NOT NULL,
            year TEXT NOT NULL,
            set_name TEXT NOT NULL,
            number TEXT NOT NULL,
            grading_company TEXT NOT NULL,
            grade REAL NOT NULL,
            price REAL,
            cert_number TEXT,
            image_front TEXT,
            image_back TEXT,
            image_label TEXT,
            source_url TEXT,
            updated_at TEXT,
            extra TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_cards_player ON cards(player_name)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_cards_cert ON cards(cert_number)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// READ
// ============================================================================

pub fn get_all_cards(conn: &Connection) -> Result<Vec<CardRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, player_name, year, set_name, number, grading_company,
                grade, price, cert_number, image_front, image_back,
                image_label, source_url, updated_at, extra
         FROM cards",
    )?;

    let cards = stmt
        .query_map([], row_to_card)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Failed to read cards from catalog")?;

    Ok(cards)
}

pub fn count_cards(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM cards", [], |row| row.get(0))?;
    Ok(count)
}

// ============================================================================
// WRITE
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertStats {
    pub inserted: usize,
    pub updated: usize,
}

/// Batched upsert. A record whose upsert key already exists updates that
/// row in place (keeping its stable id); everything else inserts with a
/// fresh UUID. `updated_at` is stamped on every write.
pub fn upsert_cards(conn: &Connection, records: &[CardRecord]) -> Result<UpsertStats> {
    let mut find_stmt = conn.prepare("SELECT id FROM cards WHERE upsert_key = ?1")?;
    let mut write_stmt = conn.prepare(
        "INSERT INTO cards (
            id, upsert_key, player_name, year, set_name, number,
            grading_company, grade, price, cert_number, image_front,
            image_back, image_label, source_url, updated_at, extra
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
        ON CONFLICT(upsert_key) DO UPDATE SET
            player_name = excluded.player_name,
            year = excluded.year,
            set_name = excluded.set_name,
            number = excluded.number,
            grading_company = excluded.grading_company,
            grade = excluded.grade,
            price = excluded.price,
            cert_number = excluded.cert_number,
            image_front = excluded.image_front,
            image_back = excluded.image_back,
            image_label = excluded.image_label,
            source_url = excluded.source_url,
            updated_at = excluded.updated_at,
            extra = excluded.extra",
    )?;

    let mut stats = UpsertStats::default();

    for record in records {
        let mut card = record.clone();
        card.prepare_for_write();
        let key = card.upsert_key();

        let existing: Option<String> = find_stmt
            .query_row([&key], |row| row.get(0))
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;

        // Keep the stable id of the row we are about to update
        let id = match &existing {
            Some(id) => id.clone(),
            None => card.id.clone(),
        };

        let extra_json = if card.extra.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&card.extra)?)
        };

        write_stmt.execute(params![
            id,
            key,
            card.player_name,
            card.year,
            card.set_name,
            card.number,
            card.grading_company.as_str(),
            card.grade,
            card.price,
            card.cert_number,
            card.images.front,
            card.images.back,
            card.images.label,
            card.source_url,
            card.updated_at.map(|t| t.to_rfc3339()),
            extra_json,
        ])?;

        if existing.is_some() {
            stats.updated += 1;
        } else {
            stats.inserted += 1;
        }
    }

    Ok(stats)
}

/// Apply one reconciliation patch to its target entity. Only fields the
/// patch carries are touched. Returns false when no row matched the
/// target key (the entity disappeared between read and write).
pub fn apply_patch(conn: &Connection, patch: &CardPatch) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE cards SET
            cert_number = COALESCE(?1, cert_number),
            price = COALESCE(?2, price),
            source_url = COALESCE(?3, source_url),
            image_front = COALESCE(?4, image_front),
            updated_at = ?5
         WHERE upsert_key = ?6",
        params![
            patch.cert_number,
            patch.price,
            patch.source_url,
            patch.image_front,
            patch.updated_at.to_rfc3339(),
            patch.target_key,
        ],
    )?;

    // A patch that introduced a cert number moves the entity onto its
    // cert-based key, so later imports sharing the cert find it. OR IGNORE
    // leaves the old key in place if the cert key is already taken.
    if changed > 0 {
        if let Some(cert) = patch.cert_number.as_deref() {
            let cert = cert.trim();
            if !cert.is_empty() {
                conn.execute(
                    "UPDATE OR IGNORE cards SET upsert_key = ?1 WHERE upsert_key = ?2",
                    params![format!("cert:{}", cert), patch.target_key],
                )?;
            }
        }
    }

    Ok(changed > 0)
}

// ============================================================================
// ROW MAPPING
// ============================================================================

fn row_to_card(row: &Row) -> rusqlite::Result<CardRecord> {
    let company: String = row.get(5)?;
    let updated_at: Option<String> = row.get(13)?;
    let extra: Option<String> = row.get(14)?;

    Ok(CardRecord {
        id: row.get(0)?,
        player_name: row.get(1)?,
        year: row.get(2)?,
        set_name: row.get(3)?,
        number: row.get(4)?,
        grading_company: company.parse().unwrap_or(GradingCompany::Unknown),
        grade: row.get(6)?,
        price: row.get(7)?,
        cert_number: row.get(8)?,
        images: CardImages {
            front: row.get(9)?,
            back: row.get(10)?,
            label: row.get(11)?,
        },
        source_url: row.get(12)?,
        updated_at: updated_at
            .and_then(|t| DateTime::parse_from_rfc3339(&t).ok())
            .map(|t| t.with_timezone(&Utc)),
        extra: extra
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default(),
    })
}

// ============================================================================
// TESTS
// ============================================================================
