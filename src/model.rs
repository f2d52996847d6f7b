// Card catalog data model
// One CardRecord = one graded copy of a physical card.
//
// Identity vs. copy: the five identity fields (player, year, set, number,
// grading company) name the printed card design. Grade, price, cert number
// and images describe one particular graded copy of it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// GRADING COMPANY
// ============================================================================

/// The four grading authorities the game supports.
///
/// Records from other authorities deserialize as `Unknown` instead of
/// failing the whole batch; they are simply never pairable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GradingCompany {
    PSA,
    BGS,
    SGC,
    CGC,
    #[serde(other)]
    Unknown,
}

impl GradingCompany {
    pub fn as_str(&self) -> &'static str {
        match self {
            GradingCompany::PSA => "PSA",
            GradingCompany::BGS => "BGS",
            GradingCompany::SGC => "SGC",
            GradingCompany::CGC => "CGC",
            GradingCompany::Unknown => "UNKNOWN",
        }
    }

    /// Only the four named companies produce pairable records.
    pub fn is_supported(&self) -> bool {
        !matches!(self, GradingCompany::Unknown)
    }
}

impl FromStr for GradingCompany {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_uppercase().as_str() {
            "PSA" => GradingCompany::PSA,
            "BGS" => GradingCompany::BGS,
            "SGC" => GradingCompany::SGC,
            "CGC" => GradingCompany::CGC,
            _ => GradingCompany::Unknown,
        })
    }
}

impl fmt::Display for GradingCompany {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// CARD IMAGES
// ============================================================================

/// Front/back/label photo references for one graded copy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardImages {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub front: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl CardImages {
    /// A usable front photo — pairs without one cannot be shown to a player.
    pub fn has_front(&self) -> bool {
        self.front.as_deref().is_some_and(|url| !url.trim().is_empty())
    }
}

// ============================================================================
// CARD RECORD
// ============================================================================

/// One graded copy of a physical card, as stored in the catalog.
///
/// Field names serialize camelCase to match the catalog's document shape.
/// Unknown fields from the store land in `extra` and are carried untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRecord {
    /// Stable identity (UUID), assigned on first write. Never used for
    /// matching; matching goes through the identity fields below.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    // ========================================================================
    // IDENTITY FIELDS (together: the physical-card identity)
    // ========================================================================
    #[serde(default)]
    pub player_name: String,

    /// Year token compared as text ("1984" != "84").
    #[serde(default)]
    pub year: String,

    /// Canonical or free-text set name depending on source.
    #[serde(default, rename = "set")]
    pub set_name: String,

    /// Card number/slug within the set; alphanumeric ("US175") allowed,
    /// compared as text.
    #[serde(default)]
    pub number: String,

    #[serde(default = "default_company")]
    pub grading_company: GradingCompany,

    // ========================================================================
    // COPY FIELDS (vary per graded copy)
    // ========================================================================
    /// Numeric grade; half-points allowed (9.5).
    pub grade: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert_number: Option<String>,

    #[serde(default)]
    pub images: CardImages,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,

    /// Set on every mutation; never consulted by matching.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    /// Extensible fields the store may carry that we do not interpret.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

fn default_company() -> GradingCompany {
    GradingCompany::Unknown
}

impl CardRecord {
    /// The composite grouping key for this record.
    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey {
            player_name: self.player_name.clone(),
            year: self.year.clone(),
            set_name: self.set_name.clone(),
            number: self.number.clone(),
            company: self.grading_company,
        }
    }

    /// Grade bucketed to tenths, so 9.5 and 9.50 collapse and f64 never
    /// ends up as a map key.
    pub fn grade_key(&self) -> i64 {
        (self.grade * 10.0).round() as i64
    }

    /// True when this copy carries an authoritative cert number.
    pub fn has_cert(&self) -> bool {
        self.cert_number
            .as_deref()
            .is_some_and(|c| !c.trim().is_empty())
    }

    pub fn has_front_image(&self) -> bool {
        self.images.has_front()
    }

    /// Cross-batch dedup key: a record is the same already-written entity
    /// as an existing one if it shares a cert number, or - absent a cert -
    /// the full identity key plus grade.
    ///
    /// Certs are authoritative so they are used verbatim; the fallback is
    /// hashed so the key never depends on a textual separator.
    pub fn upsert_key(&self) -> String {
        if let Some(cert) = self.cert_number.as_deref() {
            let cert = cert.trim();
            if !cert.is_empty() {
                return format!("cert:{}", cert);
            }
        }

        let mut hasher = Sha256::new();
        hasher.update(self.player_name.as_bytes());
        hasher.update([0]);
        hasher.update(self.year.as_bytes());
        hasher.update([0]);
        hasher.update(self.set_name.as_bytes());
        hasher.update([0]);
        hasher.update(self.number.as_bytes());
        hasher.update([0]);
        hasher.update(self.grading_company.as_str().as_bytes());
        hasher.update([0]);
        hasher.update(self.grade_key().to_le_bytes());
        format!("sha:{:x}", hasher.finalize())
    }

    /// Stamp a fresh UUID if the record has none, and touch `updated_at`.
    pub fn prepare_for_write(&mut self) {
        if self.id.is_empty() {
            self.id = uuid::Uuid::new_v4().to_string();
        }
        self.updated_at = Some(Utc::now());
    }
}

// ============================================================================
// IDENTITY KEY
// ============================================================================

/// Composite physical-card identity: player + year + set + number + company.
///
/// Structural equality - a set name containing arbitrary punctuation can
/// never collide with a different identity, unlike a concatenated string
/// key. Two records missing the same field (both empty) still compare equal
/// on that field; the catalog accepts that permissiveness.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityKey {
    pub player_name: String,
    pub year: String,
    pub set_name: String,
    pub number: String,
    pub company: GradingCompany,
}

impl fmt::Display for IdentityKey {
    /// Log-friendly rendering only; equality never goes through this.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}__{}__{}__{}__{}",
            self.player_name, self.year, self.set_name, self.number, self.company
        )
    }
}

// ============================================================================
// CARD PATCH
// ============================================================================

/// Field updates for one existing catalog entity, produced by feed
/// reconciliation and applied by the catalog collaborator. The engine
/// itself never performs the write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardPatch {
    /// Upsert key of the entity this patch targets (cert number when the
    /// entity has one, identity+grade hash otherwise).
    pub target_key: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cert_number: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_front: Option<String>,

    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn record(player: &str, year: &str, set: &str, number: &str, grade: f64) -> CardRecord {
        CardRecord {
            id: String::new(),
            player_name: player.to_string(),
            year: year.to_string(),
            set_name: set.to_string(),
            number: number.to_string(),
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

    #[test]
    fn test_identity_key_equality() {
        let a = record("Mickey Mantle", "1952", "Topps", "311", 4.0);
        let b = record("Mickey Mantle", "1952", "Topps", "311", 8.0);

        // Grade differs, identity does not
        assert_eq!(a.identity_key(), b.identity_key());

        let c = record("Mickey Mantle", "1952", "Topps Chrome", "311", 4.0);
        assert_ne!(a.identity_key(), c.identity_key());
    }

    #[test]
    fn test_identity_key_no_separator_collision() {
        // With string concatenation these two would collide on "__";
        // structural keys keep them apart.
        let a = record("Player", "1984", "Topps__Update", "1", 9.0);
        let b = record("Player", "1984", "Topps", "Update__1", 9.0);
        assert_ne!(a.identity_key(), b.identity_key());
    }

    #[test]
    fn test_year_compared_as_text() {
        let a = record("Player", "1984", "Topps", "1", 9.0);
        let b = record("Player", "84", "Topps", "1", 9.0);
        assert_ne!(a.identity_key(), b.identity_key());
    }

    #[test]
    fn test_grading_company_parse() {
        assert_eq!("psa".parse::<GradingCompany>().unwrap(), GradingCompany::PSA);
        assert_eq!(" BGS ".parse::<GradingCompany>().unwrap(), GradingCompany::BGS);
        assert_eq!("HGA".parse::<GradingCompany>().unwrap(), GradingCompany::Unknown);
        assert!(!GradingCompany::Unknown.is_supported());
        assert!(GradingCompany::CGC.is_supported());
    }

    #[test]
    fn test_upsert_key_prefers_cert() {
        let mut a = record("Hank Aaron", "1954", "Topps", "128", 6.0);
        a.cert_number = Some("12017123".to_string());
        assert_eq!(a.upsert_key(), "cert:12017123");

        // Same cert, different everything else: still the same entity
        let mut b = record("H. Aaron", "54", "Topps Flagship", "128", 6.5);
        b.cert_number = Some("12017123".to_string());
        assert_eq!(a.upsert_key(), b.upsert_key());
    }

    #[test]
    fn test_upsert_key_identity_grade_fallback() {
        let a = record("Pete Rose", "1963", "Topps", "537", 7.0);
        let b = record("Pete Rose", "1963", "Topps", "537", 7.0);
        let c = record("Pete Rose", "1963", "Topps", "537", 5.0);

        assert_eq!(a.upsert_key(), b.upsert_key());
        assert_ne!(a.upsert_key(), c.upsert_key()); // grade participates

        // Blank cert falls back to the hash, not "cert:"
        let mut d = record("Pete Rose", "1963", "Topps", "537", 7.0);
        d.cert_number = Some("  ".to_string());
        assert_eq!(d.upsert_key(), a.upsert_key());
    }

    #[test]
    fn test_camel_case_round_trip() {
        let mut a = record("Don Mattingly", "1984", "Donruss", "248", 10.0);
        a.images.front = Some("https://img.example/front.jpg".to_string());

        let json = serde_json::to_string(&a).unwrap();
        assert!(json.contains("\"playerName\""));
        assert!(json.contains("\"gradingCompany\""));
        assert!(json.contains("\"set\""));

        let back: CardRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.identity_key(), a.identity_key());
        assert!(back.has_front_image());
    }

    #[test]
    fn test_unknown_fields_preserved() {
        let json = r#"{
            "playerName": "Mark McGwire",
            "year": "1985",
            "set": "Topps",
            "number": "401",
            "gradingCompany": "PSA",
            "grade": 10,
            "fanaticUrl": "https://example.com/listing"
        }"#;
        let rec: CardRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.grade, 10.0);
        assert!(rec.extra.contains_key("fanaticUrl"));
    }
}
