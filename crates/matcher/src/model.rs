use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::config::Algorithm;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One cell as handed over by the ingestion layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RawValue {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl RawValue {
    /// Classify a text cell: numbers become `Number`, blanks become `Empty`.
    /// A number whose display form differs from the cell stays `Text`.
    pub fn infer(cell: &str) -> Self {
        let trimmed = cell.trim();
        if trimmed.is_empty() {
            return Self::Empty;
        }
        match trimmed.parse::<f64>() {
            // "0214", "1.50" or "+7" would not display as written
            Ok(n) if n.is_finite() && Self::Number(n).to_display() == trimmed => Self::Number(n),
            _ => Self::Text(cell.to_string()),
        }
    }

    /// Display form, used when building merged export rows.
    pub fn to_display(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.clone(),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Self::Number(n) => n.to_string(),
            Self::Date(d) => d.to_string(),
            Self::DateTime(dt) => dt.to_string(),
        }
    }
}

/// One input row: ordered (column, value) pairs. Immutable once read.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawRecord {
    fields: Vec<(String, RawValue)>,
}

impl RawRecord {
    pub fn new(fields: Vec<(String, RawValue)>) -> Self {
        Self { fields }
    }

    pub fn from_pairs<K: Into<String>>(pairs: impl IntoIterator<Item = (K, RawValue)>) -> Self {
        Self {
            fields: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// First value stored under `column`.
    pub fn get(&self, column: &str) -> Option<&RawValue> {
        self.fields.iter().find(|(c, _)| c == column).map(|(_, v)| v)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(c, _)| c.as_str())
    }

    pub fn fields(&self) -> &[(String, RawValue)] {
        &self.fields
    }
}

/// Pre-loaded records for both sides of a run.
#[derive(Debug, Clone, Default)]
pub struct MatchInput {
    pub gss: Vec<RawRecord>,
    pub opera: Vec<RawRecord>,
}

// ---------------------------------------------------------------------------
// Normalized
// ---------------------------------------------------------------------------

/// Canonical view of one input row. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRow {
    /// Position of the originating `RawRecord` in its table.
    pub index: usize,
    /// Case-folded comparison forms; empty when absent.
    pub first_name: String,
    pub last_name: String,
    /// Original-case display forms (trimmed, whitespace collapsed).
    pub first_display: String,
    pub last_display: String,
    pub date: Option<NaiveDate>,
    pub itr_bucket: Option<u8>,
}

impl NormalizedRow {
    pub fn has_name(&self) -> bool {
        !self.first_name.is_empty() || !self.last_name.is_empty()
    }

    /// "first last" comparison string.
    pub fn full_name(&self) -> String {
        match (self.first_name.is_empty(), self.last_name.is_empty()) {
            (false, false) => format!("{} {}", self.first_name, self.last_name),
            (false, true) => self.first_name.clone(),
            (true, _) => self.last_name.clone(),
        }
    }

    /// Absolute day distance to `other`, when both dates are present.
    pub fn date_gap(&self, other: &NormalizedRow) -> Option<u32> {
        match (self.date, other.date) {
            (Some(a), Some(b)) => Some((a - b).num_days().unsigned_abs() as u32),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Pairs
// ---------------------------------------------------------------------------

/// A GSS row and an Opera row the blocker considers comparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CandidatePair {
    pub gss_index: usize,
    pub opera_index: usize,
}

/// Scorer output for one pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PairScore {
    /// Component scores; absent for whole-name strategies.
    pub last_name: Option<u8>,
    pub first_name: Option<u8>,
    pub combined: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoredPair {
    pub pair: CandidatePair,
    pub score: PairScore,
    pub confidence: Confidence,
    pub date_gap_days: Option<u32>,
}

// ---------------------------------------------------------------------------
// Confidence
// ---------------------------------------------------------------------------

/// Ordered lowest to highest, so `>=` compares strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Confidence {
    #[serde(rename = "No Match")]
    NoMatch,
    #[serde(rename = "Very Low")]
    VeryLow,
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
            Self::VeryLow => "Very Low",
            Self::NoMatch => "No Match",
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchedRow {
    pub gss_index: usize,
    pub opera_index: usize,
    pub score: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name_score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name_score: Option<u8>,
    pub confidence: Confidence,
    /// 1-based position in the pass ladder.
    pub pass: usize,
    pub pass_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_gap_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub itr_bucket: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MatchResult {
    Matched(MatchedRow),
    UnmatchedGss {
        gss_index: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        itr_bucket: Option<u8>,
    },
    UnmatchedOpera {
        opera_index: usize,
    },
}

impl MatchResult {
    pub fn gss_index(&self) -> Option<usize> {
        match self {
            Self::Matched(m) => Some(m.gss_index),
            Self::UnmatchedGss { gss_index, .. } => Some(*gss_index),
            Self::UnmatchedOpera { .. } => None,
        }
    }

    pub fn opera_index(&self) -> Option<usize> {
        match self {
            Self::Matched(m) => Some(m.opera_index),
            Self::UnmatchedOpera { opera_index } => Some(*opera_index),
            Self::UnmatchedGss { .. } => None,
        }
    }

    /// Band for export coloring; unmatched rows are `No Match`.
    pub fn confidence(&self) -> Confidence {
        match self {
            Self::Matched(m) => m.confidence,
            _ => Confidence::NoMatch,
        }
    }

    pub fn as_matched(&self) -> Option<&MatchedRow> {
        match self {
            Self::Matched(m) => Some(m),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    /// Stopped by the cancellation hook; results cover processed rows only.
    Cancelled,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchSummary {
    pub total_gss: usize,
    pub total_opera: usize,
    pub matched: usize,
    pub unmatched_gss: usize,
    pub unmatched_opera: usize,
    pub by_confidence: BTreeMap<String, usize>,
    pub by_pass: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchMeta {
    pub config_name: String,
    pub algorithm: Algorithm,
    pub threshold: u8,
    pub date_tolerance_days: u32,
    pub show_all_matches: bool,
    pub passes: Vec<crate::config::PassSpec>,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchOutput {
    pub meta: MatchMeta,
    pub status: RunStatus,
    pub summary: MatchSummary,
    pub results: Vec<MatchResult>,
}

impl MatchOutput {
    pub fn is_cancelled(&self) -> bool {
        self.status == RunStatus::Cancelled
    }

    pub fn matched(&self) -> impl Iterator<Item = &MatchedRow> {
        self.results.iter().filter_map(MatchResult::as_matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infer_cells() {
        assert_eq!(RawValue::infer("  "), RawValue::Empty);
        assert_eq!(RawValue::infer("45292"), RawValue::Number(45292.0));
        assert_eq!(RawValue::infer("Smith"), RawValue::Text("Smith".into()));
        assert_eq!(RawValue::infer("NaN"), RawValue::Text("NaN".into()));
    }

    #[test]
    fn inferred_cells_display_as_written() {
        for cell in ["0214", "02134", "1.50", "+7", "1e3", "-0", "12345678901234567890"] {
            let value = RawValue::infer(cell);
            assert_eq!(value, RawValue::Text(cell.into()), "{cell}");
            assert_eq!(value.to_display(), cell);
        }
        for cell in ["214", "8.5", "-3", "20240105"] {
            let value = RawValue::infer(cell);
            assert!(matches!(value, RawValue::Number(_)), "{cell}");
            assert_eq!(value.to_display(), cell);
        }
    }

    #[test]
    fn record_lookup_keeps_order() {
        let rec = RawRecord::from_pairs([
            ("Last", RawValue::Text("Smith".into())),
            ("First", RawValue::Text("John".into())),
        ]);
        assert_eq!(rec.columns().collect::<Vec<_>>(), ["Last", "First"]);
        assert_eq!(rec.get("First"), Some(&RawValue::Text("John".into())));
        assert_eq!(rec.get("Date"), None);
    }

    #[test]
    fn confidence_orders_by_strength() {
        assert!(Confidence::High > Confidence::Medium);
        assert!(Confidence::Medium > Confidence::Low);
        assert!(Confidence::Low > Confidence::VeryLow);
        assert!(Confidence::VeryLow > Confidence::NoMatch);
        assert_eq!(serde_json::to_string(&Confidence::VeryLow).unwrap(), "\"Very Low\"");
    }

    #[test]
    fn result_serializes_with_status_tag() {
        let r = MatchResult::UnmatchedOpera { opera_index: 3 };
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["status"], "unmatched_opera");
        assert_eq!(json["opera_index"], 3);
    }
}
