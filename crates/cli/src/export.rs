//! Merged CSV export, run as a post-match hook.
//!
//! One line per result: every GSS column prefixed `T1_`, every Opera column
//! prefixed `T2_`, then the score columns. Unmatched rows leave the other
//! side blank and carry `No Match`.

use std::io::Write;
use std::path::PathBuf;

use guestlink_matcher::hooks::{HookContext, PostMatchHook};
use guestlink_matcher::model::MatchedRow;
use guestlink_matcher::{MatchError, MatchResult, RawRecord};

pub const PREFIX_GSS: &str = "T1_";
pub const PREFIX_OPERA: &str = "T2_";

const SCORE_COLUMNS: [&str; 6] = [
    "LastName_Score",
    "FirstName_Score",
    "Combined_Score",
    "Confidence",
    "Pass",
    "ITR_Bucket",
];

pub struct MergedCsvExport {
    path: PathBuf,
}

impl MergedCsvExport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PostMatchHook for MergedCsvExport {
    fn name(&self) -> &str {
        "csv-export"
    }

    fn run(&self, ctx: &HookContext<'_>) -> Result<(), MatchError> {
        let file = std::fs::File::create(&self.path)
            .map_err(|e| MatchError::Io(format!("cannot create {}: {e}", self.path.display())))?;
        write_merged(file, ctx)?;
        log::info!("wrote {} merged rows to {}", ctx.output.results.len(), self.path.display());
        Ok(())
    }
}

/// Columns across all records, in order of first appearance.
fn column_union(records: &[RawRecord]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for record in records {
        for c in record.columns() {
            if !columns.iter().any(|existing| existing == c) {
                columns.push(c.to_string());
            }
        }
    }
    columns
}

fn cells<'a>(record: Option<&'a RawRecord>, columns: &'a [String]) -> impl Iterator<Item = String> + 'a {
    columns
        .iter()
        .map(move |c| record.and_then(|r| r.get(c)).map(|v| v.to_display()).unwrap_or_default())
}

fn opt(v: Option<u8>) -> String {
    v.map(|n| n.to_string()).unwrap_or_default()
}

fn score_cells(m: Option<&MatchedRow>, confidence: &str, itr: Option<u8>) -> [String; 6] {
    match m {
        Some(m) => [
            opt(m.last_name_score),
            opt(m.first_name_score),
            m.score.to_string(),
            confidence.to_string(),
            m.pass_label.clone(),
            opt(itr),
        ],
        None => [
            String::new(),
            String::new(),
            String::new(),
            confidence.to_string(),
            String::new(),
            opt(itr),
        ],
    }
}

pub fn write_merged<W: Write>(writer: W, ctx: &HookContext<'_>) -> Result<(), MatchError> {
    let gss_columns = column_union(&ctx.input.gss);
    let opera_columns = column_union(&ctx.input.opera);

    let mut wtr = csv::Writer::from_writer(writer);
    let io = |e: csv::Error| MatchError::Io(e.to_string());

    let header = gss_columns
        .iter()
        .map(|c| format!("{PREFIX_GSS}{c}"))
        .chain(opera_columns.iter().map(|c| format!("{PREFIX_OPERA}{c}")))
        .chain(SCORE_COLUMNS.iter().map(|c| c.to_string()));
    wtr.write_record(header).map_err(io)?;

    for result in &ctx.output.results {
        let gss = result.gss_index().and_then(|i| ctx.input.gss.get(i));
        let opera = result.opera_index().and_then(|i| ctx.input.opera.get(i));
        let confidence = result.confidence();
        let scores = match result {
            MatchResult::Matched(m) => score_cells(Some(m), confidence.as_str(), m.itr_bucket),
            MatchResult::UnmatchedGss { itr_bucket, .. } => score_cells(None, confidence.as_str(), *itr_bucket),
            MatchResult::UnmatchedOpera { .. } => score_cells(None, confidence.as_str(), None),
        };

        let row = cells(gss, &gss_columns)
            .chain(cells(opera, &opera_columns))
            .chain(scores);
        wtr.write_record(row).map_err(io)?;
    }

    wtr.flush().map_err(|e| MatchError::Io(e.to_string()))?;
    Ok(())
}
