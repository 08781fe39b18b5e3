//! Input tables for `glink run` and `glink compare`.
//!
//! `.csv` files go through the engine's CSV loader. `.txt` files are Opera
//! activity logs: one `USER,TIME,DATE,?,ACTION,<text>` line per event, where
//! the text starts with `Last, First has ...`.

use std::path::Path;

use guestlink_matcher::config::ColumnMapping;
use guestlink_matcher::{load_csv_records, MatchError, RawRecord, RawValue};

/// Columns produced by [`parse_opera_log`], in order.
pub const OPERA_LOG_COLUMNS: [&str; 7] = ["USERID", "Time", "Date", "Action", "LastName", "FirstName", "RawText"];

pub fn load_table(table: &str, path: &Path, columns: &ColumnMapping) -> Result<Vec<RawRecord>, MatchError> {
    let bytes = std::fs::read(path).map_err(|e| MatchError::Io(format!("cannot read {}: {e}", path.display())))?;
    // Opera exports are not reliably UTF-8
    let text = String::from_utf8_lossy(&bytes);

    let is_log = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("txt"));
    if !is_log {
        return load_csv_records(table, &text, columns);
    }

    for column in columns.columns() {
        if !OPERA_LOG_COLUMNS.contains(&column) {
            return Err(MatchError::MissingColumn {
                table: table.into(),
                column: column.into(),
            });
        }
    }
    let rows = parse_opera_log(&text);
    if rows.is_empty() {
        return Err(MatchError::Io(format!("{}: no activity log lines found", path.display())));
    }
    log::info!("{table}: {} log lines from {}", rows.len(), path.display());
    Ok(rows)
}

/// Parse an Opera activity log. Lines with fewer than six fields are skipped.
pub fn parse_opera_log(text: &str) -> Vec<RawRecord> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(parse_log_line)
        .collect()
}

fn parse_log_line(line: &str) -> Option<RawRecord> {
    let parts: Vec<&str> = line.split(',').collect();
    if parts.len() < 6 {
        log::debug!("skipping log line with {} fields: {line}", parts.len());
        return None;
    }

    let tail = parts[5..].join(",").trim().to_string();
    let (last, first) = guest_name(&tail);
    let cell = |s: &str| RawValue::infer(s.trim());

    Some(RawRecord::from_pairs([
        ("USERID", cell(parts[0])),
        ("Time", cell(parts[1])),
        ("Date", cell(parts[2])),
        ("Action", cell(parts[4])),
        ("LastName", cell(&last)),
        ("FirstName", cell(&first)),
        ("RawText", RawValue::Text(tail)),
    ]))
}

/// `"Gardiner, Norman has checked in ..."` gives `("Gardiner", "Norman")`.
/// A name without a comma is taken as the surname alone.
fn guest_name(tail: &str) -> (String, String) {
    let Some(idx) = tail.to_lowercase().find(" has ") else {
        return (String::new(), String::new());
    };
    // lowercasing can shift byte offsets for non-ASCII text
    let Some(name) = tail.get(..idx) else {
        return (String::new(), String::new());
    };
    match name.split_once(',') {
        Some((last, first)) => (last.trim().to_string(), first.trim().to_string()),
        None => (name.trim().to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> RawValue {
        RawValue::Text(s.into())
    }

    #[test]
    fn parses_checkin_line() {
        let rows = parse_opera_log(
            "FDESK1,14:02,01/05/24,X,CHECKIN,Gardiner, Norman has checked in Inspected room 0214\n",
        );
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.get("USERID"), Some(&text("FDESK1")));
        assert_eq!(row.get("Action"), Some(&text("CHECKIN")));
        assert_eq!(row.get("LastName"), Some(&text("Gardiner")));
        assert_eq!(row.get("FirstName"), Some(&text("Norman")));
        assert_eq!(
            row.get("RawText"),
            Some(&text("Gardiner, Norman has checked in Inspected room 0214"))
        );
        assert_eq!(row.columns().collect::<Vec<_>>(), OPERA_LOG_COLUMNS);
    }

    #[test]
    fn single_token_name_is_surname() {
        let rows = parse_opera_log("U,1,D,X,NOTE,Madonna has requested late checkout");
        assert_eq!(rows[0].get("LastName"), Some(&text("Madonna")));
        assert_eq!(rows[0].get("FirstName"), Some(&RawValue::Empty));
    }

    #[test]
    fn lines_without_a_guest_keep_empty_names() {
        let rows = parse_opera_log("U,1,D,X,AUDIT,Night audit started\n\nshort,line\n");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("LastName"), Some(&RawValue::Empty));
    }

    #[test]
    fn txt_mapping_must_use_log_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("opera.txt");
        std::fs::write(&path, "U,1,D,X,CHECKIN,Smith, John has checked in\n").unwrap();

        let ok = load_table("opera", &path, &ColumnMapping::split("FirstName", "LastName", "Date")).unwrap();
        assert_eq!(ok.len(), 1);

        let err = load_table("opera", &path, &ColumnMapping::full("Guest Name", "Date")).unwrap_err();
        assert!(matches!(err, MatchError::MissingColumn { ref column, .. } if column == "Guest Name"));
    }

    proptest::proptest! {
        #[test]
        fn guest_name_survives_log_format(
            last in "[A-Z][a-z]{1,10}( [A-Z][a-z]{1,8})?",
            first in "[A-GI-Z][a-z]{1,10}",
            room in 100u32..999,
        ) {
            let line = format!("FDESK,09:15,01/05/24,X,CHECKIN,{last}, {first} has checked in room {room}");
            let rows = parse_opera_log(&line);
            proptest::prop_assert_eq!(rows.len(), 1);
            proptest::prop_assert_eq!(rows[0].get("LastName"), Some(&text(&last)));
            proptest::prop_assert_eq!(rows[0].get("FirstName"), Some(&text(&first)));
        }

        #[test]
        fn arbitrary_text_never_panics(input in "\\PC{0,200}") {
            let _ = parse_opera_log(&input);
        }
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_table(
            "gss",
            Path::new("/nonexistent/gss.csv"),
            &ColumnMapping::split("First", "Last", "Date"),
        )
        .unwrap_err();
        assert!(matches!(err, MatchError::Io(_)));
    }
}
