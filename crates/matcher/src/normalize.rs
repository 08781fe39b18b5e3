//! Raw record -> `NormalizedRow`.
//!
//! Total: every input yields a row. Unreadable names become empty strings and
//! unreadable dates become `None`; nothing here returns an error.

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::config::{ColumnMapping, DateOrder, NameConfig};
use crate::model::{NormalizedRow, RawRecord, RawValue};

/// Spreadsheet serial dates accepted as calendar dates (inclusive).
pub const SERIAL_DATE_MIN: f64 = 1.0;
pub const SERIAL_DATE_MAX: f64 = 60000.0;

/// Parsed text dates outside this year range are treated as misreads.
const MIN_YEAR: i32 = 1900;
const MAX_YEAR: i32 = 2099;

const PLACEHOLDERS: [&str; 5] = ["nan", "none", "null", "nat", "n/a"];

const COMPOUND_SURNAME_PREFIXES: [&str; 11] =
    ["van", "der", "de", "la", "del", "di", "da", "dos", "el", "al", "abu"];

const FIRST_NAME_VARIANTS: [(&str, &str); 12] = [
    ("mo", "mohamed"),
    ("mohammed", "mohamed"),
    ("muhammad", "mohamed"),
    ("muhammed", "mohamed"),
    ("mohammad", "mohamed"),
    ("alex", "alexander"),
    ("tony", "anthony"),
    ("mike", "michael"),
    ("mikey", "michael"),
    ("tom", "thomas"),
    ("johnny", "john"),
    ("jon", "john"),
];

// ---------------------------------------------------------------------------
// Row normalization
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Normalizer<'a> {
    names: &'a NameConfig,
    date_order: DateOrder,
}

impl<'a> Normalizer<'a> {
    pub fn new(names: &'a NameConfig, date_order: DateOrder) -> Self {
        Self { names, date_order }
    }

    pub fn normalize(&self, index: usize, record: &RawRecord, columns: &ColumnMapping) -> NormalizedRow {
        let cell = |col: &Option<String>| -> String {
            col.as_deref()
                .and_then(|c| record.get(c))
                .map(name_text)
                .unwrap_or_default()
        };

        let mut first_display = clean_display(&cell(&columns.first_name));
        let mut last_display = clean_display(&cell(&columns.last_name));
        if first_display.is_empty() && last_display.is_empty() {
            let (first, last) = split_full_name(&cell(&columns.full_name));
            first_display = first;
            last_display = last;
        }

        let first_name = self.fold_first(&first_display);
        let last_name = self.fold_last(&last_display);

        let date = columns
            .date
            .as_deref()
            .and_then(|c| record.get(c))
            .and_then(|v| parse_date(v, self.date_order));

        let itr_bucket = columns
            .itr
            .as_deref()
            .and_then(|c| record.get(c))
            .and_then(itr_bucket);

        NormalizedRow {
            index,
            first_name,
            last_name,
            first_display,
            last_display,
            date,
            itr_bucket,
        }
    }

    pub fn normalize_table(&self, records: &[RawRecord], columns: &ColumnMapping) -> Vec<NormalizedRow> {
        records
            .iter()
            .enumerate()
            .map(|(i, r)| self.normalize(i, r, columns))
            .collect()
    }

    fn fold_last(&self, display: &str) -> String {
        if self.names.normalize {
            normalize_component(display, self.names.compound_surnames)
        } else {
            display.to_lowercase()
        }
    }

    fn fold_first(&self, display: &str) -> String {
        let folded = if self.names.normalize {
            normalize_component(display, false)
        } else {
            display.to_lowercase()
        };
        if self.names.first_name_variants {
            canonical_first_name(&folded)
        } else {
            folded
        }
    }
}

/// Rebuild a record from a normalized row, using `first_name`, `last_name`,
/// `date` and `itr` columns. Normalizing it again yields the same row.
pub fn denormalize(row: &NormalizedRow) -> RawRecord {
    RawRecord::from_pairs([
        ("first_name", RawValue::Text(row.first_display.clone())),
        ("last_name", RawValue::Text(row.last_display.clone())),
        ("date", row.date.map(RawValue::Date).unwrap_or(RawValue::Empty)),
        (
            "itr",
            row.itr_bucket
                .map(|b| RawValue::Number(b as f64))
                .unwrap_or(RawValue::Empty),
        ),
    ])
}

fn name_text(value: &RawValue) -> String {
    let s = value.to_display();
    if PLACEHOLDERS.contains(&s.trim().to_lowercase().as_str()) {
        String::new()
    } else {
        s
    }
}

// ---------------------------------------------------------------------------
// Names
// ---------------------------------------------------------------------------

/// Trim and collapse internal whitespace, keeping case.
pub fn clean_display(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split a full name into (first, last).
///
/// `"Smith, John"` is read surname-first; otherwise the split is on the last
/// whitespace run, so `"Mary Ann Smith"` gives `("Mary Ann", "Smith")`.
pub fn split_full_name(full: &str) -> (String, String) {
    let full = clean_display(full);
    if let Some((last, first)) = full.split_once(',') {
        return (clean_display(first), clean_display(last));
    }
    match full.rsplit_once(' ') {
        Some((first, last)) => (first.to_string(), last.to_string()),
        None => (String::new(), full),
    }
}

pub fn strip_accents(s: &str) -> String {
    s.nfd().filter(|c| !is_combining_mark(*c)).nfc().collect()
}

/// Shrink runs of three or more identical characters to two.
pub fn squeeze_repeats(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev: Option<char> = None;
    let mut run = 0;
    for c in s.chars() {
        if Some(c) == prev {
            run += 1;
        } else {
            prev = Some(c);
            run = 1;
        }
        if run <= 2 {
            out.push(c);
        }
    }
    out
}

/// Lowercase, punctuation to spaces, single-spaced.
pub fn basic_clean(s: &str) -> String {
    let lowered: String = s
        .to_lowercase()
        .chars()
        .map(|c| match c {
            '.' | ',' | ';' | ':' | '!' | '?' | '-' | '_' | '/' | '\\' => ' ',
            c => c,
        })
        .collect();
    clean_display(&lowered)
}

/// Comparison form of one name component.
pub fn normalize_component(s: &str, compound: bool) -> String {
    let t = basic_clean(&squeeze_repeats(&strip_accents(s.trim())));
    if !compound || t.is_empty() {
        return t;
    }

    let parts: Vec<&str> = t.split(' ').collect();
    let mut joined = Vec::with_capacity(parts.len());
    let mut i = 0;
    while i < parts.len() {
        if COMPOUND_SURNAME_PREFIXES.contains(&parts[i]) && i + 1 < parts.len() {
            joined.push(format!("{} {}", parts[i], parts[i + 1]));
            i += 2;
        } else {
            joined.push(parts[i].to_string());
            i += 1;
        }
    }
    joined.join(" ")
}

pub fn canonical_first_name(folded: &str) -> String {
    FIRST_NAME_VARIANTS
        .iter()
        .find(|(variant, _)| *variant == folded)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or_else(|| folded.to_string())
}

/// Four-character Soundex code; empty for names without letters.
pub fn soundex(name: &str) -> String {
    let cleaned = basic_clean(&strip_accents(name));
    let mut letters = cleaned.chars().filter(|c| c.is_ascii_alphabetic());
    let Some(first) = letters.next() else {
        return String::new();
    };

    let digit = |c: char| match c {
        'b' | 'f' | 'p' | 'v' => Some('1'),
        'c' | 'g' | 'j' | 'k' | 'q' | 's' | 'x' | 'z' => Some('2'),
        'd' | 't' => Some('3'),
        'l' => Some('4'),
        'm' | 'n' => Some('5'),
        'r' => Some('6'),
        _ => None,
    };

    let mut code = String::with_capacity(4);
    code.push(first.to_ascii_uppercase());
    let mut prev = digit(first);
    for c in letters {
        let d = digit(c);
        if let Some(d) = d {
            if Some(d) != prev {
                code.push(d);
            }
        }
        prev = d;
        if code.len() == 4 {
            break;
        }
    }
    while code.len() < 4 {
        code.push('0');
    }
    code
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

const ISO_FORMATS: [&str; 5] = ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y %m %d", "%Y%m%d"];

// Two-digit-year forms come first: `%Y` also accepts two digits.
const MONTH_FIRST_FORMATS: [&str; 8] = [
    "%m/%d/%y", "%m/%d/%Y", "%m-%d-%y", "%m-%d-%Y", "%m.%d.%y", "%m.%d.%Y", "%m %d %y", "%m %d %Y",
];

const DAY_FIRST_FORMATS: [&str; 8] = [
    "%d/%m/%y", "%d/%m/%Y", "%d-%m-%y", "%d-%m-%Y", "%d.%m.%y", "%d.%m.%Y", "%d %m %y", "%d %m %Y",
];

const NAMED_MONTH_FORMATS: [&str; 7] = [
    "%d %B %Y", "%B %d, %Y", "%B %d %Y", "%d-%b-%y", "%d-%b-%Y", "%b %d, %Y", "%d %b %Y",
];

const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const MONTH_FIRST_DATETIME_FORMATS: [&str; 3] = ["%m/%d/%Y %H:%M:%S", "%m/%d/%Y %H:%M", "%m/%d/%Y %I:%M %p"];
const DAY_FIRST_DATETIME_FORMATS: [&str; 3] = ["%d/%m/%Y %H:%M:%S", "%d/%m/%Y %H:%M", "%d/%m/%Y %I:%M %p"];

static PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(date|on|at|from|to):?\s*").expect("valid prefix regex"));

static EMBEDDED_ISO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})[/-](\d{1,2})[/-](\d{1,2})").expect("valid iso regex"));

/// Coerce any raw cell to a calendar date. First successful reading wins.
pub fn parse_date(value: &RawValue, order: DateOrder) -> Option<NaiveDate> {
    match value {
        RawValue::Empty => None,
        RawValue::Date(d) => Some(*d),
        RawValue::DateTime(dt) => Some(dt.date()),
        // 20240105 is out of serial range but reads as a compact date
        RawValue::Number(n) => serial_date(*n).or_else(|| parse_date_str(&value.to_display(), order)),
        RawValue::Text(s) => parse_date_str(s, order),
    }
}

/// Spreadsheet day-count serial (1899-12-30 epoch).
pub fn serial_date(n: f64) -> Option<NaiveDate> {
    if !(SERIAL_DATE_MIN..=SERIAL_DATE_MAX).contains(&n) {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(n.trunc() as u64))
}

pub fn parse_date_str(raw: &str, order: DateOrder) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() || PLACEHOLDERS.contains(&s.to_lowercase().as_str()) {
        return None;
    }
    let s = PREFIX_RE.replace(s, "");
    let s = s.trim();

    let (preferred, fallback, preferred_dt, fallback_dt) = match order {
        DateOrder::MonthFirst => (
            &MONTH_FIRST_FORMATS,
            &DAY_FIRST_FORMATS,
            &MONTH_FIRST_DATETIME_FORMATS,
            &DAY_FIRST_DATETIME_FORMATS,
        ),
        DateOrder::DayFirst => (
            &DAY_FIRST_FORMATS,
            &MONTH_FIRST_FORMATS,
            &DAY_FIRST_DATETIME_FORMATS,
            &MONTH_FIRST_DATETIME_FORMATS,
        ),
    };

    let date_formats = ISO_FORMATS
        .iter()
        .chain(preferred.iter())
        .chain(fallback.iter())
        .chain(NAMED_MONTH_FORMATS.iter());
    for fmt in date_formats {
        if let Some(d) = NaiveDate::parse_from_str(s, fmt).ok().filter(plausible) {
            return Some(d);
        }
    }

    let datetime_formats = DATETIME_FORMATS
        .iter()
        .chain(preferred_dt.iter())
        .chain(fallback_dt.iter());
    for fmt in datetime_formats {
        if let Some(d) = NaiveDateTime::parse_from_str(s, fmt)
            .ok()
            .map(|dt| dt.date())
            .filter(plausible)
        {
            return Some(d);
        }
    }

    if let Some(d) = chrono::DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.date_naive())
        .filter(plausible)
    {
        return Some(d);
    }

    let caps = EMBEDDED_ISO_RE.captures(s)?;
    let year: i32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let day: u32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day).filter(plausible)
}

fn plausible(d: &NaiveDate) -> bool {
    (MIN_YEAR..=MAX_YEAR).contains(&d.year())
}

// ---------------------------------------------------------------------------
// ITR
// ---------------------------------------------------------------------------

/// Intent-to-return bucket: 0-7 -> 0, 8 -> 8, 9-10 -> 10.
pub fn itr_bucket(value: &RawValue) -> Option<u8> {
    let v = match value {
        RawValue::Number(n) => *n,
        RawValue::Text(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !v.is_finite() {
        None
    } else if v <= 7.0 {
        Some(0)
    } else if v == 8.0 {
        Some(8)
    } else if v >= 9.0 {
        Some(10)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn text(s: &str) -> RawValue {
        RawValue::Text(s.into())
    }

    #[test]
    fn display_collapses_whitespace() {
        assert_eq!(clean_display("  Mary   Ann \t "), "Mary Ann");
    }

    #[test]
    fn full_name_splits_on_last_space() {
        assert_eq!(split_full_name("Mary  Ann Smith"), ("Mary Ann".into(), "Smith".into()));
        assert_eq!(split_full_name("Smith, John"), ("John".into(), "Smith".into()));
        assert_eq!(split_full_name("Cher"), (String::new(), "Cher".into()));
        assert_eq!(split_full_name("   "), (String::new(), String::new()));
    }

    #[test]
    fn component_normalization() {
        assert_eq!(normalize_component("  José-Luis ", false), "jose luis");
        assert_eq!(normalize_component("Aaaaron", false), "aaron");
        assert_eq!(normalize_component("Van Der Berg", true), "van der berg");
        assert_eq!(normalize_component("El Amin", true), "el amin");
        assert_eq!(normalize_component("O.Brien", false), "o brien");
    }

    #[test]
    fn first_name_variants() {
        assert_eq!(canonical_first_name("jon"), "john");
        assert_eq!(canonical_first_name("mohammed"), "mohamed");
        assert_eq!(canonical_first_name("sarah"), "sarah");
    }

    #[test]
    fn soundex_codes() {
        assert_eq!(soundex("Robert"), "R163");
        assert_eq!(soundex("Rupert"), "R163");
        assert_eq!(soundex("Tymczak"), "T522");
        assert_eq!(soundex("Lee"), "L000");
        assert_eq!(soundex(""), "");
    }

    #[test]
    fn serial_dates() {
        assert_eq!(parse_date(&RawValue::Number(45296.0), DateOrder::MonthFirst), Some(d(2024, 1, 5)));
        assert_eq!(parse_date(&RawValue::Number(1.0), DateOrder::MonthFirst), Some(d(1899, 12, 31)));
        assert_eq!(parse_date(&RawValue::Number(0.0), DateOrder::MonthFirst), None);
        assert_eq!(parse_date(&RawValue::Number(60001.0), DateOrder::MonthFirst), None);
        assert_eq!(parse_date(&RawValue::Number(-4.0), DateOrder::MonthFirst), None);
    }

    #[test]
    fn compact_dates_from_numbers_and_text() {
        let mf = DateOrder::MonthFirst;
        assert_eq!(parse_date(&RawValue::infer("20240105"), mf), Some(d(2024, 1, 5)));
        assert_eq!(parse_date(&RawValue::Number(20240105.0), DateOrder::DayFirst), Some(d(2024, 1, 5)));
        assert_eq!(parse_date(&text("20240105"), mf), Some(d(2024, 1, 5)));
        assert_eq!(parse_date(&RawValue::Number(20241305.0), mf), None);
    }

    #[test]
    fn text_dates() {
        let mf = DateOrder::MonthFirst;
        assert_eq!(parse_date(&text("2024-01-05"), mf), Some(d(2024, 1, 5)));
        assert_eq!(parse_date(&text("01/05/2024"), mf), Some(d(2024, 1, 5)));
        assert_eq!(parse_date(&text("01/05/24"), mf), Some(d(2024, 1, 5)));
        assert_eq!(parse_date(&text("15/01/2024"), mf), Some(d(2024, 1, 15)));
        assert_eq!(parse_date(&text("15.01.2024"), mf), Some(d(2024, 1, 15)));
        assert_eq!(parse_date(&text("January 15, 2024"), mf), Some(d(2024, 1, 15)));
        assert_eq!(parse_date(&text("15 Jan 2024"), mf), Some(d(2024, 1, 15)));
        assert_eq!(parse_date(&text("2024-01-05 14:30:00"), mf), Some(d(2024, 1, 5)));
        assert_eq!(parse_date(&text("Date: 2024-01-05"), mf), Some(d(2024, 1, 5)));
        assert_eq!(parse_date(&text("checked in 2024/01/05 late"), mf), Some(d(2024, 1, 5)));
    }

    #[test]
    fn day_first_order() {
        assert_eq!(parse_date(&text("01/05/2024"), DateOrder::DayFirst), Some(d(2024, 5, 1)));
        assert_eq!(parse_date(&text("13/05/2024"), DateOrder::DayFirst), Some(d(2024, 5, 13)));
        assert_eq!(parse_date(&text("05/13/2024"), DateOrder::DayFirst), Some(d(2024, 5, 13)));
    }

    #[test]
    fn unparseable_dates_are_absent() {
        let mf = DateOrder::MonthFirst;
        assert_eq!(parse_date(&text("tomorrow"), mf), None);
        assert_eq!(parse_date(&text("nan"), mf), None);
        assert_eq!(parse_date(&text("31/31/2024"), mf), None);
        assert_eq!(parse_date(&RawValue::Empty, mf), None);
    }

    #[test]
    fn itr_buckets() {
        assert_eq!(itr_bucket(&RawValue::Number(3.0)), Some(0));
        assert_eq!(itr_bucket(&RawValue::Number(7.0)), Some(0));
        assert_eq!(itr_bucket(&text("8")), Some(8));
        assert_eq!(itr_bucket(&RawValue::Number(9.0)), Some(10));
        assert_eq!(itr_bucket(&RawValue::Number(10.0)), Some(10));
        assert_eq!(itr_bucket(&RawValue::Number(8.5)), None);
        assert_eq!(itr_bucket(&text("n/a")), None);
    }

    #[test]
    fn normalize_split_columns() {
        let names = NameConfig::default();
        let norm = Normalizer::new(&names, DateOrder::MonthFirst);
        let rec = RawRecord::from_pairs([
            ("First", text("  Jon ")),
            ("Last", text("SMITH")),
            ("Arrival", text("2024-01-05")),
        ]);
        let row = norm.normalize(4, &rec, &ColumnMapping::split("First", "Last", "Arrival"));
        assert_eq!(row.index, 4);
        assert_eq!(row.first_name, "john");
        assert_eq!(row.last_name, "smith");
        assert_eq!(row.first_display, "Jon");
        assert_eq!(row.last_display, "SMITH");
        assert_eq!(row.date, Some(d(2024, 1, 5)));
    }

    #[test]
    fn normalize_full_name_column() {
        let names = NameConfig::default();
        let norm = Normalizer::new(&names, DateOrder::MonthFirst);
        let rec = RawRecord::from_pairs([("Guest", text("Mary Ann  de la Cruz")), ("Date", RawValue::Empty)]);
        let row = norm.normalize(0, &rec, &ColumnMapping::full("Guest", "Date"));
        assert_eq!(row.first_display, "Mary Ann de la");
        assert_eq!(row.last_display, "Cruz");
        assert_eq!(row.date, None);
    }

    #[test]
    fn missing_columns_yield_empty_fields() {
        let names = NameConfig::default();
        let norm = Normalizer::new(&names, DateOrder::MonthFirst);
        let row = norm.normalize(0, &RawRecord::default(), &ColumnMapping::split("F", "L", "D"));
        assert!(!row.has_name());
        assert_eq!(row.date, None);
    }

    #[test]
    fn renormalizing_is_stable() {
        let names = NameConfig::default();
        let norm = Normalizer::new(&names, DateOrder::MonthFirst);
        let rec = RawRecord::from_pairs([
            ("Guest", text("  José   van der Berg ")),
            ("Date", RawValue::Number(45296.0)),
            ("ITR", text("9")),
        ]);
        let mapping = ColumnMapping {
            itr: Some("ITR".into()),
            ..ColumnMapping::full("Guest", "Date")
        };
        let row = norm.normalize(2, &rec, &mapping);
        let again = norm.normalize(
            2,
            &denormalize(&row),
            &ColumnMapping {
                itr: Some("itr".into()),
                ..ColumnMapping::split("first_name", "last_name", "date")
            },
        );
        assert_eq!(row, again);
    }
}
