use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};

use crate::model::{CandidatePair, NormalizedRow};

/// Opera-side rows keyed by date, plus the rows with no date at all.
#[derive(Debug, Clone, Default)]
pub struct DateIndex {
    by_date: BTreeMap<NaiveDate, Vec<usize>>,
    dateless: Vec<usize>,
}

impl DateIndex {
    pub fn build(rows: &[NormalizedRow]) -> Self {
        let mut index = Self::default();
        for (i, row) in rows.iter().enumerate() {
            match row.date {
                Some(d) => index.by_date.entry(d).or_default().push(i),
                None => index.dateless.push(i),
            }
        }
        index
    }

    /// Row positions comparable with `row`, ascending.
    ///
    /// A dated row sees rows dated within `tolerance_days`. An undated row
    /// sees the undated rows, and only when `allow_dateless` is set.
    pub fn candidates_for(&self, row: &NormalizedRow, tolerance_days: u32, allow_dateless: bool) -> Vec<usize> {
        let Some(date) = row.date else {
            return if allow_dateless {
                self.dateless.clone()
            } else {
                Vec::new()
            };
        };

        let window = Days::new(tolerance_days as u64);
        let lo = date.checked_sub_days(window).unwrap_or(NaiveDate::MIN);
        let hi = date.checked_add_days(window).unwrap_or(NaiveDate::MAX);

        let mut out: Vec<usize> = self
            .by_date
            .range(lo..=hi)
            .flat_map(|(_, rows)| rows.iter().copied())
            .collect();
        out.sort_unstable();
        out
    }
}

/// Every comparable pair, in GSS row order and then Opera row order.
pub fn candidates(
    gss: &[NormalizedRow],
    opera: &[NormalizedRow],
    tolerance_days: u32,
    allow_dateless: bool,
) -> Vec<CandidatePair> {
    let index = DateIndex::build(opera);
    gss.iter()
        .enumerate()
        .flat_map(|(gi, row)| {
            index
                .candidates_for(row, tolerance_days, allow_dateless)
                .into_iter()
                .map(move |oi| CandidatePair {
                    gss_index: gi,
                    opera_index: oi,
                })
        })
        .collect()
}
