use std::collections::BTreeMap;

use crate::config::UnmatchedPlacement;
use crate::model::{MatchResult, MatchedRow, NormalizedRow, RunStatus};
use crate::passes::PassOutcome;

/// Merge pass results into one ordered result list.
///
/// Matched rows follow GSS input order (several per row in show-all mode).
/// Unmatched GSS rows are interleaved at their input position or appended
/// after the matches. Unmatched Opera rows come last, in Opera order. A
/// cancelled run reports only the GSS rows it reached and no Opera leftovers.
pub fn assemble(outcome: PassOutcome, gss: &[NormalizedRow], placement: UnmatchedPlacement) -> Vec<MatchResult> {
    let PassOutcome {
        matches,
        gss_seen,
        opera_seen,
        gss_visited,
        status,
    } = outcome;

    let mut by_gss: BTreeMap<usize, Vec<MatchedRow>> = BTreeMap::new();
    for m in matches {
        by_gss.entry(m.gss_index).or_default().push(m);
    }

    let unmatched = |gi: usize| MatchResult::UnmatchedGss {
        gss_index: gi,
        itr_bucket: gss.get(gi).and_then(|r| r.itr_bucket),
    };
    let is_unmatched = |gi: usize| gss_visited[gi] && !gss_seen[gi];

    let mut results = Vec::with_capacity(gss.len() + opera_seen.len());
    match placement {
        UnmatchedPlacement::Interleaved => {
            for gi in 0..gss_visited.len() {
                if let Some(rows) = by_gss.remove(&gi) {
                    results.extend(rows.into_iter().map(MatchResult::Matched));
                } else if is_unmatched(gi) {
                    results.push(unmatched(gi));
                }
            }
        }
        UnmatchedPlacement::Appended => {
            results.extend(by_gss.into_values().flatten().map(MatchResult::Matched));
            results.extend((0..gss_visited.len()).filter(|gi| is_unmatched(*gi)).map(unmatched));
        }
    }

    if status == RunStatus::Completed {
        results.extend(
            opera_seen
                .iter()
                .enumerate()
                .filter(|(_, seen)| !**seen)
                .map(|(oi, _)| MatchResult::UnmatchedOpera { opera_index: oi }),
        );
    }

    results
}
