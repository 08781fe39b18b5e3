use crate::model::{MatchResult, MatchSummary};

/// Count results per category, confidence band and pass.
pub fn compute_summary(results: &[MatchResult], total_gss: usize, total_opera: usize) -> MatchSummary {
    let mut summary = MatchSummary {
        total_gss,
        total_opera,
        ..MatchSummary::default()
    };

    for r in results {
        *summary
            .by_confidence
            .entry(r.confidence().to_string())
            .or_insert(0) += 1;

        match r {
            MatchResult::Matched(m) => {
                summary.matched += 1;
                *summary.by_pass.entry(m.pass_label.clone()).or_insert(0) += 1;
            }
            MatchResult::UnmatchedGss { .. } => summary.unmatched_gss += 1,
            MatchResult::UnmatchedOpera { .. } => summary.unmatched_opera += 1,
        }
    }

    summary
}
