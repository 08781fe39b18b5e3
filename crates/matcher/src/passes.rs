use crate::blocker::DateIndex;
use crate::classify::ConfidenceBands;
use crate::config::PassSpec;
use crate::error::MatchError;
use crate::hooks::{ProgressTracker, RunHooks};
use crate::model::{CandidatePair, MatchedRow, NormalizedRow, RunStatus, ScoredPair};
use crate::scorer::{RowScorer, ScoreContext};

/// What the pass ladder produced, before assembly.
#[derive(Debug, Clone)]
pub struct PassOutcome {
    /// Accepted matches in acceptance order (pass by pass, GSS order within a pass).
    pub matches: Vec<MatchedRow>,
    /// GSS rows with at least one match.
    pub gss_seen: Vec<bool>,
    /// Opera rows consumed by a match.
    pub opera_seen: Vec<bool>,
    /// GSS rows the controller reached at least once. All true unless cancelled.
    pub gss_visited: Vec<bool>,
    pub status: RunStatus,
}

/// Runs the pass ladder for one run. Owns the seen-index state; one
/// controller per run, never shared.
///
/// A matched GSS row is skipped by later passes, except in show-all mode
/// where it keeps collecting candidates. Opera rows are consumed either way.
pub struct PassController<'a> {
    scorer: &'a dyn RowScorer,
    bands: ConfidenceBands,
    passes: &'a [PassSpec],
    show_all: bool,
    gss: &'a [NormalizedRow],
    opera: &'a [NormalizedRow],
    gss_seen: Vec<bool>,
    opera_seen: Vec<bool>,
    gss_visited: Vec<bool>,
}

impl<'a> PassController<'a> {
    pub fn new(
        scorer: &'a dyn RowScorer,
        bands: ConfidenceBands,
        passes: &'a [PassSpec],
        show_all: bool,
        gss: &'a [NormalizedRow],
        opera: &'a [NormalizedRow],
    ) -> Self {
        Self {
            scorer,
            bands,
            passes,
            show_all,
            gss,
            opera,
            gss_seen: vec![false; gss.len()],
            opera_seen: vec![false; opera.len()],
            gss_visited: vec![false; gss.len()],
        }
    }

    pub fn run(mut self, hooks: &RunHooks<'_>) -> Result<PassOutcome, MatchError> {
        let index = DateIndex::build(self.opera);
        let total_steps = self.passes.len() * self.gss.len();
        let mut tracker = ProgressTracker::new(hooks.progress);
        let mut matches = Vec::new();
        let mut status = RunStatus::Completed;

        'passes: for (pass_idx, pass) in self.passes.iter().enumerate() {
            if hooks.cancel.should_cancel() {
                status = RunStatus::Cancelled;
                break;
            }

            let before = matches.len();
            let mut compared = 0usize;
            for (gi, row) in self.gss.iter().enumerate() {
                if hooks.cancel.should_cancel() {
                    status = RunStatus::Cancelled;
                    break 'passes;
                }
                self.gss_visited[gi] = true;

                if self.show_all || !self.gss_seen[gi] {
                    let (hits, n) = self.best_candidates(row, pass, &index)?;
                    compared += n;
                    for hit in hits {
                        self.opera_seen[hit.pair.opera_index] = true;
                        self.gss_seen[gi] = true;
                        matches.push(MatchedRow {
                            gss_index: gi,
                            opera_index: hit.pair.opera_index,
                            score: hit.score.combined,
                            last_name_score: hit.score.last_name,
                            first_name_score: hit.score.first_name,
                            confidence: hit.confidence,
                            pass: pass_idx + 1,
                            pass_label: pass.label.clone(),
                            date_gap_days: hit.date_gap_days,
                            itr_bucket: row.itr_bucket,
                        });
                    }
                }

                tracker.update(pass_idx * self.gss.len() + gi + 1, total_steps);
            }

            log::debug!(
                "pass {} '{}' (threshold {}, tolerance {}d, dateless {}): {} pairs scored, {} matched",
                pass_idx + 1,
                pass.label,
                pass.threshold,
                pass.date_tolerance_days,
                pass.allow_dateless,
                compared,
                matches.len() - before
            );
        }

        if status == RunStatus::Completed {
            tracker.finish();
        } else {
            log::info!("run cancelled after {} matches", matches.len());
        }

        Ok(PassOutcome {
            matches,
            gss_seen: self.gss_seen,
            opera_seen: self.opera_seen,
            gss_visited: self.gss_visited,
            status,
        })
    }

    /// Qualifying candidates for one GSS row, plus the number of pairs scored.
    ///
    /// Best-match mode keeps the single highest score (earliest Opera row on
    /// ties). Show-all mode keeps every qualifying candidate, best first.
    fn best_candidates(
        &self,
        row: &NormalizedRow,
        pass: &PassSpec,
        index: &DateIndex,
    ) -> Result<(Vec<ScoredPair>, usize), MatchError> {
        let mut hits: Vec<ScoredPair> = Vec::new();
        let mut compared = 0;

        for oi in index.candidates_for(row, pass.date_tolerance_days, pass.allow_dateless) {
            if self.opera_seen[oi] {
                continue;
            }
            let other = &self.opera[oi];
            if !self.scorer.admits(row, other) {
                continue;
            }

            let ctx = ScoreContext {
                date_gap: row.date_gap(other),
                tolerance: pass.date_tolerance_days,
                threshold: pass.threshold,
            };
            let score = self.scorer.score(row, other, &ctx)?;
            compared += 1;
            if score.combined < pass.threshold {
                continue;
            }

            let hit = ScoredPair {
                pair: CandidatePair {
                    gss_index: row.index,
                    opera_index: oi,
                },
                score,
                confidence: self.bands.classify(score.combined, pass.threshold),
                date_gap_days: ctx.date_gap,
            };

            if self.show_all {
                hits.push(hit);
            } else if hits.first().map_or(true, |best| hit.score.combined > best.score.combined) {
                hits = vec![hit];
            }
        }

        if self.show_all {
            // stable: equal scores keep Opera order
            hits.sort_by(|a, b| b.score.combined.cmp(&a.score.combined));
        }
        Ok((hits, compared))
    }
}
