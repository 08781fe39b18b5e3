//! Pairwise scoring strategies.
//!
//! One [`RowScorer`] implementation per algorithm family, selected once per
//! run by [`build_scorer`]. Name-based strategies share the same pipeline:
//! score each name component, add date boosts, weight the components by
//! length, add the combined date boost, clamp.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::{Algorithm, MatchConfig, ScoringConfig};
use crate::embedding::{cosine_similarity, Capabilities, EmbeddingProvider};
use crate::error::MatchError;
use crate::fuzz;
use crate::model::{NormalizedRow, PairScore};
use crate::normalize::soundex;

/// Largest allowed relative length difference between two name components
/// before the prefilter rejects the pair.
pub const MAX_NAME_LENGTH_DIFF_RATIO: f64 = 0.5;

/// Ensemble weights in percent: Jaro-Winkler, Weighted Ratio, Token Sort, Partial.
pub const ENSEMBLE_WEIGHTS: [u32; 4] = [35, 30, 20, 15];

/// Record-linkage name agreement floor (Jaro-Winkler, 0-1).
pub const LINKAGE_AGREEMENT_FLOOR: f64 = 0.7;

const LINKAGE_WEIGHT_LAST: f64 = 0.4;
const LINKAGE_WEIGHT_FIRST: f64 = 0.3;
const LINKAGE_WEIGHT_DATE: f64 = 0.3;

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

/// Per-pair context supplied by the pass controller.
#[derive(Debug, Clone, Copy)]
pub struct ScoreContext {
    /// Absolute day distance, when both rows carry a date.
    pub date_gap: Option<u32>,
    /// Tolerance of the current pass.
    pub tolerance: u32,
    /// Acceptance threshold of the current pass.
    pub threshold: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateAgreement {
    Exact,
    Close,
    None,
}

impl ScoreContext {
    pub fn date_agreement(&self) -> DateAgreement {
        match self.date_gap {
            Some(0) => DateAgreement::Exact,
            Some(gap) if gap <= self.tolerance => DateAgreement::Close,
            _ => DateAgreement::None,
        }
    }
}

pub trait RowScorer: Send + Sync {
    fn algorithm(&self) -> Algorithm;

    /// Called once with both tables before any `score`.
    fn prepare(&self, _gss: &[NormalizedRow], _opera: &[NormalizedRow]) -> Result<(), MatchError> {
        Ok(())
    }

    /// Cheap rejection ahead of `score`. `false` means the pair is not scored.
    fn admits(&self, _gss: &NormalizedRow, _opera: &NormalizedRow) -> bool {
        true
    }

    fn score(
        &self,
        gss: &NormalizedRow,
        opera: &NormalizedRow,
        ctx: &ScoreContext,
    ) -> Result<PairScore, MatchError>;
}

/// Build the scorer for `config.algorithm`. Fails when the algorithm's
/// capability is missing; never substitutes another algorithm.
pub fn build_scorer(config: &MatchConfig, caps: &Capabilities) -> Result<Box<dyn RowScorer>, MatchError> {
    let scoring = config.scoring.clone();
    let prefilter = scoring.prefilter && config.algorithm.uses_prefilter();

    let component: Component = match config.algorithm {
        Algorithm::Ensemble => Box::new(ensemble_score),
        Algorithm::WeightedRatio => Box::new(|a: &str, b: &str| fuzz::to_score(fuzz::wratio(a, b))),
        Algorithm::PartialRatio => Box::new(|a: &str, b: &str| fuzz::to_score(fuzz::partial_ratio(a, b))),
        Algorithm::JaroWinkler => Box::new(|a: &str, b: &str| fuzz::to_score(fuzz::jaro_winkler(a, b))),
        Algorithm::TokenSortRatio => Box::new(|a: &str, b: &str| fuzz::to_score(fuzz::token_sort_ratio(a, b))),
        Algorithm::DoubleMetaphone => metaphone_component(scoring.phonetic_partial_credit)?,
        Algorithm::RecordLinkage => return Ok(Box::new(LinkageScorer)),
        Algorithm::Semantic => {
            let provider = caps.embedder.clone().ok_or_else(|| MatchError::Unavailable {
                algorithm: Algorithm::Semantic.key().into(),
                reason: "no embedding provider configured".into(),
            })?;
            return Ok(Box::new(SemanticScorer::new(provider, scoring)));
        }
    };

    Ok(Box::new(NameScorer {
        algorithm: config.algorithm,
        component,
        scoring,
        prefilter,
    }))
}

// ---------------------------------------------------------------------------
// Name-based strategies
// ---------------------------------------------------------------------------

type Component = Box<dyn Fn(&str, &str) -> u8 + Send + Sync>;

struct NameScorer {
    algorithm: Algorithm,
    component: Component,
    scoring: ScoringConfig,
    prefilter: bool,
}

impl RowScorer for NameScorer {
    fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    fn admits(&self, gss: &NormalizedRow, opera: &NormalizedRow) -> bool {
        !self.prefilter || quick_filter(gss, opera)
    }

    fn score(
        &self,
        gss: &NormalizedRow,
        opera: &NormalizedRow,
        ctx: &ScoreContext,
    ) -> Result<PairScore, MatchError> {
        let component = |a: &str, b: &str| -> u8 {
            if a.is_empty() && b.is_empty() {
                0
            } else {
                (self.component)(a, b)
            }
        };
        let mut last = component(&gss.last_name, &opera.last_name);
        let mut first = component(&gss.first_name, &opera.first_name);

        let agreement = ctx.date_agreement();
        let name_boost = match agreement {
            DateAgreement::Exact => self.scoring.exact_date_name,
            DateAgreement::Close => self.scoring.close_date_name,
            DateAgreement::None => 0,
        };
        last = last.saturating_add(name_boost).min(100);
        first = first.saturating_add(name_boost).min(100);

        let last_len = gss.last_name.chars().count() + opera.last_name.chars().count();
        let first_len = gss.first_name.chars().count() + opera.first_name.chars().count();
        let (w_last, w_first) = adaptive_weights(last_len, first_len);
        let mut combined = fuzz::to_score(last as f64 * w_last + first as f64 * w_first);

        combined = combined
            .saturating_add(combined_date_boost(&self.scoring, agreement))
            .min(100);

        if self.scoring.phonetic_bonus > 0 && combined < ctx.threshold {
            let code = soundex(&gss.last_name);
            if !code.is_empty() && code == soundex(&opera.last_name) {
                combined = combined.saturating_add(self.scoring.phonetic_bonus).min(100);
            }
        }

        Ok(PairScore {
            last_name: Some(last),
            first_name: Some(first),
            combined,
        })
    }
}

fn combined_date_boost(scoring: &ScoringConfig, agreement: DateAgreement) -> u8 {
    if !scoring.date_bonus {
        return 0;
    }
    match agreement {
        DateAgreement::Exact => scoring.exact_date_combined,
        DateAgreement::Close => scoring.close_date_combined,
        DateAgreement::None => 0,
    }
}

/// Weighted sum of the four ensemble sub-scores, rounded half-up, clamped.
pub fn ensemble_combine(jaro_winkler: u8, weighted: u8, token_sort: u8, partial: u8) -> u8 {
    let [w_jw, w_wr, w_ts, w_pr] = ENSEMBLE_WEIGHTS;
    let sum = w_jw * jaro_winkler as u32
        + w_wr * weighted as u32
        + w_ts * token_sort as u32
        + w_pr * partial as u32;
    ((sum + 50) / 100).min(100) as u8
}

fn ensemble_score(a: &str, b: &str) -> u8 {
    ensemble_combine(
        fuzz::to_score(fuzz::jaro_winkler(a, b)),
        fuzz::to_score(fuzz::wratio(a, b)),
        fuzz::to_score(fuzz::token_sort_ratio(a, b)),
        fuzz::to_score(fuzz::partial_ratio(a, b)),
    )
}

/// (last, first) weights. 50/50 unless one component carries more than 60%
/// of the characters, in which case it gets its share, capped at 70%.
pub fn adaptive_weights(last_len: usize, first_len: usize) -> (f64, f64) {
    let total = last_len + first_len;
    if total == 0 {
        return (0.5, 0.5);
    }
    let last_portion = last_len as f64 / total as f64;
    let first_portion = first_len as f64 / total as f64;
    if last_portion > 0.6 {
        let w = last_portion.min(0.7);
        (w, 1.0 - w)
    } else if first_portion > 0.6 {
        let w = first_portion.min(0.7);
        (1.0 - w, w)
    } else {
        (0.5, 0.5)
    }
}

/// Reject pairs that cannot reach a useful score: a side with no name, name
/// components of very different length, or different surname initials whose
/// Soundex codes also differ.
pub fn quick_filter(gss: &NormalizedRow, opera: &NormalizedRow) -> bool {
    if !gss.has_name() || !opera.has_name() {
        return false;
    }

    let too_different = |a: &str, b: &str| {
        if a.is_empty() || b.is_empty() {
            return false;
        }
        let (la, lb) = (a.chars().count(), b.chars().count());
        la.abs_diff(lb) as f64 / la.max(lb) as f64 > MAX_NAME_LENGTH_DIFF_RATIO
    };
    if too_different(&gss.last_name, &opera.last_name) || too_different(&gss.first_name, &opera.first_name) {
        return false;
    }

    match (gss.last_name.chars().next(), opera.last_name.chars().next()) {
        (Some(a), Some(b)) if a != b => {
            let code = soundex(&gss.last_name);
            !code.is_empty() && code == soundex(&opera.last_name)
        }
        _ => true,
    }
}

// ---------------------------------------------------------------------------
// Double Metaphone
// ---------------------------------------------------------------------------

#[cfg(feature = "phonetic")]
fn metaphone_component(partial_credit: u8) -> Result<Component, MatchError> {
    Ok(Box::new(move |a: &str, b: &str| metaphone_score(a, b, partial_credit)))
}

#[cfg(not(feature = "phonetic"))]
fn metaphone_component(_partial_credit: u8) -> Result<Component, MatchError> {
    Err(MatchError::Unavailable {
        algorithm: Algorithm::DoubleMetaphone.key().into(),
        reason: "built without the `phonetic` feature".into(),
    })
}

/// Primary and alternate codes. Double Metaphone only encodes ASCII
/// letters, so anything else is dropped first.
#[cfg(feature = "phonetic")]
fn metaphone_codes(s: &str) -> Option<(String, String)> {
    use rphonetic::{DoubleMetaphone, Encoder};

    let letters: String = s.chars().filter(char::is_ascii_alphabetic).collect();
    if letters.is_empty() {
        return None;
    }
    let dm = DoubleMetaphone::default();
    Some((dm.encode(&letters), dm.encode_alternate(&letters)))
}

/// 100 when primary codes agree, `partial_credit` when only an alternate
/// code agrees, 0 otherwise.
#[cfg(feature = "phonetic")]
pub fn metaphone_score(a: &str, b: &str, partial_credit: u8) -> u8 {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let (Some((primary_a, alt_a)), Some((primary_b, alt_b))) = (metaphone_codes(a), metaphone_codes(b))
    else {
        return 0;
    };
    if !primary_a.is_empty() && primary_a == primary_b {
        100
    } else if (!alt_a.is_empty() && (alt_a == alt_b || alt_a == primary_b))
        || (!alt_b.is_empty() && alt_b == primary_a)
    {
        partial_credit
    } else {
        0
    }
}

// ---------------------------------------------------------------------------
// Record linkage
// ---------------------------------------------------------------------------

/// Weighted field agreement over last name, first name and date. Fields
/// absent on both sides drop out and the remaining weights are rescaled.
struct LinkageScorer;

fn name_agreement(a: &str, b: &str) -> Option<f64> {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => None,
        (true, false) | (false, true) => Some(0.0),
        (false, false) => {
            let jw = strsim::jaro_winkler(a, b);
            Some(if jw >= LINKAGE_AGREEMENT_FLOOR { jw } else { 0.0 })
        }
    }
}

impl RowScorer for LinkageScorer {
    fn algorithm(&self) -> Algorithm {
        Algorithm::RecordLinkage
    }

    fn score(
        &self,
        gss: &NormalizedRow,
        opera: &NormalizedRow,
        ctx: &ScoreContext,
    ) -> Result<PairScore, MatchError> {
        let last = name_agreement(&gss.last_name, &opera.last_name);
        let first = name_agreement(&gss.first_name, &opera.first_name);
        let date = ctx.date_gap.map(|_| match ctx.date_agreement() {
            DateAgreement::Exact => 1.0,
            DateAgreement::Close => 0.5,
            DateAgreement::None => 0.0,
        });

        let mut weighted = 0.0;
        let mut total = 0.0;
        for (agreement, weight) in [
            (last, LINKAGE_WEIGHT_LAST),
            (first, LINKAGE_WEIGHT_FIRST),
            (date, LINKAGE_WEIGHT_DATE),
        ] {
            if let Some(a) = agreement {
                weighted += a * weight;
                total += weight;
            }
        }
        let combined = if total > 0.0 {
            fuzz::to_score(100.0 * weighted / total)
        } else {
            0
        };

        Ok(PairScore {
            last_name: last.map(|a| fuzz::to_score(a * 100.0)),
            first_name: first.map(|a| fuzz::to_score(a * 100.0)),
            combined,
        })
    }
}

// ---------------------------------------------------------------------------
// Semantic
// ---------------------------------------------------------------------------

/// Cosine similarity of full-name embeddings. Vectors are cached for the
/// lifetime of the scorer, which is one run.
struct SemanticScorer {
    provider: Arc<dyn EmbeddingProvider>,
    scoring: ScoringConfig,
    cache: Mutex<HashMap<String, Vec<f32>>>,
}

impl SemanticScorer {
    fn new(provider: Arc<dyn EmbeddingProvider>, scoring: ScoringConfig) -> Self {
        Self {
            provider,
            scoring,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn embed_missing(&self, names: Vec<String>) -> Result<(), MatchError> {
        let missing: Vec<String> = {
            let cache = self.cache.lock();
            let mut seen = std::collections::HashSet::new();
            names
                .into_iter()
                .filter(|n| !n.is_empty() && !cache.contains_key(n) && seen.insert(n.clone()))
                .collect()
        };
        if missing.is_empty() {
            return Ok(());
        }

        let vectors = self.provider.embed(&missing)?;
        if vectors.len() != missing.len() {
            return Err(MatchError::Embedding(format!(
                "model '{}' returned {} vectors for {} names",
                self.provider.model_name(),
                vectors.len(),
                missing.len()
            )));
        }
        self.cache.lock().extend(missing.into_iter().zip(vectors));
        Ok(())
    }

    fn similarity(&self, a: &str, b: &str) -> Result<f32, MatchError> {
        self.embed_missing(vec![a.to_string(), b.to_string()])?;
        let cache = self.cache.lock();
        match (cache.get(a), cache.get(b)) {
            (Some(va), Some(vb)) => Ok(cosine_similarity(va, vb)),
            _ => Err(MatchError::Embedding(format!(
                "model '{}' produced no vector for {a:?} or {b:?}",
                self.provider.model_name()
            ))),
        }
    }
}

impl RowScorer for SemanticScorer {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Semantic
    }

    fn prepare(&self, gss: &[NormalizedRow], opera: &[NormalizedRow]) -> Result<(), MatchError> {
        let names = gss.iter().chain(opera).map(NormalizedRow::full_name).collect();
        self.embed_missing(names)
    }

    fn score(
        &self,
        gss: &NormalizedRow,
        opera: &NormalizedRow,
        ctx: &ScoreContext,
    ) -> Result<PairScore, MatchError> {
        let (a, b) = (gss.full_name(), opera.full_name());
        let mut combined = if a.is_empty() || b.is_empty() {
            0
        } else {
            fuzz::to_score(self.similarity(&a, &b)? as f64 * 100.0)
        };
        combined = combined
            .saturating_add(combined_date_boost(&self.scoring, ctx.date_agreement()))
            .min(100);

        Ok(PairScore {
            last_name: None,
            first_name: None,
            combined,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColumnMapping;
    use chrono::NaiveDate;

    fn row(first: &str, last: &str) -> NormalizedRow {
        NormalizedRow {
            index: 0,
            first_name: first.into(),
            last_name: last.into(),
            first_display: first.into(),
            last_display: last.into(),
            date: NaiveDate::from_ymd_opt(2024, 1, 5),
            itr_bucket: None,
        }
    }

    fn config(algorithm: Algorithm) -> MatchConfig {
        MatchConfig::new(
            algorithm,
            ColumnMapping::split("F", "L", "D"),
            ColumnMapping::split("F", "L", "D"),
        )
    }

    fn exact(threshold: u8) -> ScoreContext {
        ScoreContext {
            date_gap: Some(0),
            tolerance: 0,
            threshold,
        }
    }

    fn undated() -> ScoreContext {
        ScoreContext {
            date_gap: None,
            tolerance: 0,
            threshold: 85,
        }
    }

    #[test]
    fn ensemble_combination_rounds_half_up() {
        // 35*90 + 30*80 + 20*70 + 15*60 = 7850 -> 78.5 -> 79
        assert_eq!(ensemble_combine(90, 80, 70, 60), 79);
        assert_eq!(ensemble_combine(100, 100, 100, 100), 100);
        assert_eq!(ensemble_combine(0, 0, 0, 0), 0);
        assert_eq!(ensemble_combine(1, 1, 1, 1), 1);
    }

    #[test]
    fn adaptive_weighting() {
        assert_eq!(adaptive_weights(5, 5), (0.5, 0.5));
        assert_eq!(adaptive_weights(0, 0), (0.5, 0.5));
        let (l, f) = adaptive_weights(10, 2);
        assert!((l - 0.7).abs() < 1e-9 && (f - 0.3).abs() < 1e-9);
        let (l, f) = adaptive_weights(3, 7);
        assert!((l - 0.3).abs() < 1e-9 && (f - 0.7).abs() < 1e-9);
        let (l, _) = adaptive_weights(13, 7);
        assert!((l - 0.65).abs() < 1e-9);
    }

    #[test]
    fn identical_names_exact_date_score_full() {
        let scorer = build_scorer(&config(Algorithm::Ensemble), &Capabilities::none()).unwrap();
        let s = scorer.score(&row("john", "smith"), &row("john", "smith"), &exact(85)).unwrap();
        assert_eq!(s.combined, 100);
        assert_eq!(s.last_name, Some(100));
        assert_eq!(s.first_name, Some(100));
    }

    #[test]
    fn date_boost_lifts_combined_score() {
        let scorer = build_scorer(&config(Algorithm::JaroWinkler), &Capabilities::none()).unwrap();
        let (a, b) = (row("mary", "jones"), row("mary", "james"));
        let without = scorer.score(&a, &b, &undated()).unwrap().combined;
        let close = ScoreContext {
            date_gap: Some(2),
            tolerance: 3,
            threshold: 85,
        };
        let with_close = scorer.score(&a, &b, &close).unwrap().combined;
        let with_exact = scorer.score(&a, &b, &exact(85)).unwrap().combined;
        assert!(with_close > without);
        assert!(with_exact > with_close);
    }

    #[test]
    fn gap_beyond_tolerance_gets_no_boost() {
        let ctx = ScoreContext {
            date_gap: Some(4),
            tolerance: 3,
            threshold: 85,
        };
        assert_eq!(ctx.date_agreement(), DateAgreement::None);
        assert_eq!(exact(85).date_agreement(), DateAgreement::Exact);
    }

    #[test]
    fn disabled_date_bonus_keeps_name_boost_only() {
        let mut cfg = config(Algorithm::JaroWinkler);
        cfg.scoring.date_bonus = false;
        let scorer = build_scorer(&cfg, &Capabilities::none()).unwrap();
        let (a, b) = (row("mary", "smyth"), row("mary", "smith"));
        let without = scorer.score(&a, &b, &undated()).unwrap().combined;
        let with = scorer.score(&a, &b, &exact(85)).unwrap().combined;
        assert!(with >= without && with <= without + 3);
    }

    #[test]
    fn scores_stay_in_range() {
        let scorer = build_scorer(&config(Algorithm::WeightedRatio), &Capabilities::none()).unwrap();
        let s = scorer.score(&row("", "x"), &row("anna", "yy"), &undated()).unwrap();
        assert!(s.combined <= 100);
        let s = scorer.score(&row("", ""), &row("", ""), &exact(85)).unwrap();
        assert!(s.combined <= 100);
    }

    #[test]
    fn phonetic_bonus_applies_below_threshold() {
        let mut cfg = config(Algorithm::PartialRatio);
        cfg.scoring.phonetic_bonus = 15;
        let scorer = build_scorer(&cfg, &Capabilities::none()).unwrap();
        let plain = build_scorer(&config(Algorithm::PartialRatio), &Capabilities::none()).unwrap();
        let (a, b) = (row("ann", "robert"), row("anne", "rupert"));
        let base = plain.score(&a, &b, &undated()).unwrap().combined;
        let boosted = scorer.score(&a, &b, &undated()).unwrap().combined;
        assert_eq!(boosted, (base + 15).min(100));
    }

    #[test]
    fn prefilter_rejects_hopeless_pairs() {
        assert!(quick_filter(&row("john", "smith"), &row("jon", "smyth")));
        assert!(!quick_filter(&row("john", "smith"), &row("john", "jones")));
        assert!(!quick_filter(&row("al", "smith"), &row("alexandra", "smith")));
        assert!(!quick_filter(&row("", ""), &row("john", "smith")));
        // leading punctuation changes the initial but not the soundex code
        assert!(quick_filter(&row("ann", "'abbas"), &row("ann", "abbas")));
        let scorer = build_scorer(&config(Algorithm::Ensemble), &Capabilities::none()).unwrap();
        assert!(!scorer.admits(&row("john", "smith"), &row("john", "jones")));
    }

    #[test]
    fn prefilter_can_be_disabled() {
        let mut cfg = config(Algorithm::Ensemble);
        cfg.scoring.prefilter = false;
        let scorer = build_scorer(&cfg, &Capabilities::none()).unwrap();
        assert!(scorer.admits(&row("john", "smith"), &row("john", "jones")));
        let linkage = build_scorer(&config(Algorithm::RecordLinkage), &Capabilities::none()).unwrap();
        assert!(linkage.admits(&row("john", "smith"), &row("john", "jones")));
    }

    #[test]
    fn record_linkage_agreement() {
        let scorer = build_scorer(&config(Algorithm::RecordLinkage), &Capabilities::none()).unwrap();
        let s = scorer.score(&row("john", "smith"), &row("john", "smith"), &exact(85)).unwrap();
        assert_eq!(s.combined, 100);

        // no dates: names carry all the weight
        let s = scorer.score(&row("john", "smith"), &row("john", "smith"), &undated()).unwrap();
        assert_eq!(s.combined, 100);

        // names below the agreement floor count nothing; only the date agrees
        let s = scorer.score(&row("xavier", "quint"), &row("bob", "lee"), &exact(85)).unwrap();
        assert_eq!(s.last_name, Some(0));
        assert_eq!(s.combined, 30);
    }

    #[test]
    fn semantic_requires_provider() {
        let err = build_scorer(&config(Algorithm::Semantic), &Capabilities::none())
            .err()
            .unwrap();
        assert!(matches!(err, MatchError::Unavailable { .. }));
        assert!(err.to_string().contains("semantic"));
    }

    struct Letters;

    impl EmbeddingProvider for Letters {
        fn model_name(&self) -> &str {
            "letters"
        }
        fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, MatchError> {
            Ok(texts
                .iter()
                .map(|t| {
                    let mut v = vec![0.0f32; 26];
                    for c in t.chars().filter(|c| c.is_ascii_lowercase()) {
                        v[(c as u8 - b'a') as usize] += 1.0;
                    }
                    v
                })
                .collect())
        }
    }

    #[test]
    fn semantic_scores_by_cosine() {
        let caps = Capabilities::with_embedder(Arc::new(Letters));
        let scorer = build_scorer(&config(Algorithm::Semantic), &caps).unwrap();
        let (a, b) = (row("john", "smith"), row("john", "smith"));
        scorer.prepare(&[a.clone()], &[b.clone()]).unwrap();
        let s = scorer.score(&a, &b, &undated()).unwrap();
        assert_eq!(s.combined, 100);
        assert_eq!(s.last_name, None);

        let far = scorer.score(&a, &row("", "xyz"), &undated()).unwrap();
        assert_eq!(far.combined, 0);
    }

    #[cfg(feature = "phonetic")]
    #[test]
    fn metaphone_matches_sound_alikes() {
        assert_eq!(metaphone_score("smith", "smyth", 50), 100);
        assert_eq!(metaphone_score("smith", "", 50), 0);
        assert_eq!(metaphone_score("smith", "jones", 50), 0);
    }

    #[cfg(feature = "phonetic")]
    #[test]
    fn metaphone_ignores_non_letters() {
        assert_eq!(metaphone_score("o'brien", "obrien", 50), 100);
        assert_eq!(metaphone_score("smith-2", "smith", 50), 100);
        assert_eq!(metaphone_score("ßø", "smith", 50), 0);
        assert_eq!(metaphone_score("123", "123", 50), 0);
    }

    #[cfg(not(feature = "phonetic"))]
    #[test]
    fn metaphone_unavailable_without_feature() {
        let err = build_scorer(&config(Algorithm::DoubleMetaphone), &Capabilities::none())
            .err()
            .unwrap();
        assert!(matches!(err, MatchError::Unavailable { .. }));
    }
}
