//! String similarity primitives, each returning 0.0-100.0.
//!
//! Inputs are expected to be normalized already. Two empty strings are
//! identical (100); one empty string against a non-empty one scores 0.

/// Indel similarity: `200 * LCS / (len_a + len_b)`.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    ratio_chars(&a, &b)
}

fn ratio_chars(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    200.0 * lcs_len(a, b) as f64 / total as f64
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut cur = vec![0usize; b.len() + 1];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            cur[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                cur[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

/// Best `ratio` of the shorter string against every equal-length window of
/// the longer one.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (short, long) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };

    if short.is_empty() {
        return if long.is_empty() { 100.0 } else { 0.0 };
    }
    if short.len() == long.len() {
        return ratio_chars(short, long);
    }

    let mut best: f64 = 0.0;
    for window in long.windows(short.len()) {
        best = best.max(ratio_chars(short, window));
        if best >= 100.0 {
            break;
        }
    }
    best
}

fn sorted_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// `ratio` after sorting whitespace tokens, so word order is ignored.
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    ratio(&sorted_tokens(a), &sorted_tokens(b))
}

/// Compares the shared tokens against each side's full token set.
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    use std::collections::BTreeSet;

    let ta: BTreeSet<&str> = a.split_whitespace().collect();
    let tb: BTreeSet<&str> = b.split_whitespace().collect();
    if ta.is_empty() || tb.is_empty() {
        return if ta.is_empty() && tb.is_empty() { 100.0 } else { 0.0 };
    }

    let join = |set: Vec<&str>| set.join(" ");
    let common = join(ta.intersection(&tb).copied().collect());
    let only_a = join(ta.difference(&tb).copied().collect());
    let only_b = join(tb.difference(&ta).copied().collect());

    let with = |rest: &str| -> String {
        match (common.is_empty(), rest.is_empty()) {
            (true, _) => rest.to_string(),
            (false, true) => common.clone(),
            (false, false) => format!("{common} {rest}"),
        }
    };
    let full_a = with(&only_a);
    let full_b = with(&only_b);

    let mut best = ratio(&full_a, &full_b);
    if !common.is_empty() {
        best = best.max(ratio(&common, &full_a)).max(ratio(&common, &full_b));
    }
    best
}

/// Weighted ratio: picks the best of the plain, partial and token-based
/// scores, scaling the partial ones down by how unequal the lengths are.
pub fn wratio(a: &str, b: &str) -> f64 {
    let la = a.chars().count();
    let lb = b.chars().count();
    if la == 0 || lb == 0 {
        return if la == lb { 100.0 } else { 0.0 };
    }

    const UNBASE_SCALE: f64 = 0.95;
    let base = ratio(a, b);
    let len_ratio = la.max(lb) as f64 / la.min(lb) as f64;

    if len_ratio < 1.5 {
        return base
            .max(token_sort_ratio(a, b) * UNBASE_SCALE)
            .max(token_set_ratio(a, b) * UNBASE_SCALE);
    }

    let partial_scale = if len_ratio < 8.0 { 0.9 } else { 0.6 };
    base.max(partial_ratio(a, b) * partial_scale)
        .max(partial_ratio(&sorted_tokens(a), &sorted_tokens(b)) * UNBASE_SCALE * partial_scale)
        .max(token_set_ratio(a, b) * UNBASE_SCALE * partial_scale)
}

pub fn jaro_winkler(a: &str, b: &str) -> f64 {
    strsim::jaro_winkler(a, b) * 100.0
}

/// Round a 0-100 float score to the nearest integer, clamped.
pub fn to_score(x: f64) -> u8 {
    if x.is_nan() {
        0
    } else {
        x.round().clamp(0.0, 100.0) as u8
    }
}
