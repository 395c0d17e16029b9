//! Approximate String Matching
//!
//! Similarity scorers on a 0-100 scale and best-of selection over a candidate
//! list. `weighted_ratio` is the default scorer: it blends a plain indel ratio
//! with token-order-insensitive and substring-window variants, picking the
//! family by how different the two lengths are.
//!
//! Any function with the `Scorer` signature can be swapped in through
//! `best_match_with` / `top_matches_with`.

use std::collections::BTreeSet;

/// Token-based scorers are slightly discounted against the plain ratio.
const UNBASE_SCALE: f64 = 0.95;
/// Substring-window scorers are discounted further.
const PARTIAL_SCALE: f64 = 0.90;
/// Used instead of `PARTIAL_SCALE` when one string is over 8x the other.
const LONG_PARTIAL_SCALE: f64 = 0.60;

/// A similarity function returning an integer score in [0, 100].
pub type Scorer = fn(&str, &str) -> u8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match<'a> {
    pub candidate: &'a str,
    /// Position of the candidate in the input order.
    pub index: usize,
    pub score: u8,
}

/// Lowercase, turn every non-alphanumeric character into a space, and trim.
pub fn preprocess(text: &str) -> String {
    let mapped: String = text
        .chars()
        .flat_map(|c| {
            let keep = c.is_alphanumeric();
            c.to_lowercase().map(move |l| if keep { l } else { ' ' })
        })
        .collect();
    mapped.trim().to_string()
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

fn ratio_chars(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    200.0 * lcs_len(a, b) as f64 / total as f64
}

/// Normalized indel similarity: `200 * LCS / (|a| + |b|)`.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    ratio_chars(&a, &b)
}

/// Best `ratio` between the shorter string and every same-length window of
/// the longer one.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    if short.is_empty() {
        return if long.is_empty() { 100.0 } else { 0.0 };
    }
    if short.len() == long.len() {
        return ratio_chars(&short, &long);
    }

    let mut best = 0.0f64;
    for window in long.windows(short.len()) {
        let score = ratio_chars(&short, window);
        if score > best {
            best = score;
            if best >= 100.0 {
                break;
            }
        }
    }
    best
}

fn sorted_tokens(text: &str) -> String {
    let mut tokens: Vec<&str> = text.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Intersection, a-only and b-only token groups, each sorted and joined.
fn token_groups(a: &str, b: &str) -> (String, String, String) {
    let set_a: BTreeSet<&str> = a.split_whitespace().collect();
    let set_b: BTreeSet<&str> = b.split_whitespace().collect();

    let join = |tokens: Vec<&str>| tokens.join(" ");
    let sect = join(set_a.intersection(&set_b).copied().collect());
    let diff_ab = join(set_a.difference(&set_b).copied().collect());
    let diff_ba = join(set_b.difference(&set_a).copied().collect());
    (sect, diff_ab, diff_ba)
}

fn join_nonempty(left: &str, right: &str) -> String {
    match (left.is_empty(), right.is_empty()) {
        (true, _) => right.to_string(),
        (_, true) => left.to_string(),
        _ => format!("{} {}", left, right),
    }
}

pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    ratio(&sorted_tokens(a), &sorted_tokens(b))
}

pub fn partial_token_sort_ratio(a: &str, b: &str) -> f64 {
    partial_ratio(&sorted_tokens(a), &sorted_tokens(b))
}

/// Order- and duplicate-insensitive comparison. A string whose tokens are a
/// subset of the other's scores 100.
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let (sect, diff_ab, diff_ba) = token_groups(a, b);
    if sect.is_empty() && diff_ab.is_empty() && diff_ba.is_empty() {
        return 0.0;
    }
    if !sect.is_empty() && (diff_ab.is_empty() || diff_ba.is_empty()) {
        return 100.0;
    }

    let combined_ab = join_nonempty(&sect, &diff_ab);
    let combined_ba = join_nonempty(&sect, &diff_ba);

    ratio(&sect, &combined_ab)
        .max(ratio(&sect, &combined_ba))
        .max(ratio(&combined_ab, &combined_ba))
}

pub fn partial_token_set_ratio(a: &str, b: &str) -> f64 {
    let (sect, diff_ab, diff_ba) = token_groups(a, b);
    if !sect.is_empty() {
        return 100.0;
    }
    partial_ratio(&diff_ab, &diff_ba)
}

/// Blended similarity used for work names and greetings.
pub fn weighted_ratio(a: &str, b: &str) -> u8 {
    let p1 = preprocess(a);
    let p2 = preprocess(b);
    if p1.is_empty() || p2.is_empty() {
        return 0;
    }

    let l1 = p1.chars().count() as f64;
    let l2 = p2.chars().count() as f64;
    let len_ratio = l1.max(l2) / l1.min(l2);

    let base = ratio(&p1, &p2);
    let best = if len_ratio < 1.5 {
        base.max(token_sort_ratio(&p1, &p2) * UNBASE_SCALE)
            .max(token_set_ratio(&p1, &p2) * UNBASE_SCALE)
    } else {
        let partial_scale = if len_ratio > 8.0 {
            LONG_PARTIAL_SCALE
        } else {
            PARTIAL_SCALE
        };
        base.max(partial_ratio(&p1, &p2) * partial_scale)
            .max(partial_token_sort_ratio(&p1, &p2) * UNBASE_SCALE * partial_scale)
            .max(partial_token_set_ratio(&p1, &p2) * UNBASE_SCALE * partial_scale)
    };

    best.round().clamp(0.0, 100.0) as u8
}

/// Highest-scoring candidate under `weighted_ratio`; ties keep the earliest.
pub fn best_match<'a, I, S>(query: &str, candidates: I) -> Option<Match<'a>>
where
    I: IntoIterator<Item = &'a S>,
    S: AsRef<str> + ?Sized + 'a,
{
    best_match_with(query, candidates, weighted_ratio)
}

pub fn best_match_with<'a, I, S>(query: &str, candidates: I, scorer: Scorer) -> Option<Match<'a>>
where
    I: IntoIterator<Item = &'a S>,
    S: AsRef<str> + ?Sized + 'a,
{
    let mut best: Option<Match<'a>> = None;
    for (index, candidate) in candidates.into_iter().enumerate() {
        let candidate = candidate.as_ref();
        let score = scorer(query, candidate);
        // Strictly greater: the first-inserted candidate wins a tie.
        if best.as_ref().map_or(true, |b| score > b.score) {
            best = Some(Match {
                candidate,
                index,
                score,
            });
        }
    }
    best
}

/// Up to `limit` candidates, best first. Stable on equal scores.
pub fn top_matches<'a, I, S>(query: &str, candidates: I, limit: usize) -> Vec<Match<'a>>
where
    I: IntoIterator<Item = &'a S>,
    S: AsRef<str> + ?Sized + 'a,
{
    top_matches_with(query, candidates, limit, weighted_ratio)
}

pub fn top_matches_with<'a, I, S>(
    query: &str,
    candidates: I,
    limit: usize,
    scorer: Scorer,
) -> Vec<Match<'a>>
where
    I: IntoIterator<Item = &'a S>,
    S: AsRef<str> + ?Sized + 'a,
{
    let mut scored: Vec<Match<'a>> = candidates
        .into_iter()
        .enumerate()
        .map(|(index, candidate)| {
            let candidate = candidate.as_ref();
            Match {
                candidate,
                index,
                score: scorer(query, candidate),
            }
        })
        .collect();
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored.truncate(limit);
    scored
}
