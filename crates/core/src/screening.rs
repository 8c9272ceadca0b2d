use crate::models::SanctionRecord;
use crate::store::RecordStore;
use rapidfuzz::distance::indel;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeSet;

pub const DEFAULT_CANDIDATE_LIMIT: usize = 10;

/// A ranked candidate. `position` is the record's index in the store, so two
/// records sharing a search key stay distinct hits.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ScreeningHit {
    pub position: usize,
    pub score: u8,
    pub record: SanctionRecord,
}

/// Lowercases, keeps ASCII word characters and turns everything else that is
/// ASCII into a space. Non-ASCII characters are dropped.
pub fn preprocess(text: &str) -> String {
    let cleaned = text
        .chars()
        .filter(char::is_ascii)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect::<String>();
    cleaned.trim().to_string()
}

/// Order-insensitive similarity of the de-duplicated token sets, 0..=100.
///
/// With `I` the sorted shared tokens and `A`, `B` the sorted leftovers of each
/// side, the score is the best indel ratio among `I` vs `I A`, `I` vs `I B` and
/// `I A` vs `I B`. A full subset on either side scores 100.
pub fn token_set_ratio(left: &str, right: &str) -> u8 {
    let left = preprocess(left);
    let right = preprocess(right);

    let left_tokens = left.split_whitespace().collect::<BTreeSet<_>>();
    let right_tokens = right.split_whitespace().collect::<BTreeSet<_>>();
    if left_tokens.is_empty() || right_tokens.is_empty() {
        return 0;
    }

    let shared = left_tokens
        .intersection(&right_tokens)
        .copied()
        .collect::<Vec<_>>();
    let left_only = left_tokens
        .difference(&right_tokens)
        .copied()
        .collect::<Vec<_>>();
    let right_only = right_tokens
        .difference(&left_tokens)
        .copied()
        .collect::<Vec<_>>();

    if !shared.is_empty() && (left_only.is_empty() || right_only.is_empty()) {
        return 100;
    }

    let sect = shared.join(" ");
    let with_left = join_nonempty(&sect, &left_only.join(" "));
    let with_right = join_nonempty(&sect, &right_only.join(" "));

    [
        indel_ratio(&sect, &with_left),
        indel_ratio(&sect, &with_right),
        indel_ratio(&with_left, &with_right),
    ]
    .into_iter()
    .max()
    .unwrap_or(0)
}

fn join_nonempty(head: &str, tail: &str) -> String {
    match (head.is_empty(), tail.is_empty()) {
        (true, _) => tail.to_string(),
        (_, true) => head.to_string(),
        _ => format!("{head} {tail}"),
    }
}

/// Indel similarity as a percentage, rounded half to even.
fn indel_ratio(left: &str, right: &str) -> u8 {
    let total = left.len() + right.len();
    if left.is_empty() || right.is_empty() {
        return 0;
    }

    // indel similarity is `total - distance`, i.e. twice the LCS length.
    let similarity = indel::similarity(left.chars(), right.chars());
    let numerator = 100 * similarity;
    let quotient = numerator / total;
    let remainder = numerator % total;
    let rounded = match (2 * remainder).cmp(&total) {
        Ordering::Greater => quotient + 1,
        Ordering::Equal if quotient % 2 == 1 => quotient + 1,
        _ => quotient,
    };
    rounded.min(100) as u8
}

/// Scores every record's search key against `query` and keeps the `limit`
/// best, highest first. Equal scores keep store order.
pub fn rank_candidates(query: &str, store: &RecordStore, limit: usize) -> Vec<ScreeningHit> {
    let mut hits = store
        .records()
        .iter()
        .enumerate()
        .map(|(position, record)| ScreeningHit {
            position,
            score: token_set_ratio(query, &record.search_key()),
            record: record.clone(),
        })
        .collect::<Vec<_>>();

    hits.sort_by(|left, right| right.score.cmp(&left.score));
    hits.truncate(limit);
    hits
}

pub fn screen(query: &str, store: &RecordStore) -> Vec<ScreeningHit> {
    rank_candidates(query, store, DEFAULT_CANDIDATE_LIMIT)
}
