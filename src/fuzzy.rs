use serde::{Deserialize, Serialize};

use crate::round_to;

pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.7;

const WINKLER_PREFIX_LIMIT: usize = 4;
const WINKLER_SCALE: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FuzzyMatch {
    pub score: f64,
    pub matched: bool,
}

impl FuzzyMatch {
    fn none() -> Self {
        Self {
            score: 0.0,
            matched: false,
        }
    }
}

pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();
    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let jaro = jaro(&a, &b);
    let prefix = a
        .iter()
        .zip(b.iter())
        .take_while(|(left, right)| left == right)
        .count()
        .min(WINKLER_PREFIX_LIMIT);
    jaro + prefix as f64 * WINKLER_SCALE * (1.0 - jaro)
}

fn jaro(a: &[char], b: &[char]) -> f64 {
    let window = (a.len().max(b.len()) / 2).saturating_sub(1);
    let mut a_matched = vec![false; a.len()];
    let mut b_matched = vec![false; b.len()];
    let mut matches = 0usize;

    for (i, ch) in a.iter().enumerate() {
        let start = i.saturating_sub(window);
        let end = (i + window + 1).min(b.len());
        for j in start..end {
            if b_matched[j] || b[j] != *ch {
                continue;
            }
            a_matched[i] = true;
            b_matched[j] = true;
            matches += 1;
            break;
        }
    }

    if matches == 0 {
        return 0.0;
    }

    let mut transpositions = 0usize;
    let mut k = 0usize;
    for (i, ch) in a.iter().enumerate() {
        if !a_matched[i] {
            continue;
        }
        while !b_matched[k] {
            k += 1;
        }
        if *ch != b[k] {
            transpositions += 1;
        }
        k += 1;
    }

    let m = matches as f64;
    let t = transpositions as f64 / 2.0;
    (m / a.len() as f64 + m / b.len() as f64 + (m - t) / m) / 3.0
}

/// Best similarity between `target` and any run of roughly as many words in `content`.
///
/// A literal case-insensitive substring hit short-circuits to a perfect score. Otherwise
/// windows of `n - 1`, `n` and `n + 1` words are slid across the content, where `n` is
/// the target's word count; one-word windows cover single-word targets word by word.
pub fn best_fuzzy_match(target: &str, content: &str, threshold: f64) -> FuzzyMatch {
    let target_lower = target.trim().to_lowercase();
    if target_lower.is_empty() || content.trim().is_empty() {
        return FuzzyMatch::none();
    }
    if content.to_lowercase().contains(&target_lower) {
        return FuzzyMatch {
            score: 1.0,
            matched: true,
        };
    }

    let target_tokens = tokenize(&target_lower);
    let content_tokens = tokenize(content);
    if target_tokens.is_empty() || content_tokens.is_empty() {
        return FuzzyMatch::none();
    }
    let target_phrase = target_tokens.join(" ");
    let word_count = target_tokens.len();

    let mut best = 0.0f64;
    let smallest = word_count.saturating_sub(1).max(1);
    for size in smallest..=word_count + 1 {
        for window in content_tokens.windows(size) {
            best = best.max(similarity(&target_phrase, &window.join(" ")));
        }
    }
    if content_tokens.len() < smallest {
        best = best.max(similarity(&target_phrase, &content_tokens.join(" ")));
    }

    let score = round_to(best, 3);
    FuzzyMatch {
        score,
        matched: score >= threshold,
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|word| {
            word.trim_matches(|ch: char| !ch.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|word| !word.is_empty())
        .collect()
}
