//! Link relevance scoring.
//!
//! A link is relevant when the query appears verbatim (case-insensitive) in
//! its URL or anchor text, or when its anchor text is fuzzily similar to the
//! query. Fuzzy similarity is a partial ratio: the shorter string is compared
//! against every equal-length window of the longer one and the best
//! [`similar`] diff ratio wins, scaled to `[0, 100]`.

use similar::TextDiff;

use crate::types::MatchReason;

/// Default minimum fuzzy score for a link to count as relevant.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 60.0;

/// Longest text considered for fuzzy comparison; longer anchors are cut.
const MAX_FUZZY_CHARS: usize = 256;

/// Edit-based similarity of two strings in `[0, 100]`.
///
/// Two empty strings are identical (100).
pub fn ratio(a: &str, b: &str) -> f64 {
    let diff = TextDiff::from_chars(a, b);
    f64::from(diff.ratio()) * 100.0
}

/// Best [`ratio`] between the shorter string and any same-length window of
/// the longer one, case-insensitive.
///
/// Returns 0 when either side is blank.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let a: String = a.trim().to_lowercase().chars().take(MAX_FUZZY_CHARS).collect();
    let b: String = b.trim().to_lowercase().chars().take(MAX_FUZZY_CHARS).collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let (short, long) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    let long: Vec<char> = long.chars().collect();
    let width = short.chars().count();

    let mut best = 0.0_f64;
    for window in long.windows(width) {
        let candidate: String = window.iter().collect();
        best = best.max(ratio(&short, &candidate));
        if best >= 100.0 {
            break;
        }
    }
    best
}

/// Classify a fuzzy score against `threshold`.
pub fn classify_score(score: f64, threshold: f64) -> Option<MatchReason> {
    (score >= threshold).then_some(MatchReason::FuzzyMatch)
}

/// Decide whether a link is relevant to `query`.
///
/// Returns the match reason and similarity score, or `None` if the link
/// matches neither rule. Exact substring matches score 100. The href is
/// also compared in percent-decoded form, so non-ASCII names match.
pub fn score_link(
    query: &str,
    href: &str,
    anchor_text: &str,
    threshold: f64,
) -> Option<(MatchReason, f64)> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }

    let in_href = href.to_lowercase().contains(&needle)
        || urlencoding::decode(href)
            .is_ok_and(|decoded| decoded.to_lowercase().contains(&needle));
    if in_href || anchor_text.to_lowercase().contains(&needle) {
        return Some((MatchReason::ExactSubstring, 100.0));
    }

    let score = partial_ratio(&needle, anchor_text);
    classify_score(score, threshold).map(|reason| (reason, score))
}
