//! Candidate deduplication by normalised URL.
//!
//! [`CandidateSet`] keeps candidates in discovery order and rejects any
//! candidate whose normalised URL has already been seen, so the first
//! provider to surface a page wins.

use std::collections::HashSet;

use crate::types::CandidateUrl;

use super::url_normalize::normalize_url;

/// Insertion-ordered set of candidates keyed by normalised URL.
#[derive(Debug, Default)]
pub struct CandidateSet {
    seen: HashSet<String>,
    ordered: Vec<CandidateUrl>,
}

impl CandidateSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `candidate` unless its normalised URL is already present.
    ///
    /// Returns `true` if the candidate was new.
    pub fn insert(&mut self, mut candidate: CandidateUrl) -> bool {
        candidate.url = normalize_url(&candidate.url);
        if !self.seen.insert(candidate.url.clone()) {
            return false;
        }
        self.ordered.push(candidate);
        true
    }

    /// Insert every candidate in order, stopping once `limit` is reached.
    ///
    /// Returns how many new candidates were added.
    pub fn extend_until(
        &mut self,
        candidates: impl IntoIterator<Item = CandidateUrl>,
        limit: usize,
    ) -> usize {
        let mut added = 0;
        for candidate in candidates {
            if self.len() >= limit {
                break;
            }
            if self.insert(candidate) {
                added += 1;
            }
        }
        added
    }

    /// Number of distinct candidates.
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    /// Whether no candidate has been added.
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Finalise into at most `limit` candidates in discovery order.
    pub fn into_truncated(mut self, limit: usize) -> Vec<CandidateUrl> {
        self.ordered.truncate(limit);
        self.ordered
    }
}
