//! Free-text locality resolution.
//!
//! A search term like "catamarca" can match several localities; resolution
//! never fails on ambiguity. Candidates are scored and the best guess is
//! returned along with ranked alternates, leaving the choice to the user.

use serde::Serialize;

use cartilla_core::regions::fold_key;

use crate::coord::{CoordSource, Coordinate};
use crate::GeoEntity;

/// A locality candidate under consideration for a free-text query.
///
/// `nearby_count` is how many directory entities sit within the query
/// radius of the candidate; `priority` is filled in by
/// [`rank_candidates`] and exists only during ranking.
#[derive(Debug, Clone, Serialize)]
pub struct SearchCandidate<T> {
    pub entity: T,
    pub coordinate: Option<Coordinate>,
    pub nearby_count: usize,
    pub priority: i64,
}

impl<T> SearchCandidate<T> {
    #[must_use]
    pub fn new(entity: T, coordinate: Option<Coordinate>, nearby_count: usize) -> Self {
        Self {
            entity,
            coordinate,
            nearby_count,
            priority: 0,
        }
    }
}

/// Outcome of ranking: the best guess plus the remaining candidates in
/// descending priority order.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedLocation<T> {
    pub best: SearchCandidate<T>,
    pub alternates: Vec<SearchCandidate<T>>,
}

/// Priority score for one candidate.
///
/// Name matching is case- and accent-insensitive: an exact match scores
/// 100, a prefix match 50, a substring match 25. On top of that, one point
/// per nearby directory entity (capped at 50) and 10 points when the
/// coordinates come from the trusted corrections table.
#[must_use]
pub fn score_candidate(query: &str, name: &str, nearby_count: usize, corrected: bool) -> i64 {
    let q = fold_key(query);
    let n = fold_key(name);
    let match_score = if n == q {
        100
    } else if n.starts_with(&q) {
        50
    } else if n.contains(&q) {
        25
    } else {
        0
    };
    let nearby_bonus = i64::try_from(nearby_count.min(50)).unwrap_or(50);
    let trusted_bonus = if corrected { 10 } else { 0 };
    match_score + nearby_bonus + trusted_bonus
}

/// Rank candidates for `query` and split off the best match.
///
/// Ties break by name ascending so resolution is deterministic. Returns
/// `None` only when there are no candidates at all.
#[must_use]
pub fn rank_candidates<T: GeoEntity>(
    query: &str,
    mut candidates: Vec<SearchCandidate<T>>,
) -> Option<ResolvedLocation<T>> {
    for candidate in &mut candidates {
        let corrected = candidate
            .coordinate
            .is_some_and(|c| c.source == CoordSource::Corrected);
        candidate.priority =
            score_candidate(query, candidate.entity.name(), candidate.nearby_count, corrected);
    }
    candidates.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| a.entity.name().cmp(b.entity.name()))
    });

    let mut iter = candidates.into_iter();
    let best = iter.next()?;
    Some(ResolvedLocation {
        best,
        alternates: iter.collect(),
    })
}
