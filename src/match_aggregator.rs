//! Match Aggregation for Face-Identity Search
//!
//! This module turns the raw, unranked candidate list returned by the vector
//! store into the final deduplicated, thresholded, ranked set of identity
//! matches. It is the pure core of the search path: no I/O, no suspension
//! points, total over any input list.
//!
//! ## Algorithm
//!
//! 1. Scan the candidates once, skipping any whose distance exceeds the
//!    optional threshold.
//! 2. Keep the best (lowest-distance) candidate per identity. Replacement is
//!    *strictly* less-than, so on an exact distance tie the first-encountered
//!    candidate wins.
//! 3. Derive `confidence = (1 - distance) * 100` for each survivor. The
//!    value is intentionally not clamped to [0, 100]; distance metrics that
//!    exceed 1 or go negative produce out-of-range confidences, and that
//!    observed behavior is preserved rather than corrected.
//! 4. Stable-sort ascending by distance and truncate to `top_k`, preserving
//!    first-seen order among equal distances.
//!
//! ## Guarantees
//!
//! - `matches.len() <= top_k`
//! - no two matches share an identity
//! - `matches` is sorted non-decreasing by distance
//! - with a threshold `t`, every match satisfies `distance <= t`
//! - `top_match` is exactly `matches[0]` (or absent), `found == !matches.is_empty()`

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::types::{Candidate, FaceMatch, SearchResult};

/// Core aggregation algorithms for face-identity search results
pub struct MatchAggregator;

impl MatchAggregator {
    /// Aggregate raw candidates into a ranked search result
    ///
    /// Pure and total: empty candidate lists and lists containing only
    /// above-threshold candidates both produce the "not found" result with
    /// `faces_detected = 1` (a face was processed, it just matched nothing).
    /// The upstream no-face short-circuit is `SearchResult::no_face()` and
    /// never reaches this function.
    ///
    /// # Arguments
    ///
    /// * `candidates` - raw, unranked records from the vector store
    /// * `top_k` - maximum number of distinct identities to return (>= 1)
    /// * `threshold` - optional distance cutoff; candidates above it are
    ///   discarded before deduplication
    pub fn aggregate(
        candidates: &[Candidate],
        top_k: usize,
        threshold: Option<f32>,
    ) -> SearchResult {
        // Per-identity best, kept in first-seen order so the later stable
        // sort breaks exact-distance ties deterministically.
        let mut bests: Vec<Candidate> = Vec::new();
        let mut index_by_identity: HashMap<&str, usize> = HashMap::new();

        for candidate in candidates {
            if let Some(t) = threshold {
                if candidate.distance > t {
                    continue;
                }
            }

            match index_by_identity.get(candidate.identity.as_str()) {
                Some(&i) => {
                    // Strictly less-than: an exact tie keeps the earlier one
                    if candidate.distance < bests[i].distance {
                        bests[i].distance = candidate.distance;
                    }
                }
                None => {
                    index_by_identity.insert(candidate.identity.as_str(), bests.len());
                    bests.push(candidate.clone());
                }
            }
        }
        drop(index_by_identity);

        let mut matches: Vec<FaceMatch> =
            bests.into_iter().map(FaceMatch::from_candidate).collect();

        // sort_by is stable, so equal distances stay in first-seen order
        matches.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(Ordering::Equal)
        });
        matches.truncate(top_k);

        SearchResult {
            found: !matches.is_empty(),
            top_match: matches.first().cloned(),
            matches,
            search_time_ms: 0,
            faces_detected: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(raw: &[(&str, f32)]) -> Vec<Candidate> {
        raw.iter()
            .map(|(name, distance)| Candidate::new(*name, *distance))
            .collect()
    }

    #[test]
    fn test_dedup_and_ranking() {
        // [{A,0.1},{B,0.3},{A,0.05}], topK=2, no threshold
        // => [{A,0.05,95.0},{B,0.3,70.0}]
        let input = candidates(&[("A", 0.1), ("B", 0.3), ("A", 0.05)]);
        let result = MatchAggregator::aggregate(&input, 2, None);

        assert!(result.found);
        assert_eq!(result.faces_detected, 1);
        assert_eq!(result.matches.len(), 2);

        assert_eq!(result.matches[0].identity, "A");
        assert!((result.matches[0].distance - 0.05).abs() < 1e-6);
        assert!((result.matches[0].confidence - 95.0).abs() < 1e-4);

        assert_eq!(result.matches[1].identity, "B");
        assert!((result.matches[1].distance - 0.3).abs() < 1e-6);
        assert!((result.matches[1].confidence - 70.0).abs() < 1e-4);

        assert_eq!(result.top_match, Some(result.matches[0].clone()));
    }

    #[test]
    fn test_all_candidates_above_threshold() {
        // [{A,0.5}], threshold=0.4 => matches=[], found=false
        let input = candidates(&[("A", 0.5)]);
        let result = MatchAggregator::aggregate(&input, 3, Some(0.4));

        assert!(!result.found);
        assert!(result.top_match.is_none());
        assert!(result.matches.is_empty());
        assert_eq!(result.faces_detected, 1);
    }

    #[test]
    fn test_empty_candidate_list() {
        let result = MatchAggregator::aggregate(&[], 3, None);

        assert!(!result.found);
        assert!(result.top_match.is_none());
        assert!(result.matches.is_empty());
        // A face WAS processed; it just matched nothing
        assert_eq!(result.faces_detected, 1);
    }

    #[test]
    fn test_no_duplicate_identities() {
        let input = candidates(&[
            ("A", 0.3),
            ("B", 0.2),
            ("A", 0.1),
            ("B", 0.25),
            ("A", 0.15),
        ]);
        let result = MatchAggregator::aggregate(&input, 10, None);

        let mut identities: Vec<&str> = result
            .matches
            .iter()
            .map(|m| m.identity.as_str())
            .collect();
        identities.sort();
        identities.dedup();
        assert_eq!(identities.len(), result.matches.len());
        assert_eq!(result.matches.len(), 2);
    }

    #[test]
    fn test_sorted_ascending_by_distance() {
        let input = candidates(&[("C", 0.4), ("A", 0.1), ("B", 0.25), ("D", 0.05)]);
        let result = MatchAggregator::aggregate(&input, 10, None);

        for pair in result.matches.windows(2) {
            assert!(pair[0].distance <= pair[1].distance);
        }
        assert_eq!(result.matches[0].identity, "D");
    }

    #[test]
    fn test_truncates_to_top_k() {
        let input = candidates(&[("A", 0.1), ("B", 0.2), ("C", 0.3), ("D", 0.4)]);

        for k in 1..=4 {
            let result = MatchAggregator::aggregate(&input, k, None);
            assert_eq!(result.matches.len(), k);
        }

        // top_k beyond the distinct-identity count returns them all
        let result = MatchAggregator::aggregate(&input, 100, None);
        assert_eq!(result.matches.len(), 4);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        // distance <= threshold survives; strictly greater is discarded
        let input = candidates(&[("A", 0.4), ("B", 0.40001)]);
        let result = MatchAggregator::aggregate(&input, 10, Some(0.4));

        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.matches[0].identity, "A");
    }

    #[test]
    fn test_exact_tie_keeps_first_seen() {
        // Same identity, identical distance: replacement is strictly-less,
        // so the first-encountered candidate wins.
        let input = candidates(&[("A", 0.2), ("A", 0.2)]);
        let result = MatchAggregator::aggregate(&input, 1, None);
        assert_eq!(result.matches.len(), 1);
        assert!((result.matches[0].distance - 0.2).abs() < 1e-6);

        // Distinct identities tied on distance keep scan order after the
        // stable sort.
        let input = candidates(&[("B", 0.2), ("A", 0.2)]);
        let result = MatchAggregator::aggregate(&input, 2, None);
        assert_eq!(result.matches[0].identity, "B");
        assert_eq!(result.matches[1].identity, "A");
    }

    #[test]
    fn test_confidence_derivation() {
        let input = candidates(&[("A", 0.25)]);
        let result = MatchAggregator::aggregate(&input, 1, None);
        assert!((result.matches[0].confidence - 75.0).abs() < 1e-4);
    }

    #[test]
    fn test_confidence_unclamped_boundary_characterization() {
        // Characterization, not a bug fix: the confidence formula is applied
        // as observed, so distances outside [0, 1] leave the percentage
        // range. Distance 1.5 => confidence -50; distance -0.1 => 110.
        let input = candidates(&[("far", 1.5), ("negative", -0.1)]);
        let result = MatchAggregator::aggregate(&input, 2, None);

        assert_eq!(result.matches[0].identity, "negative");
        assert!((result.matches[0].confidence - 110.0).abs() < 1e-4);
        assert_eq!(result.matches[1].identity, "far");
        assert!((result.matches[1].confidence - (-50.0)).abs() < 1e-4);
    }

    #[test]
    fn test_top_match_is_first_match() {
        let input = candidates(&[("B", 0.3), ("A", 0.1)]);
        let result = MatchAggregator::aggregate(&input, 2, None);
        assert_eq!(result.top_match.as_ref(), result.matches.first());

        let empty = MatchAggregator::aggregate(&[], 2, None);
        assert_eq!(empty.top_match, None);
    }

    #[test]
    fn test_dedup_happens_after_threshold_filter() {
        // A's only below-threshold record is 0.35; the better 0.05 record is
        // hypothetical here with distance above threshold and must not leak
        // through the per-identity map.
        let input = candidates(&[("A", 0.9), ("A", 0.35)]);
        let result = MatchAggregator::aggregate(&input, 1, Some(0.4));

        assert_eq!(result.matches.len(), 1);
        assert!((result.matches[0].distance - 0.35).abs() < 1e-6);
    }
}
