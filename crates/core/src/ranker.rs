//! Differential ranking.
//!
//! Results are ordered by `match_score` descending, then `user_coverage` descending, then
//! disease name ascending (case-insensitive first, byte-wise second). After sorting, only
//! the best-ranked result per disease name survives, and the list is cut to `top_n`.

use crate::scoring::DiagnosisResult;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Total order used for ranking. `Less` means `a` ranks above `b`.
pub fn compare(a: &DiagnosisResult, b: &DiagnosisResult) -> Ordering {
    b.match_score
        .total_cmp(&a.match_score)
        .then_with(|| b.user_coverage.total_cmp(&a.user_coverage))
        .then_with(|| a.disease.cmp_for_ranking(&b.disease))
}

/// Sort, deduplicate by disease name and truncate to `top_n`.
pub fn rank(mut results: Vec<DiagnosisResult>, top_n: usize) -> Vec<DiagnosisResult> {
    results.sort_by(compare);

    let mut seen = HashSet::new();
    results.retain(|r| seen.insert(r.disease.folded().to_string()));
    results.truncate(top_n);
    results
}
