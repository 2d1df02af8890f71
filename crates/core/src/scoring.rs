//! Structured match scoring.
//!
//! For a disease profile `d` and a canonical symptom set `s`:
//!
//! - `matched = d.symptoms ∩ s`
//! - `match_score = 100 * |matched| / |d.symptoms|`
//! - `user_coverage = 100 * |matched| / |s|`
//!
//! Profiles with no matched symptom are left out. Results come back in profile order; the
//! ranker owns ordering.

use crate::knowledge_base::DiseaseProfile;
use serde::Serialize;
use std::collections::BTreeSet;
use vet_types::{DiseaseName, Urgency};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// One candidate disease for a symptom report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisResult {
    pub disease: DiseaseName,
    /// 0–100.
    pub match_score: f64,
    /// Sorted ascending.
    pub matched_symptoms: Vec<String>,
    /// 0–100.
    pub user_coverage: f64,
    pub urgency: Urgency,
    pub contagious: bool,
}

/// Score one profile. `None` when nothing overlaps.
pub fn score_profile(profile: &DiseaseProfile, symptoms: &BTreeSet<String>) -> Option<DiagnosisResult> {
    if profile.symptoms.is_empty() || symptoms.is_empty() {
        return None;
    }

    let matched: Vec<String> = profile.symptoms.intersection(symptoms).cloned().collect();
    if matched.is_empty() {
        return None;
    }

    let hits = matched.len() as f64;
    Some(DiagnosisResult {
        disease: profile.disease.clone(),
        match_score: 100.0 * hits / profile.symptoms.len() as f64,
        matched_symptoms: matched,
        user_coverage: 100.0 * hits / symptoms.len() as f64,
        urgency: profile.urgency,
        contagious: profile.contagious,
    })
}

/// Score every profile against `symptoms`.
#[cfg(not(feature = "parallel"))]
pub fn score(profiles: &[DiseaseProfile], symptoms: &BTreeSet<String>) -> Vec<DiagnosisResult> {
    profiles
        .iter()
        .filter_map(|profile| score_profile(profile, symptoms))
        .collect()
}

/// Score every profile against `symptoms`, fanning out across the rayon pool.
#[cfg(feature = "parallel")]
pub fn score(profiles: &[DiseaseProfile], symptoms: &BTreeSet<String>) -> Vec<DiagnosisResult> {
    profiles
        .par_iter()
        .filter_map(|profile| score_profile(profile, symptoms))
        .collect()
}

/// Blend a structured score (0–100) with a semantic similarity (0–1).
///
/// `weight` is expected in `[0, 0.5)`; the semantic value is clamped to `[0, 1]`.
pub fn blend(structured: f64, semantic: f64, weight: f64) -> f64 {
    let semantic = semantic.clamp(0.0, 1.0);
    (1.0 - weight) * structured + weight * 100.0 * semantic
}
