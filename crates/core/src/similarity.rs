//! Pluggable semantic similarity backends.
//!
//! A backend compares the owner's free text with the plain-language rendering of a disease
//! profile and returns a similarity in `[0, 1]`. Backends may be slow or unavailable; the
//! engine bounds every batch with a timeout and falls back to structured-only scoring.

use crate::knowledge_base::DiseaseProfile;
use std::collections::BTreeSet;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum SimilarityError {
    #[error("similarity backend timed out after {0:?}")]
    Timeout(Duration),
    #[error("similarity backend is unavailable")]
    Unavailable,
    #[error("similarity backend error: {0}")]
    Backend(String),
}

pub trait SimilarityBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_available(&self) -> bool {
        true
    }

    /// Similarity between `text` and `profile`, in `[0, 1]`.
    fn similarity(&self, text: &str, profile: &DiseaseProfile) -> Result<f64, SimilarityError>;
}

/// Backend used when semantic scoring is switched off.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSimilarity;

impl SimilarityBackend for NullSimilarity {
    fn name(&self) -> &'static str {
        "none"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn similarity(&self, _text: &str, _profile: &DiseaseProfile) -> Result<f64, SimilarityError> {
        Err(SimilarityError::Unavailable)
    }
}

/// Jaccard similarity over lower-cased word sets.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenOverlapSimilarity;

fn words(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 1)
        .map(str::to_lowercase)
        .collect()
}

impl SimilarityBackend for TokenOverlapSimilarity {
    fn name(&self) -> &'static str {
        "token-overlap"
    }

    fn similarity(&self, text: &str, profile: &DiseaseProfile) -> Result<f64, SimilarityError> {
        let query = words(text);
        let target = words(&profile.describe());
        if query.is_empty() || target.is_empty() {
            return Ok(0.0);
        }
        let shared = query.intersection(&target).count() as f64;
        let union = query.union(&target).count() as f64;
        Ok(shared / union)
    }
}
