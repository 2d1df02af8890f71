//! Urgency safety policy.
//!
//! Some source records over-state the urgency of chronic, manageable conditions. The policy
//! relaxes those by one clinical step at knowledge-base build time, under two rules that are
//! checked in this order:
//!
//! 1. a disease whose name contains a safety-exclusion keyword is never changed
//! 2. otherwise, a disease whose name contains a chronic keyword is relaxed per
//!    [`UrgencyPolicy::relaxed`]
//!
//! Keyword matching is a case-insensitive substring match on the disease name. The same
//! policy audits the live knowledge base so that a bad data file or a bad keyword edit
//! cannot downgrade an emergency-class disease unnoticed.

use crate::knowledge_base::DiseaseProfile;
use serde::Serialize;
use vet_types::{Species, Urgency};

/// Name fragments of chronic or manageable conditions that may be relaxed.
pub const STANDARD_CHRONIC_KEYWORDS: &[&str] = &[
    "allergy",
    "arthritis",
    "atopic",
    "cataract",
    "dermatitis",
    "hairball",
    "lipoma",
    "mange",
    "mites",
    "plucking",
    "ringworm",
];

/// Name fragments that forbid any urgency change. These win over the chronic list.
///
/// The qualifiers "acute", "emergency" and "severe" protect any disease they appear in,
/// chronic keyword or not.
pub const STANDARD_SAFETY_EXCLUSIONS: &[&str] = &[
    "acute",
    "emergency",
    "severe",
    "anaphyla",
    "asthma",
    "bloat",
    "cancer",
    "cardiomyopathy",
    "distemper",
    "dropsy",
    "egg binding",
    "epilepsy",
    "flystrike",
    "haemorrhag",
    "heartworm",
    "heatstroke",
    "hemorrhag",
    "influenza",
    "leptospirosis",
    "myxomatosis",
    "obstruction",
    "blockage",
    "pancreatitis",
    "panleukopenia",
    "parvo",
    "peritonitis",
    "poison",
    "pyometra",
    "rabies",
    "seizure",
    "stasis",
    "toxic",
    "tumor",
    "torsion",
    "tumour",
    "volvulus",
    "wet tail",
];

/// Why a profile failed the urgency audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// A safety-excluded disease carries a different urgency from its source record.
    ExcludedDiseaseChanged,
    /// A safety-excluded, emergency-class disease ended up routine-class.
    EmergencyClassDowngraded,
    /// The change from declared to effective urgency is not one relaxation step.
    UnexplainedChange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UrgencyViolation {
    pub species: Species,
    pub disease: String,
    pub declared: Urgency,
    pub effective: Urgency,
    pub kind: ViolationKind,
}

impl std::fmt::Display for UrgencyViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} / {}: declared {} but effective {} ({:?})",
            self.species, self.disease, self.declared, self.effective, self.kind
        )
    }
}

#[derive(Debug, Clone)]
pub struct UrgencyPolicy {
    chronic: Vec<String>,
    exclusions: Vec<String>,
}

impl Default for UrgencyPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

impl UrgencyPolicy {
    pub fn new<C, E>(chronic: C, exclusions: E) -> Self
    where
        C: IntoIterator,
        C::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        let fold = |k: &str| k.trim().to_lowercase();
        Self {
            chronic: chronic
                .into_iter()
                .map(|k| fold(k.as_ref()))
                .filter(|k| !k.is_empty())
                .collect(),
            exclusions: exclusions
                .into_iter()
                .map(|k| fold(k.as_ref()))
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    pub fn standard() -> Self {
        Self::new(STANDARD_CHRONIC_KEYWORDS, STANDARD_SAFETY_EXCLUSIONS)
    }

    pub fn is_safety_excluded(&self, disease: &str) -> bool {
        let folded = disease.to_lowercase();
        self.exclusions.iter().any(|k| folded.contains(k.as_str()))
    }

    pub fn is_chronic(&self, disease: &str) -> bool {
        let folded = disease.to_lowercase();
        self.chronic.iter().any(|k| folded.contains(k.as_str()))
    }

    /// One relaxation step. `emergency` and the routine classes are returned unchanged.
    pub fn relaxed(urgency: Urgency) -> Urgency {
        match urgency {
            Urgency::High => Urgency::Medium,
            Urgency::Severe => Urgency::Moderate,
            Urgency::Moderate => Urgency::Mild,
            other => other,
        }
    }

    /// Effective urgency for a disease given its declared urgency.
    pub fn apply(&self, disease: &str, declared: Urgency) -> Urgency {
        if self.is_safety_excluded(disease) {
            return declared;
        }
        if self.is_chronic(disease) {
            return Self::relaxed(declared);
        }
        declared
    }

    /// Check every profile against the safety invariant.
    pub fn audit<'a>(
        &self,
        profiles: impl IntoIterator<Item = &'a DiseaseProfile>,
    ) -> Vec<UrgencyViolation> {
        let mut violations = Vec::new();

        for profile in profiles {
            let declared = profile.declared_urgency;
            let effective = profile.urgency;
            if declared == effective {
                continue;
            }

            let violation = |kind| UrgencyViolation {
                species: profile.species,
                disease: profile.disease.to_string(),
                declared,
                effective,
                kind,
            };

            if self.is_safety_excluded(profile.disease.as_str()) {
                violations.push(violation(ViolationKind::ExcludedDiseaseChanged));
                if declared.is_emergency_class() && effective.is_routine_class() {
                    violations.push(violation(ViolationKind::EmergencyClassDowngraded));
                }
            }
            if effective != Self::relaxed(declared) {
                violations.push(violation(ViolationKind::UnexplainedChange));
            }
        }

        violations
    }
}
