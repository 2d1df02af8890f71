//! Disease knowledge base.
//!
//! The knowledge base is a species-partitioned collection of [`DiseaseProfile`]s built once
//! from `knowledge_base.yaml` and never mutated afterwards. Building it:
//!
//! - normalizes each record's symptom list through the [`Normalizer`]
//! - applies the [`UrgencyPolicy`] to the declared urgency
//! - skips (and reports) records that are malformed or resolve to no canonical symptom
//!
//! Problems with individual records never fail the load. An unreadable file, a document
//! that is not a sequence of records, or a file with no usable record at all does.

use crate::normalizer::Normalizer;
use crate::urgency::UrgencyPolicy;
use crate::{EngineError, EngineResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::path::Path;
use vet_types::{DiseaseName, Species, Urgency};

/// One disease as seen by the matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiseaseProfile {
    pub disease: DiseaseName,
    pub species: Species,
    /// Canonical symptom keys. Never empty for a profile built by the loader.
    pub symptoms: BTreeSet<String>,
    /// Urgency after the urgency policy ran.
    pub urgency: Urgency,
    /// Urgency as written in the source record.
    pub declared_urgency: Urgency,
    pub contagious: bool,
    pub source_tag: String,
}

impl DiseaseProfile {
    /// Plain-language rendering used by semantic similarity backends, e.g.
    /// `"Canine parvovirus in dogs: bloody diarrhea, lethargy, vomiting"`.
    pub fn describe(&self) -> String {
        let symptoms: Vec<String> = self.symptoms.iter().map(|k| k.replace('_', " ")).collect();
        format!(
            "{} in {}: {}",
            self.disease,
            self.species.plural(),
            symptoms.join(", ")
        )
    }
}

/// Wire model for one knowledge base record.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RecordWire {
    species: String,
    disease: String,
    symptoms: String,
    urgency: String,
    contagious: FlagWire,
    source: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FlagWire {
    Bool(bool),
    Text(String),
}

impl FlagWire {
    fn parse(&self) -> Option<bool> {
        match self {
            FlagWire::Bool(value) => Some(*value),
            FlagWire::Text(text) => match text.trim().to_lowercase().as_str() {
                "yes" | "y" | "true" => Some(true),
                "no" | "n" | "false" => Some(false),
                _ => None,
            },
        }
    }
}

/// Why a record was left out of the knowledge base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    UnknownSpecies(String),
    BlankDisease,
    UnknownUrgency(String),
    InvalidContagious(String),
    Duplicate,
    NoCanonicalSymptoms,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnknownSpecies(value) => write!(f, "unknown species '{value}'"),
            SkipReason::BlankDisease => f.write_str("disease name is blank"),
            SkipReason::UnknownUrgency(value) => write!(f, "unknown urgency '{value}'"),
            SkipReason::InvalidContagious(value) => {
                write!(f, "contagious must be yes or no, got '{value}'")
            }
            SkipReason::Duplicate => f.write_str("duplicate of an earlier record"),
            SkipReason::NoCanonicalSymptoms => {
                f.write_str("no symptom resolved to a canonical key")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRecord {
    /// Zero-based position of the record in the source sequence.
    pub index: usize,
    pub disease: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmappedToken {
    pub species: Species,
    pub disease: String,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelaxedUrgency {
    pub species: Species,
    pub disease: String,
    pub from: Urgency,
    pub to: Urgency,
}

/// Profiles in one species whose canonical symptom sets are identical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndistinguishableGroup {
    pub species: Species,
    pub diseases: Vec<String>,
}

/// Summary of one knowledge base load.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    pub accepted: usize,
    pub skipped: Vec<SkippedRecord>,
    pub unmapped_tokens: Vec<UnmappedToken>,
    pub relaxed: Vec<RelaxedUrgency>,
    pub indistinguishable: Vec<IndistinguishableGroup>,
    /// SHA-256 of the source bytes, lower-case hex.
    pub fingerprint: String,
    pub loaded_at: DateTime<Utc>,
}

/// Species-partitioned, read-only disease index.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    by_species: HashMap<Species, Vec<DiseaseProfile>>,
}

impl KnowledgeBase {
    /// Build the knowledge base from YAML text.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::KnowledgeBaseLoad` if the text is not a sequence of records
    /// matching the wire schema, or if no record survives validation.
    pub fn build(
        yaml_text: &str,
        normalizer: &Normalizer,
        policy: &UrgencyPolicy,
    ) -> EngineResult<(Self, LoadReport)> {
        let fingerprint = hex::encode(Sha256::digest(yaml_text.as_bytes()));

        let deserializer = serde_yaml::Deserializer::from_str(yaml_text);
        let records: Vec<RecordWire> = match serde_path_to_error::deserialize(deserializer) {
            Ok(parsed) => parsed,
            Err(err) => {
                let path = err.path().to_string();
                let source = err.into_inner();
                let path = if path.is_empty() {
                    "<root>"
                } else {
                    path.as_str()
                };
                return Err(EngineError::KnowledgeBaseLoad(format!(
                    "schema mismatch at {path}: {source}"
                )));
            }
        };

        let mut by_species: HashMap<Species, Vec<DiseaseProfile>> = HashMap::new();
        let mut seen: HashSet<(Species, String)> = HashSet::new();
        let mut skipped = Vec::new();
        let mut unmapped_tokens = Vec::new();
        let mut relaxed = Vec::new();

        for (index, record) in records.into_iter().enumerate() {
            let mut skip = |reason: SkipReason| {
                tracing::warn!(index, disease = %record.disease, %reason, "skipping knowledge base record");
                skipped.push(SkippedRecord {
                    index,
                    disease: record.disease.trim().to_string(),
                    reason,
                });
            };

            let Ok(species) = record.species.parse::<Species>() else {
                skip(SkipReason::UnknownSpecies(record.species.trim().to_string()));
                continue;
            };
            let Ok(disease) = DiseaseName::new(&record.disease) else {
                skip(SkipReason::BlankDisease);
                continue;
            };
            let Ok(declared_urgency) = record.urgency.parse::<Urgency>() else {
                skip(SkipReason::UnknownUrgency(record.urgency.trim().to_string()));
                continue;
            };
            let Some(contagious) = record.contagious.parse() else {
                let raw = match &record.contagious {
                    FlagWire::Text(text) => text.trim().to_string(),
                    FlagWire::Bool(value) => value.to_string(),
                };
                skip(SkipReason::InvalidContagious(raw));
                continue;
            };
            if seen.contains(&(species, disease.folded().to_string())) {
                skip(SkipReason::Duplicate);
                continue;
            }

            let normalized = normalizer.normalize(record.symptoms.split(','));
            for token in &normalized.unmapped {
                tracing::warn!(%species, %disease, token = %token, "knowledge base symptom did not normalize");
                unmapped_tokens.push(UnmappedToken {
                    species,
                    disease: disease.to_string(),
                    token: token.clone(),
                });
            }
            if normalized.canonical.is_empty() {
                skip(SkipReason::NoCanonicalSymptoms);
                continue;
            }

            let urgency = policy.apply(disease.as_str(), declared_urgency);
            if urgency != declared_urgency {
                tracing::debug!(%species, %disease, from = %declared_urgency, to = %urgency, "relaxed urgency");
                relaxed.push(RelaxedUrgency {
                    species,
                    disease: disease.to_string(),
                    from: declared_urgency,
                    to: urgency,
                });
            }

            seen.insert((species, disease.folded().to_string()));
            by_species.entry(species).or_default().push(DiseaseProfile {
                disease,
                species,
                symptoms: normalized.canonical,
                urgency,
                declared_urgency,
                contagious,
                source_tag: record.source.trim().to_string(),
            });
        }

        let knowledge_base = Self { by_species };
        if knowledge_base.is_empty() {
            return Err(EngineError::KnowledgeBaseLoad(format!(
                "no usable records ({} skipped)",
                skipped.len()
            )));
        }

        let report = LoadReport {
            accepted: knowledge_base.len(),
            skipped,
            unmapped_tokens,
            relaxed,
            indistinguishable: knowledge_base.indistinguishable_groups(),
            fingerprint,
            loaded_at: Utc::now(),
        };

        tracing::info!(
            accepted = report.accepted,
            skipped = report.skipped.len(),
            relaxed = report.relaxed.len(),
            fingerprint = %report.fingerprint,
            "loaded knowledge base"
        );

        Ok((knowledge_base, report))
    }

    /// Read and build the knowledge base file at `path`.
    pub fn load(
        path: &Path,
        normalizer: &Normalizer,
        policy: &UrgencyPolicy,
    ) -> EngineResult<(Self, LoadReport)> {
        let text = std::fs::read_to_string(path).map_err(|source| EngineError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::build(&text, normalizer, policy)
    }

    /// Assemble a knowledge base from ready-made profiles, keeping the first of any
    /// duplicate `(species, disease)` pair.
    pub fn from_profiles(profiles: impl IntoIterator<Item = DiseaseProfile>) -> Self {
        let mut by_species: HashMap<Species, Vec<DiseaseProfile>> = HashMap::new();
        let mut seen: HashSet<(Species, String)> = HashSet::new();
        for profile in profiles {
            if seen.insert((profile.species, profile.disease.folded().to_string())) {
                by_species.entry(profile.species).or_default().push(profile);
            }
        }
        Self { by_species }
    }

    /// Profiles for `species` in source order. Empty when the species has no entries.
    pub fn diseases_for_species(&self, species: Species) -> &[DiseaseProfile] {
        self.by_species
            .get(&species)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Species with at least one profile, in enumeration order.
    pub fn species(&self) -> Vec<Species> {
        Species::ALL
            .iter()
            .copied()
            .filter(|s| !self.diseases_for_species(*s).is_empty())
            .collect()
    }

    /// Case-insensitive lookup of a disease within one species.
    pub fn find(&self, species: Species, disease: &str) -> Option<&DiseaseProfile> {
        let folded = disease.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        self.diseases_for_species(species)
            .iter()
            .find(|p| p.disease.folded() == folded)
    }

    /// Every profile, grouped by species in enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = &DiseaseProfile> {
        Species::ALL
            .iter()
            .flat_map(move |s| self.diseases_for_species(*s).iter())
    }

    pub fn len(&self) -> usize {
        self.by_species.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn indistinguishable_groups(&self) -> Vec<IndistinguishableGroup> {
        let mut groups = Vec::new();
        for species in Species::ALL.iter().copied() {
            let mut by_symptoms: BTreeMap<&BTreeSet<String>, Vec<String>> = BTreeMap::new();
            for profile in self.diseases_for_species(species) {
                by_symptoms
                    .entry(&profile.symptoms)
                    .or_default()
                    .push(profile.disease.to_string());
            }
            for diseases in by_symptoms.into_values() {
                if diseases.len() > 1 {
                    tracing::warn!(%species, ?diseases, "profiles share an identical symptom set");
                    groups.push(IndistinguishableGroup { species, diseases });
                }
            }
        }
        groups
    }
}
