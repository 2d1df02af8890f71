//! # Matching engine
//!
//! [`Engine`] is the immutable query context: vocabulary, normalizer and the urgency-checked
//! knowledge base, built once and shared by reference or `Arc`. Every query is a pure
//! pipeline over that context:
//!
//! raw symptoms → normalizer → (species, canonical set) → species filter → scoring → ranker
//!
//! The optional semantic path is the only part that may block on outside work. It runs the
//! backend on the blocking pool under a timeout and falls back to structured-only scoring on
//! timeout or error, so a slow backend never fails a query.

use crate::config::{validate_top_n, EngineConfig};
use crate::constants::{DEFAULT_QUESTION_LIMIT, RED_FLAG_SEVERITY};
use crate::knowledge_base::{DiseaseProfile, KnowledgeBase, LoadReport};
use crate::normalizer::{AliasTable, NormalizedSymptoms, Normalizer};
use crate::similarity::{NullSimilarity, SimilarityBackend, SimilarityError};
use crate::urgency::{UrgencyPolicy, UrgencyViolation};
use crate::vocabulary::Vocabulary;
use crate::{ranker, scoring, EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use vet_types::Species;

/// Query input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymptomReport {
    pub species: String,
    pub raw_symptoms: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_text: Option<String>,
}

impl SymptomReport {
    pub fn new<S: Into<String>>(species: impl Into<String>, symptoms: impl IntoIterator<Item = S>) -> Self {
        Self {
            species: species.into(),
            raw_symptoms: symptoms.into_iter().map(Into::into).collect(),
            free_text: None,
        }
    }

    pub fn with_free_text(mut self, text: impl Into<String>) -> Self {
        self.free_text = Some(text.into());
        self
    }
}

/// A reported token that did not resolve to any canonical symptom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnmappedSymptomWarning {
    pub token: String,
}

impl fmt::Display for UnmappedSymptomWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "symptom '{}' was not recognised", self.token)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    Structured,
    Blended,
}

/// Query output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisReport {
    pub species: Species,
    pub top_matches: Vec<scoring::DiagnosisResult>,
    pub canonical_symptoms: Vec<String>,
    pub warnings: Vec<UnmappedSymptomWarning>,
    /// Reported symptoms with the highest vocabulary severity weight.
    pub red_flags: Vec<String>,
    pub scoring_mode: ScoringMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpQuestion {
    pub symptom: String,
    pub question: String,
    pub severity_weight: u8,
    /// How many of the top matches list this symptom.
    pub supporting_matches: usize,
}

/// Raw text of the three reference data files.
#[derive(Debug, Clone, Copy)]
pub struct EngineSources<'a> {
    pub vocabulary: &'a str,
    pub aliases: &'a str,
    pub knowledge_base: &'a str,
}

struct PreparedQuery {
    species: Species,
    normalized: NormalizedSymptoms,
    top_n: usize,
}

pub struct Engine {
    config: EngineConfig,
    normalizer: Normalizer,
    knowledge_base: KnowledgeBase,
    load_report: LoadReport,
    similarity: Arc<dyn SimilarityBackend>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("data_dir", &self.config.data_dir())
            .field("vocabulary", &self.normalizer.vocabulary().len())
            .field("aliases", &self.normalizer.aliases().len())
            .field("profiles", &self.knowledge_base.len())
            .field("fingerprint", &self.load_report.fingerprint)
            .field("similarity", &self.similarity.name())
            .finish()
    }
}

impl Engine {
    /// Load the reference data files named by `config`.
    ///
    /// # Errors
    ///
    /// Returns any load error from the vocabulary, alias table or knowledge base, or
    /// `EngineError::UrgencySafetyViolation` if the built knowledge base fails the audit.
    pub fn load(config: EngineConfig) -> EngineResult<Self> {
        let read = |path: std::path::PathBuf| {
            std::fs::read_to_string(&path).map_err(|source| EngineError::FileRead { path, source })
        };
        let vocabulary = read(config.vocabulary_path())?;
        let aliases = read(config.aliases_path())?;
        let knowledge_base = read(config.knowledge_base_path())?;

        Self::from_sources(
            config,
            EngineSources {
                vocabulary: &vocabulary,
                aliases: &aliases,
                knowledge_base: &knowledge_base,
            },
        )
    }

    /// Build the engine from in-memory data with the standard urgency policy.
    pub fn from_sources(config: EngineConfig, sources: EngineSources<'_>) -> EngineResult<Self> {
        Self::from_sources_with_policy(config, sources, &UrgencyPolicy::standard())
    }

    /// Build the engine, relaxing urgencies with `policy`.
    ///
    /// The result is always audited against the standard safety exclusions, whatever
    /// keyword lists `policy` carries.
    pub fn from_sources_with_policy(
        config: EngineConfig,
        sources: EngineSources<'_>,
        policy: &UrgencyPolicy,
    ) -> EngineResult<Self> {
        let vocabulary = Arc::new(Vocabulary::parse(sources.vocabulary)?);
        let aliases = AliasTable::parse(sources.aliases, &vocabulary)?;
        let normalizer = Normalizer::standard(vocabulary, aliases)?;
        let (knowledge_base, load_report) =
            KnowledgeBase::build(sources.knowledge_base, &normalizer, policy)?;

        let violations = UrgencyPolicy::standard().audit(knowledge_base.iter());
        if !violations.is_empty() {
            for violation in &violations {
                tracing::error!(%violation, "urgency safety violation");
            }
            return Err(EngineError::UrgencySafetyViolation(violations));
        }

        tracing::info!(
            vocabulary = normalizer.vocabulary().len(),
            aliases = normalizer.aliases().len(),
            rules = normalizer.rules().len(),
            profiles = knowledge_base.len(),
            "engine ready"
        );

        Ok(Self {
            config,
            normalizer,
            knowledge_base,
            load_report,
            similarity: Arc::new(NullSimilarity),
        })
    }

    pub fn with_similarity(mut self, backend: Arc<dyn SimilarityBackend>) -> Self {
        self.similarity = backend;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        self.normalizer.vocabulary()
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.knowledge_base
    }

    pub fn load_report(&self) -> &LoadReport {
        &self.load_report
    }

    pub fn similarity_backend(&self) -> &str {
        self.similarity.name()
    }

    pub fn normalize<I, S>(&self, raw: I) -> NormalizedSymptoms
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.normalizer.normalize(raw)
    }

    /// Re-run the urgency safety audit against the live knowledge base.
    pub fn audit(&self) -> Vec<UrgencyViolation> {
        UrgencyPolicy::standard().audit(self.knowledge_base.iter())
    }

    fn prepare(&self, report: &SymptomReport, top_n: Option<usize>) -> EngineResult<PreparedQuery> {
        let top_n = top_n.unwrap_or(self.config.default_top_n());
        validate_top_n(top_n)?;
        let species: Species = report.species.parse()?;

        let mut normalized = self.normalizer.normalize(&report.raw_symptoms);
        if let Some(text) = report.free_text.as_deref() {
            normalized.merge(self.normalizer.extract_from_text(text));
        }

        if normalized.canonical.is_empty() {
            return Err(EngineError::EmptyInput {
                unmapped: normalized.unmapped,
            });
        }

        Ok(PreparedQuery {
            species,
            normalized,
            top_n,
        })
    }

    fn finish(
        &self,
        query: PreparedQuery,
        results: Vec<scoring::DiagnosisResult>,
        scoring_mode: ScoringMode,
    ) -> DiagnosisReport {
        let top_matches = ranker::rank(results, query.top_n);
        let vocabulary = self.normalizer.vocabulary();
        let red_flags = query
            .normalized
            .canonical
            .iter()
            .filter(|key| vocabulary.severity_weight(key).unwrap_or(0) >= RED_FLAG_SEVERITY)
            .cloned()
            .collect();

        tracing::debug!(
            species = %query.species,
            canonical = query.normalized.canonical.len(),
            unmapped = query.normalized.unmapped.len(),
            matches = top_matches.len(),
            ?scoring_mode,
            "diagnosis complete"
        );

        DiagnosisReport {
            species: query.species,
            top_matches,
            canonical_symptoms: query.normalized.canonical.into_iter().collect(),
            warnings: query
                .normalized
                .unmapped
                .into_iter()
                .map(|token| UnmappedSymptomWarning { token })
                .collect(),
            red_flags,
            scoring_mode,
        }
    }

    /// Rank candidate diseases for a report using the structured score only.
    ///
    /// # Errors
    ///
    /// - `EngineError::InvalidTopN` if `top_n` is outside 1–100
    /// - `EngineError::InvalidSpecies` if the species is not supported
    /// - `EngineError::EmptyInput` if nothing in the report resolves to a canonical symptom
    pub fn diagnose(&self, report: &SymptomReport, top_n: Option<usize>) -> EngineResult<DiagnosisReport> {
        let query = self.prepare(report, top_n)?;
        let results = scoring::score(
            self.knowledge_base.diseases_for_species(query.species),
            &query.normalized.canonical,
        );
        Ok(self.finish(query, results, ScoringMode::Structured))
    }

    /// Like [`Engine::diagnose`], blending in the semantic backend when the report carries
    /// free text and a backend is available. Backend failures degrade to structured scoring.
    pub async fn diagnose_with_similarity(
        &self,
        report: &SymptomReport,
        top_n: Option<usize>,
    ) -> EngineResult<DiagnosisReport> {
        let text = match report.free_text.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => text.to_string(),
            _ => return self.diagnose(report, top_n),
        };
        if !self.similarity.is_available() || self.config.semantic_weight() == 0.0 {
            return self.diagnose(report, top_n);
        }

        let query = self.prepare(report, top_n)?;
        let mut results = scoring::score(
            self.knowledge_base.diseases_for_species(query.species),
            &query.normalized.canonical,
        );

        let candidates: Vec<DiseaseProfile> = results
            .iter()
            .filter_map(|r| self.knowledge_base.find(query.species, r.disease.as_str()))
            .cloned()
            .collect();

        match self.semantic_scores(text, candidates).await {
            Ok(semantic) if semantic.len() == results.len() => {
                let weight = self.config.semantic_weight();
                for (result, value) in results.iter_mut().zip(semantic) {
                    result.match_score = scoring::blend(result.match_score, value, weight);
                }
                Ok(self.finish(query, results, ScoringMode::Blended))
            }
            Ok(_) => {
                tracing::warn!(
                    backend = self.similarity.name(),
                    "semantic scores did not line up with candidates; using structured scores"
                );
                Ok(self.finish(query, results, ScoringMode::Structured))
            }
            Err(error) => {
                tracing::warn!(
                    backend = self.similarity.name(),
                    %error,
                    "semantic scoring failed; using structured scores"
                );
                Ok(self.finish(query, results, ScoringMode::Structured))
            }
        }
    }

    async fn semantic_scores(
        &self,
        text: String,
        candidates: Vec<DiseaseProfile>,
    ) -> Result<Vec<f64>, SimilarityError> {
        let backend = Arc::clone(&self.similarity);
        let budget = self.config.similarity_timeout();
        let cancelled = Arc::new(AtomicBool::new(false));
        let task_cancelled = Arc::clone(&cancelled);

        // A timed-out task cannot be aborted mid-call; it stops at the next candidate.
        let task = tokio::task::spawn_blocking(move || {
            candidates
                .iter()
                .map(|profile| {
                    if task_cancelled.load(Ordering::Relaxed) {
                        return Err(SimilarityError::Timeout(budget));
                    }
                    backend.similarity(&text, profile)
                })
                .collect::<Result<Vec<f64>, SimilarityError>>()
        });

        let scores = match tokio::time::timeout(budget, task).await {
            Err(_) => {
                cancelled.store(true, Ordering::Relaxed);
                return Err(SimilarityError::Timeout(budget));
            }
            Ok(Err(join_error)) => return Err(SimilarityError::Backend(join_error.to_string())),
            Ok(Ok(scores)) => scores?,
        };

        if let Some(bad) = scores.iter().find(|s| !s.is_finite()) {
            return Err(SimilarityError::Backend(format!("non-finite similarity {bad}")));
        }
        Ok(scores)
    }

    /// Questions about symptoms the top matches share but the owner has not reported.
    ///
    /// Ranked by how many top matches list the symptom, then severity weight, then key.
    pub fn next_questions(&self, diagnosis: &DiagnosisReport, limit: Option<usize>) -> Vec<FollowUpQuestion> {
        let limit = limit.unwrap_or(DEFAULT_QUESTION_LIMIT);
        let reported: BTreeSet<&str> = diagnosis.canonical_symptoms.iter().map(String::as_str).collect();

        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for result in &diagnosis.top_matches {
            let Some(profile) = self
                .knowledge_base
                .find(diagnosis.species, result.disease.as_str())
            else {
                continue;
            };
            for key in &profile.symptoms {
                if !reported.contains(key.as_str()) {
                    *counts.entry(key.as_str()).or_default() += 1;
                }
            }
        }

        let vocabulary = self.normalizer.vocabulary();
        let mut questions: Vec<FollowUpQuestion> = counts
            .into_iter()
            .filter_map(|(key, supporting_matches)| {
                let symptom = vocabulary.resolve(key)?;
                Some(FollowUpQuestion {
                    symptom: key.to_string(),
                    question: symptom.question.clone(),
                    severity_weight: symptom.severity_weight,
                    supporting_matches,
                })
            })
            .collect();

        questions.sort_by(|a, b| {
            b.supporting_matches
                .cmp(&a.supporting_matches)
                .then_with(|| b.severity_weight.cmp(&a.severity_weight))
                .then_with(|| a.symptom.cmp(&b.symptom))
        });
        questions.truncate(limit);
        questions
    }
}

/// An engine handle that can be swapped out while queries are in flight.
///
/// Readers clone the current `Arc` and finish on whatever data they started with.
pub struct SharedEngine {
    inner: RwLock<Arc<Engine>>,
}

impl SharedEngine {
    pub fn new(engine: Engine) -> Self {
        Self {
            inner: RwLock::new(Arc::new(engine)),
        }
    }

    pub fn current(&self) -> Arc<Engine> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Replace the engine. Returns the previous one.
    pub fn reload(&self, engine: Engine) -> Arc<Engine> {
        let fingerprint = engine.load_report().fingerprint.clone();
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let previous = std::mem::replace(&mut *guard, Arc::new(engine));
        tracing::info!(
            from = %previous.load_report().fingerprint,
            to = %fingerprint,
            "reloaded engine"
        );
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::test_support::{
        BUNDLED_ALIASES, BUNDLED_KNOWLEDGE_BASE, BUNDLED_VOCABULARY,
    };
    use crate::scoring::DiagnosisResult;
    use std::path::PathBuf;
    use std::time::Duration;
    use vet_types::Urgency;

    fn sources() -> EngineSources<'static> {
        EngineSources {
            vocabulary: BUNDLED_VOCABULARY,
            aliases: BUNDLED_ALIASES,
            knowledge_base: BUNDLED_KNOWLEDGE_BASE,
        }
    }

    fn engine_with(config: EngineConfig) -> Engine {
        Engine::from_sources(config, sources()).expect("bundled engine")
    }

    fn engine() -> Engine {
        engine_with(EngineConfig::with_defaults(PathBuf::from("data")))
    }

    fn names(results: &[DiagnosisResult]) -> Vec<&str> {
        results.iter().map(|r| r.disease.as_str()).collect()
    }

    struct SlowSimilarity;

    impl SimilarityBackend for SlowSimilarity {
        fn name(&self) -> &'static str {
            "slow"
        }

        fn similarity(&self, _text: &str, _profile: &DiseaseProfile) -> Result<f64, SimilarityError> {
            std::thread::sleep(Duration::from_millis(150));
            Ok(1.0)
        }
    }

    /// Counts calls so tests can see whether abandoned work keeps running.
    struct CountingSimilarity {
        calls: Arc<std::sync::atomic::AtomicUsize>,
    }

    impl SimilarityBackend for CountingSimilarity {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn similarity(&self, _text: &str, _profile: &DiseaseProfile) -> Result<f64, SimilarityError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(80));
            Ok(1.0)
        }
    }

    struct BrokenSimilarity;

    impl SimilarityBackend for BrokenSimilarity {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn similarity(&self, _text: &str, _profile: &DiseaseProfile) -> Result<f64, SimilarityError> {
            Ok(f64::NAN)
        }
    }

    #[test]
    fn engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Engine>();
        assert_send_sync::<SharedEngine>();
    }

    #[test]
    fn parvo_ranks_first_for_its_classic_triad() {
        let engine = engine();
        let report = SymptomReport::new("Dog", ["vomiting", "bloody diarrhea", "lethargy"]);
        let diagnosis = engine.diagnose(&report, None).expect("diagnosis");

        let top = &diagnosis.top_matches[0];
        assert_eq!(top.disease.as_str(), "Canine parvovirus");
        assert_eq!(top.match_score, 100.0);
        assert_eq!(top.user_coverage, 100.0);
        assert_eq!(top.urgency, Urgency::Emergency);
        assert!(top.contagious);
        assert_eq!(diagnosis.scoring_mode, ScoringMode::Structured);
        assert!(diagnosis.warnings.is_empty());
    }

    #[test]
    fn unknown_species_is_rejected() {
        let engine = engine();
        let err = engine
            .diagnose(&SymptomReport::new("Dragon", ["vomiting"]), None)
            .expect_err("unsupported species");
        assert!(matches!(err, EngineError::InvalidSpecies(_)));
    }

    #[test]
    fn species_synonyms_are_accepted() {
        let engine = engine();
        let diagnosis = engine
            .diagnose(&SymptomReport::new("kitten", ["sneezing"]), None)
            .expect("kitten is a cat");
        assert_eq!(diagnosis.species, Species::Cat);
    }

    #[test]
    fn gibberish_only_is_empty_input_with_unmapped_tokens() {
        let engine = engine();
        let err = engine
            .diagnose(&SymptomReport::new("Cat", ["unknown_gibberish_token"]), None)
            .expect_err("nothing canonical");
        match err {
            EngineError::EmptyInput { unmapped } => {
                assert_eq!(unmapped, vec!["unknown_gibberish_token".to_string()]);
            }
            other => panic!("expected EmptyInput, got {other:?}"),
        }

        let err = engine
            .diagnose(&SymptomReport::new("Cat", ["  ", ""]), None)
            .expect_err("blank symptoms");
        assert!(matches!(err, EngineError::EmptyInput { ref unmapped } if unmapped.is_empty()));
    }

    #[test]
    fn top_n_is_validated() {
        let engine = engine();
        let report = SymptomReport::new("Dog", ["vomiting"]);
        assert!(matches!(
            engine.diagnose(&report, Some(0)),
            Err(EngineError::InvalidTopN { value: 0, .. })
        ));
        assert!(matches!(
            engine.diagnose(&report, Some(101)),
            Err(EngineError::InvalidTopN { value: 101, .. })
        ));
    }

    #[test]
    fn unmapped_tokens_become_warnings() {
        let engine = engine();
        let report = SymptomReport::new("Dog", ["vomiting", "zorblax"]);
        let diagnosis = engine.diagnose(&report, None).expect("diagnosis");
        assert_eq!(
            diagnosis.warnings,
            vec![UnmappedSymptomWarning {
                token: "zorblax".into()
            }]
        );
        assert_eq!(diagnosis.warnings[0].to_string(), "symptom 'zorblax' was not recognised");
    }

    #[test]
    fn free_text_contributes_symptoms_and_red_flags() {
        let engine = engine();
        let report = SymptomReport::new("Dog", ["drooling"])
            .with_free_text("Swollen belly and he keeps retching. Now he collapsed!");
        let diagnosis = engine.diagnose(&report, None).expect("diagnosis");

        assert_eq!(
            diagnosis.canonical_symptoms,
            vec!["bloated_abdomen", "collapse", "drooling", "unproductive_retching"]
        );
        assert_eq!(diagnosis.red_flags, vec!["bloated_abdomen", "collapse", "unproductive_retching"]);
        assert_eq!(
            diagnosis.top_matches[0].disease.as_str(),
            "Gastric dilatation-volvulus (bloat)"
        );
    }

    #[test]
    fn next_questions_rank_shared_unreported_symptoms() {
        let engine = engine();
        let report = SymptomReport::new("Dog", ["vomiting"]);
        let diagnosis = engine.diagnose(&report, Some(5)).expect("diagnosis");
        let questions = engine.next_questions(&diagnosis, None);

        assert_eq!(questions.len(), DEFAULT_QUESTION_LIMIT);
        assert!(questions.iter().all(|q| q.symptom != "vomiting"));
        for pair in questions.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(
                (a.supporting_matches, a.severity_weight) >= (b.supporting_matches, b.severity_weight),
                "{a:?} before {b:?}"
            );
        }
        assert!(!questions[0].question.is_empty());
        assert!(engine.next_questions(&diagnosis, Some(0)).is_empty());
    }

    #[test]
    fn live_audit_is_clean() {
        assert!(engine().audit().is_empty());
    }

    #[test]
    fn load_reads_files_from_data_dir() {
        let data_dir = crate::config::resolve_data_dir(None).expect("bundled data dir");
        let engine = Engine::load(EngineConfig::with_defaults(data_dir)).expect("engine loads");
        assert_eq!(engine.knowledge_base().len(), engine.load_report().accepted);
    }

    #[test]
    fn load_reports_missing_files() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let err = Engine::load(EngineConfig::with_defaults(dir.path().to_path_buf()))
            .expect_err("no data files");
        assert!(matches!(err, EngineError::FileRead { .. }));
    }

    #[test]
    fn construction_fails_when_a_policy_relaxes_an_excluded_disease() {
        let loose = UrgencyPolicy::new(["gastroenteritis"], Vec::<String>::new());
        let err = Engine::from_sources_with_policy(
            EngineConfig::with_defaults(PathBuf::from("data")),
            sources(),
            &loose,
        )
        .expect_err("relaxing hemorrhagic gastroenteritis must fail the audit");

        match err {
            EngineError::UrgencySafetyViolation(violations) => {
                assert!(violations
                    .iter()
                    .any(|v| v.disease == "Hemorrhagic gastroenteritis"
                        && v.declared == Urgency::Severe
                        && v.effective == Urgency::Moderate));
            }
            other => panic!("expected UrgencySafetyViolation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn similarity_blends_when_backend_answers() {
        let engine = engine().with_similarity(Arc::new(crate::similarity::TokenOverlapSimilarity));
        let report = SymptomReport::new("Dog", ["vomiting", "bloody_diarrhea", "lethargy"])
            .with_free_text("bloody diarrhea and vomiting");
        let diagnosis = engine
            .diagnose_with_similarity(&report, None)
            .await
            .expect("diagnosis");

        assert_eq!(diagnosis.scoring_mode, ScoringMode::Blended);
        assert_eq!(diagnosis.top_matches[0].disease.as_str(), "Canine parvovirus");
        assert!(diagnosis.top_matches[0].match_score <= 100.0);
    }

    #[tokio::test]
    async fn similarity_timeout_falls_back_to_structured() {
        let config = EngineConfig::new(PathBuf::from("data"), 5, Duration::from_millis(20), 0.3)
            .expect("config");
        let engine = engine_with(config).with_similarity(Arc::new(SlowSimilarity));
        let report = SymptomReport::new("Dog", ["bloody_diarrhea"]).with_free_text("bloody diarrhea");

        let blended = engine.diagnose_with_similarity(&report, None).await.expect("diagnosis");
        let structured = engine.diagnose(&report, None).expect("diagnosis");

        assert_eq!(blended.scoring_mode, ScoringMode::Structured);
        assert_eq!(names(&blended.top_matches), names(&structured.top_matches));
    }

    #[tokio::test]
    async fn timed_out_similarity_batch_stops_at_the_next_candidate() {
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let config = EngineConfig::new(PathBuf::from("data"), 5, Duration::from_millis(20), 0.3)
            .expect("config");
        let engine = engine_with(config).with_similarity(Arc::new(CountingSimilarity {
            calls: Arc::clone(&calls),
        }));
        let report = SymptomReport::new("Dog", ["coughing"]).with_free_text("coughing");

        let diagnosis = engine.diagnose_with_similarity(&report, None).await.expect("diagnosis");
        assert_eq!(diagnosis.scoring_mode, ScoringMode::Structured);
        assert!(diagnosis.top_matches.len() > 1);

        // Long enough for an uncancelled batch to reach every candidate.
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(calls.load(Ordering::SeqCst) <= 1);
    }

    #[tokio::test]
    async fn non_finite_similarity_falls_back_to_structured() {
        let engine = engine().with_similarity(Arc::new(BrokenSimilarity));
        let report = SymptomReport::new("Dog", ["coughing"]).with_free_text("coughing");
        let diagnosis = engine.diagnose_with_similarity(&report, None).await.expect("diagnosis");
        assert_eq!(diagnosis.scoring_mode, ScoringMode::Structured);
        assert!(diagnosis.top_matches.iter().all(|r| r.match_score.is_finite()));
    }

    #[tokio::test]
    async fn without_free_text_the_semantic_path_is_skipped() {
        let engine = engine().with_similarity(Arc::new(SlowSimilarity));
        let report = SymptomReport::new("Dog", ["coughing"]);
        let diagnosis = engine.diagnose_with_similarity(&report, None).await.expect("diagnosis");
        assert_eq!(diagnosis.scoring_mode, ScoringMode::Structured);
    }

    #[test]
    fn shared_engine_swaps_atomically() {
        let shared = SharedEngine::new(engine());
        let before = shared.current();

        let previous = shared.reload(engine());
        let after = shared.current();

        assert!(Arc::ptr_eq(&before, &previous));
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(before.load_report().fingerprint, after.load_report().fingerprint);
    }
}
