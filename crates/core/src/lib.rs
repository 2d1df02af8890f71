//! # Vetmatch Core
//!
//! Symptom normalization, knowledge-base matching and differential ranking for veterinary
//! triage.
//!
//! This crate contains the pure matching pipeline and its reference-data loaders:
//! - Canonical symptom vocabulary, alias table and ordered keyword rules
//! - Species-partitioned disease knowledge base with load reporting
//! - Structured scoring, optional semantic blending and deterministic ranking
//! - Urgency safety policy and its runtime audit
//! - Self-retrieval accuracy harness
//!
//! **No transport concerns**: HTTP routing, authentication and persistence of conversations
//! belong to callers. Configuration is resolved once by the binary and passed in as an
//! [`EngineConfig`]; this crate never reads environment variables.

pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod evaluation;
pub mod knowledge_base;
pub mod normalizer;
pub mod ranker;
pub mod scoring;
pub mod similarity;
pub mod urgency;
pub mod vocabulary;

pub use config::EngineConfig;
pub use engine::{
    DiagnosisReport, Engine, EngineSources, FollowUpQuestion, ScoringMode, SharedEngine,
    SymptomReport, UnmappedSymptomWarning,
};
pub use error::{EngineError, EngineResult};
pub use evaluation::{evaluate_self_retrieval, RetrievalReport};
pub use knowledge_base::{DiseaseProfile, KnowledgeBase, LoadReport};
pub use normalizer::{NormalizedSymptoms, Normalizer};
pub use scoring::DiagnosisResult;
pub use similarity::{NullSimilarity, SimilarityBackend, SimilarityError, TokenOverlapSimilarity};
pub use urgency::{UrgencyPolicy, UrgencyViolation};
pub use vocabulary::{CanonicalSymptom, SymptomCategory, Vocabulary};

pub use vet_types::{DiseaseName, Species, Urgency};
