//! Constants used throughout the matching engine.
//!
//! File names, query limits and scoring defaults live here so the CLI, the loaders and the
//! tests agree on them.

/// Directory searched for reference data when no explicit directory is configured.
pub const DATA_DIR_NAME: &str = "data";

/// Filename for the canonical symptom vocabulary.
pub const VOCABULARY_FILENAME: &str = "vocabulary.yaml";

/// Filename for the surface-form alias table.
pub const ALIASES_FILENAME: &str = "aliases.yaml";

/// Filename for the disease knowledge base.
pub const KNOWLEDGE_BASE_FILENAME: &str = "knowledge_base.yaml";

/// Number of ranked matches returned when the caller does not ask for a specific count.
pub const DEFAULT_TOP_N: usize = 5;

/// Upper bound on `top_n` accepted from callers.
pub const MAX_TOP_N: usize = 100;

/// Budget for one batch of semantic similarity calls.
pub const DEFAULT_SIMILARITY_TIMEOUT_MS: u64 = 800;

/// Share of the blended match score taken by the semantic similarity signal.
pub const DEFAULT_SEMANTIC_WEIGHT: f64 = 0.3;

/// The semantic weight must stay strictly below this so the structured score dominates.
pub const MAX_SEMANTIC_WEIGHT: f64 = 0.5;

/// Vocabulary severity weight at which a reported symptom is surfaced as a red flag.
pub const RED_FLAG_SEVERITY: u8 = 5;

/// Follow-up questions returned when the caller does not ask for a specific count.
pub const DEFAULT_QUESTION_LIMIT: usize = 3;

/// Minimum Top-1 self-retrieval rate the bundled knowledge base must reach.
pub const SELF_RETRIEVAL_ACCEPTANCE_RATE: f64 = 0.95;
