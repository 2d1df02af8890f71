use crate::urgency::UrgencyViolation;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid species: {0}")]
    InvalidSpecies(#[from] vet_types::SpeciesError),
    #[error("no recognisable symptoms in the request (unmapped: {unmapped:?})")]
    EmptyInput { unmapped: Vec<String> },
    #[error("top_n must be between 1 and {max}, got {value}")]
    InvalidTopN { value: usize, max: usize },
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("failed to read {}: {source}", .path.display())]
    FileRead {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid vocabulary: {0}")]
    VocabularyLoad(String),

    #[error("invalid alias table: {0}")]
    AliasLoad(String),
    #[error("alias '{alias}' shadows the canonical key of the same name")]
    AliasShadowsCanonical { alias: String },
    #[error("alias '{alias}' points at '{target}', which is itself an alias (aliases must resolve in one hop)")]
    AliasChain { alias: String, target: String },
    #[error("alias '{alias}' points at unknown canonical key '{target}'")]
    UnknownAliasTarget { alias: String, target: String },

    #[error("invalid normalization rule table: {0}")]
    RuleTable(String),

    #[error("failed to load knowledge base: {0}")]
    KnowledgeBaseLoad(String),

    #[error("urgency safety audit failed with {} violation(s)", .0.len())]
    UrgencySafetyViolation(Vec<UrgencyViolation>),
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
