//! Engine runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the engine. The
//! engine itself never reads process-wide environment variables; binaries read them and hand
//! the raw values to the `*_from_env_value` helpers below.

use crate::constants::{
    ALIASES_FILENAME, DATA_DIR_NAME, DEFAULT_SEMANTIC_WEIGHT, DEFAULT_SIMILARITY_TIMEOUT_MS,
    DEFAULT_TOP_N, KNOWLEDGE_BASE_FILENAME, MAX_SEMANTIC_WEIGHT, MAX_TOP_N, VOCABULARY_FILENAME,
};
use crate::{EngineError, EngineResult};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Engine configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    data_dir: PathBuf,
    default_top_n: usize,
    similarity_timeout: Duration,
    semantic_weight: f64,
}

impl EngineConfig {
    /// Create a new `EngineConfig`.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidTopN` if `default_top_n` is outside `1..=MAX_TOP_N`, and
    /// `EngineError::InvalidInput` if the timeout is zero or the semantic weight is outside
    /// `[0, MAX_SEMANTIC_WEIGHT)`.
    pub fn new(
        data_dir: PathBuf,
        default_top_n: usize,
        similarity_timeout: Duration,
        semantic_weight: f64,
    ) -> EngineResult<Self> {
        validate_top_n(default_top_n)?;

        if similarity_timeout.is_zero() {
            return Err(EngineError::InvalidInput(
                "similarity timeout must be greater than zero".into(),
            ));
        }

        if !semantic_weight.is_finite() || !(0.0..MAX_SEMANTIC_WEIGHT).contains(&semantic_weight) {
            return Err(EngineError::InvalidInput(format!(
                "semantic weight must be in [0, {MAX_SEMANTIC_WEIGHT}), got {semantic_weight}"
            )));
        }

        Ok(Self {
            data_dir,
            default_top_n,
            similarity_timeout,
            semantic_weight,
        })
    }

    /// Configuration with every tunable at its default, reading data from `data_dir`.
    pub fn with_defaults(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            default_top_n: DEFAULT_TOP_N,
            similarity_timeout: Duration::from_millis(DEFAULT_SIMILARITY_TIMEOUT_MS),
            semantic_weight: DEFAULT_SEMANTIC_WEIGHT,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn vocabulary_path(&self) -> PathBuf {
        self.data_dir.join(VOCABULARY_FILENAME)
    }

    pub fn aliases_path(&self) -> PathBuf {
        self.data_dir.join(ALIASES_FILENAME)
    }

    pub fn knowledge_base_path(&self) -> PathBuf {
        self.data_dir.join(KNOWLEDGE_BASE_FILENAME)
    }

    pub fn default_top_n(&self) -> usize {
        self.default_top_n
    }

    pub fn similarity_timeout(&self) -> Duration {
        self.similarity_timeout
    }

    pub fn semantic_weight(&self) -> f64 {
        self.semantic_weight
    }
}

/// Check a caller-supplied result count against `1..=MAX_TOP_N`.
pub fn validate_top_n(top_n: usize) -> EngineResult<()> {
    if top_n == 0 || top_n > MAX_TOP_N {
        return Err(EngineError::InvalidTopN {
            value: top_n,
            max: MAX_TOP_N,
        });
    }
    Ok(())
}

/// Resolve the reference data directory without reading environment variables.
///
/// If `override_dir` is provided, it must be a directory containing the vocabulary file.
/// Otherwise this searches for `data/` relative to the current working directory and then
/// walks up from `CARGO_MANIFEST_DIR`.
pub fn resolve_data_dir(override_dir: Option<PathBuf>) -> EngineResult<PathBuf> {
    fn looks_like_data_dir(path: &Path) -> bool {
        path.is_dir() && path.join(VOCABULARY_FILENAME).is_file()
    }

    if let Some(data_dir) = override_dir {
        if looks_like_data_dir(&data_dir) {
            return Ok(data_dir);
        }
        return Err(EngineError::InvalidInput(format!(
            "VETMATCH_DATA_DIR override is not a valid data directory (must contain {VOCABULARY_FILENAME})"
        )));
    }

    let cwd_relative = PathBuf::from(DATA_DIR_NAME);
    if looks_like_data_dir(&cwd_relative) {
        return Ok(cwd_relative);
    }

    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    for ancestor in manifest_dir.ancestors() {
        let candidate = ancestor.join(DATA_DIR_NAME);
        if looks_like_data_dir(&candidate) {
            return Ok(candidate);
        }
    }

    Err(EngineError::InvalidInput(format!(
        "could not locate a {DATA_DIR_NAME}/ directory containing {VOCABULARY_FILENAME}"
    )))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse the default result count from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_TOP_N`].
pub fn top_n_from_env_value(value: Option<String>) -> EngineResult<usize> {
    let Some(value) = non_blank(value) else {
        return Ok(DEFAULT_TOP_N);
    };
    let parsed = value
        .parse::<usize>()
        .map_err(|_| EngineError::InvalidInput(format!("top_n is not a number: '{value}'")))?;
    validate_top_n(parsed)?;
    Ok(parsed)
}

/// Parse the similarity timeout (milliseconds) from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_SIMILARITY_TIMEOUT_MS`].
pub fn timeout_from_env_value(value: Option<String>) -> EngineResult<Duration> {
    let Some(value) = non_blank(value) else {
        return Ok(Duration::from_millis(DEFAULT_SIMILARITY_TIMEOUT_MS));
    };
    let millis = value.parse::<u64>().map_err(|_| {
        EngineError::InvalidInput(format!("similarity timeout is not a number: '{value}'"))
    })?;
    Ok(Duration::from_millis(millis))
}

/// Parse the semantic blend weight from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_SEMANTIC_WEIGHT`]. Range
/// checking happens in [`EngineConfig::new`].
pub fn semantic_weight_from_env_value(value: Option<String>) -> EngineResult<f64> {
    let Some(value) = non_blank(value) else {
        return Ok(DEFAULT_SEMANTIC_WEIGHT);
    };
    value.parse::<f64>().map_err(|_| {
        EngineError::InvalidInput(format!("semantic weight is not a number: '{value}'"))
    })
}
