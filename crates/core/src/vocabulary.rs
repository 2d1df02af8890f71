//! Canonical symptom vocabulary.
//!
//! The vocabulary is the fixed set of symptom keys every other component speaks in. It is
//! parsed once from `vocabulary.yaml` and never mutated afterwards. Lookups are pure: an
//! unknown key is reported to the caller, never invented.
//!
//! ## File format
//!
//! ```yaml
//! vomiting:
//!   category: gastrointestinal
//!   severity_weight: 3
//!   question: Has your pet been vomiting?
//! ```

use crate::constants::RED_FLAG_SEVERITY;
use crate::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Body system a canonical symptom belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymptomCategory {
    Gastrointestinal,
    Respiratory,
    Neurological,
    Dermatological,
    Musculoskeletal,
    Urinary,
    Reproductive,
    Ocular,
    Aural,
    Oral,
    Behavioral,
    Systemic,
    Cardiovascular,
}

/// One entry of the canonical vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalSymptom {
    pub key: String,
    pub category: SymptomCategory,
    /// Clinical weight from 1 (minor) to 5 (red flag).
    pub severity_weight: u8,
    /// Follow-up question shown to the owner in the triage chat.
    pub question: String,
}

impl CanonicalSymptom {
    pub fn is_red_flag(&self) -> bool {
        self.severity_weight >= RED_FLAG_SEVERITY
    }
}

/// Wire model for one vocabulary entry.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SymptomWire {
    category: SymptomCategory,
    severity_weight: u8,
    question: String,
}

/// The immutable canonical vocabulary, keyed and iterated in key order.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    entries: BTreeMap<String, CanonicalSymptom>,
}

impl Vocabulary {
    /// Strictly parse the vocabulary from YAML text.
    ///
    /// This uses `serde_path_to_error` to surface the failing entry (e.g. `vomiting.category`)
    /// when the YAML does not match the wire schema.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::VocabularyLoad` if:
    /// - the YAML is not a mapping of key to entry,
    /// - any entry has unknown fields, an unknown category or a wrong type,
    /// - any entry fails [`Vocabulary::from_symptoms`] validation.
    pub fn parse(yaml_text: &str) -> EngineResult<Self> {
        let deserializer = serde_yaml::Deserializer::from_str(yaml_text);

        let wire: BTreeMap<String, SymptomWire> =
            match serde_path_to_error::deserialize(deserializer) {
                Ok(parsed) => parsed,
                Err(err) => {
                    let path = err.path().to_string();
                    let source = err.into_inner();
                    let path = if path.is_empty() {
                        "<root>"
                    } else {
                        path.as_str()
                    };
                    return Err(EngineError::VocabularyLoad(format!(
                        "schema mismatch at {path}: {source}"
                    )));
                }
            };

        Self::from_symptoms(wire.into_iter().map(|(key, entry)| CanonicalSymptom {
            key,
            category: entry.category,
            severity_weight: entry.severity_weight,
            question: entry.question,
        }))
    }

    /// Read and parse the vocabulary file at `path`.
    pub fn load(path: &Path) -> EngineResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| EngineError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Build a vocabulary from already-constructed entries, validating each one.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::VocabularyLoad` if the set is empty, a key is not snake_case, a
    /// key repeats, a severity weight is outside 1–5, or a question is blank.
    pub fn from_symptoms(
        symptoms: impl IntoIterator<Item = CanonicalSymptom>,
    ) -> EngineResult<Self> {
        let mut entries = BTreeMap::new();

        for symptom in symptoms {
            if !is_snake_case_key(&symptom.key) {
                return Err(EngineError::VocabularyLoad(format!(
                    "key '{}' is not snake_case (lower-case letters, digits and '_', starting with a letter)",
                    symptom.key
                )));
            }
            if !(1..=5).contains(&symptom.severity_weight) {
                return Err(EngineError::VocabularyLoad(format!(
                    "key '{}' has severity_weight {} (expected 1-5)",
                    symptom.key, symptom.severity_weight
                )));
            }
            if symptom.question.trim().is_empty() {
                return Err(EngineError::VocabularyLoad(format!(
                    "key '{}' has an empty question",
                    symptom.key
                )));
            }
            if entries.contains_key(&symptom.key) {
                return Err(EngineError::VocabularyLoad(format!(
                    "key '{}' is defined more than once",
                    symptom.key
                )));
            }
            entries.insert(symptom.key.clone(), symptom);
        }

        if entries.is_empty() {
            return Err(EngineError::VocabularyLoad(
                "vocabulary must define at least one symptom".into(),
            ));
        }

        Ok(Self { entries })
    }

    /// Look up a canonical key. Returns `None` for anything that is not exactly a key.
    pub fn resolve(&self, key: &str) -> Option<&CanonicalSymptom> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn question(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|s| s.question.as_str())
    }

    pub fn severity_weight(&self, key: &str) -> Option<u8> {
        self.entries.get(key).map(|s| s.severity_weight)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CanonicalSymptom> {
        self.entries.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn is_snake_case_key(key: &str) -> bool {
    let mut bytes = key.bytes();
    match bytes.next() {
        Some(b'a'..=b'z') => {}
        _ => return false,
    }
    bytes.all(|b| matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'_'))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"vomiting:
  category: gastrointestinal
  severity_weight: 3
  question: Has your pet been vomiting?
collapse:
  category: neurological
  severity_weight: 5
  question: Has your pet collapsed?
"#;

    #[test]
    fn parses_sample_vocabulary() {
        let vocabulary = Vocabulary::parse(SAMPLE).expect("parse vocabulary");
        assert_eq!(vocabulary.len(), 2);

        let vomiting = vocabulary.resolve("vomiting").expect("vomiting is canonical");
        assert_eq!(vomiting.category, SymptomCategory::Gastrointestinal);
        assert_eq!(vomiting.severity_weight, 3);
        assert!(!vomiting.is_red_flag());
        assert!(vocabulary.resolve("collapse").unwrap().is_red_flag());
    }

    #[test]
    fn resolve_reports_unknown_keys() {
        let vocabulary = Vocabulary::parse(SAMPLE).expect("parse vocabulary");
        assert!(vocabulary.resolve("Vomiting").is_none());
        assert!(vocabulary.resolve("sneezing").is_none());
        assert!(!vocabulary.contains(""));
    }

    #[test]
    fn iterates_in_key_order() {
        let vocabulary = Vocabulary::parse(SAMPLE).expect("parse vocabulary");
        let keys: Vec<&str> = vocabulary.keys().collect();
        assert_eq!(keys, vec!["collapse", "vomiting"]);
    }

    #[test]
    fn rejects_unknown_category_with_path() {
        let input = r#"vomiting:
  category: digestive
  severity_weight: 3
  question: Has your pet been vomiting?
"#;
        let err = Vocabulary::parse(input).expect_err("unknown category");
        match err {
            EngineError::VocabularyLoad(msg) => assert!(msg.contains("vomiting"), "{msg}"),
            other => panic!("expected VocabularyLoad, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_fields() {
        let input = r#"vomiting:
  category: gastrointestinal
  severity_weight: 3
  question: Has your pet been vomiting?
  colour: green
"#;
        let err = Vocabulary::parse(input).expect_err("unknown field");
        assert!(matches!(err, EngineError::VocabularyLoad(msg) if msg.contains("colour")));
    }

    #[test]
    fn rejects_out_of_range_severity() {
        let input = r#"vomiting:
  category: gastrointestinal
  severity_weight: 9
  question: Has your pet been vomiting?
"#;
        let err = Vocabulary::parse(input).expect_err("severity out of range");
        assert!(matches!(err, EngineError::VocabularyLoad(msg) if msg.contains("severity_weight 9")));
    }

    #[test]
    fn rejects_non_snake_case_keys() {
        let input = r#"Bloody Diarrhea:
  category: gastrointestinal
  severity_weight: 4
  question: Is there blood in the stool?
"#;
        let err = Vocabulary::parse(input).expect_err("key is not snake_case");
        assert!(matches!(err, EngineError::VocabularyLoad(msg) if msg.contains("snake_case")));
    }

    #[test]
    fn rejects_blank_question_and_empty_vocabulary() {
        let input = r#"vomiting:
  category: gastrointestinal
  severity_weight: 3
  question: "   "
"#;
        assert!(Vocabulary::parse(input).is_err());
        assert!(Vocabulary::parse("{}").is_err());
    }

    #[test]
    fn bundled_vocabulary_is_valid() {
        let vocabulary = Vocabulary::parse(include_str!("../../../data/vocabulary.yaml"))
            .expect("bundled vocabulary should parse");
        assert!(vocabulary.len() > 50);
        assert!(vocabulary.contains("bloody_diarrhea"));
        assert!(vocabulary.iter().any(CanonicalSymptom::is_red_flag));
    }
}
