//! # Symptom normalizer
//!
//! Maps owner-reported tokens (free text, legacy keys, lay synonyms) onto the canonical
//! vocabulary. Each token goes through a strict precedence and the first stage that
//! produces a key wins:
//!
//! 1. the folded token (or its snake-cased spelling) is a canonical key
//! 2. the folded token is an alias surface form
//! 3. the first matching rule in the ordered keyword table
//!
//! Stages 1 and 2 are retried with leading phase descriptors ("chronic", "a bit of", ...)
//! removed before stage 3 runs. Tokens that match nothing are returned as unmapped, never
//! dropped and never coerced onto a nearby key.

pub mod aliases;
pub mod rules;

pub use aliases::AliasTable;
pub use rules::{RuleSet, STANDARD_RULES};

use crate::vocabulary::Vocabulary;
use crate::EngineResult;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

/// Leading qualifiers that describe onset or intensity rather than the symptom itself.
/// Multi-word entries come first so "a bit of" is not cut down to "bit of".
const PHASE_DESCRIPTORS: &[&str] = &[
    "a bit of",
    "a little",
    "acute",
    "chronic",
    "sudden",
    "mild",
    "severe",
    "persistent",
    "occasional",
    "intermittent",
    "slight",
    "frequent",
    "constant",
    "some",
];

const CLAUSE_SEPARATORS: &[char] = &[',', ';', '.', '!', '?', '\n'];
const CLAUSE_CONJUNCTIONS: &[&str] = &[" and ", " with ", " plus ", " also "];

/// Lower-case, trim and collapse inner whitespace runs to a single space.
pub(crate) fn fold_token(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Snake-cased spelling of an already-folded token.
pub(crate) fn snake_case(folded: &str) -> String {
    folded.replace([' ', '-'], "_")
}

/// Remove every leading phase descriptor. Returns `None` when nothing was stripped or
/// nothing is left.
fn strip_phase_descriptors(folded: &str) -> Option<&str> {
    let mut rest = folded;
    loop {
        let before = rest;
        for descriptor in PHASE_DESCRIPTORS {
            if let Some(tail) = rest.strip_prefix(descriptor) {
                if let Some(tail) = tail.strip_prefix(' ') {
                    rest = tail.trim_start();
                    break;
                }
            }
        }
        if rest == before {
            break;
        }
    }

    (rest != folded && !rest.is_empty()).then_some(rest)
}

/// Which precedence stage produced a canonical key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStage {
    Canonical,
    Alias,
    /// Index into the rule table.
    Rule(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub key: String,
    pub stage: MatchStage,
}

/// Output of a normalization pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedSymptoms {
    pub canonical: BTreeSet<String>,
    /// Trimmed original tokens that matched nothing, in first-seen order.
    pub unmapped: Vec<String>,
}

impl NormalizedSymptoms {
    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty() && self.unmapped.is_empty()
    }

    /// Fold `other` into `self`, keeping unmapped tokens unique by their folded form.
    pub fn merge(&mut self, other: NormalizedSymptoms) {
        self.canonical.extend(other.canonical);
        let mut seen: HashSet<String> = self.unmapped.iter().map(|t| fold_token(t)).collect();
        for token in other.unmapped {
            if seen.insert(fold_token(&token)) {
                self.unmapped.push(token);
            }
        }
    }
}

/// Immutable normalization context: vocabulary, alias table and rule table.
#[derive(Debug, Clone)]
pub struct Normalizer {
    vocabulary: Arc<Vocabulary>,
    aliases: AliasTable,
    rules: RuleSet,
}

impl Normalizer {
    pub fn new(vocabulary: Arc<Vocabulary>, aliases: AliasTable, rules: RuleSet) -> Self {
        Self {
            vocabulary,
            aliases,
            rules,
        }
    }

    /// Normalizer using the standard keyword rule table.
    pub fn standard(vocabulary: Arc<Vocabulary>, aliases: AliasTable) -> EngineResult<Self> {
        let rules = RuleSet::standard(&vocabulary)?;
        Ok(Self::new(vocabulary, aliases, rules))
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Resolve a single raw token. Blank tokens resolve to `None`.
    pub fn resolve_token(&self, raw: &str) -> Option<Resolution> {
        let folded = fold_token(raw);
        if folded.is_empty() {
            return None;
        }

        if let Some(resolution) = self.lookup_exact(&folded) {
            return Some(resolution);
        }
        if let Some(stripped) = strip_phase_descriptors(&folded) {
            if let Some(resolution) = self.lookup_exact(stripped) {
                return Some(resolution);
            }
        }

        self.rules
            .first_match(&folded)
            .map(|(position, key)| Resolution {
                key: key.to_string(),
                stage: MatchStage::Rule(position),
            })
    }

    fn lookup_exact(&self, folded: &str) -> Option<Resolution> {
        if self.vocabulary.contains(folded) {
            return Some(Resolution {
                key: folded.to_string(),
                stage: MatchStage::Canonical,
            });
        }
        let snake = snake_case(folded);
        if self.vocabulary.contains(&snake) {
            return Some(Resolution {
                key: snake,
                stage: MatchStage::Canonical,
            });
        }
        self.aliases.get(folded).map(|key| Resolution {
            key: key.to_string(),
            stage: MatchStage::Alias,
        })
    }

    /// Normalize a batch of raw tokens into a canonical set plus the tokens that matched
    /// nothing.
    pub fn normalize<I, S>(&self, raw: I) -> NormalizedSymptoms
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out = NormalizedSymptoms::default();
        let mut seen_unmapped: HashSet<String> = HashSet::new();

        for token in raw {
            let token = token.as_ref();
            let folded = fold_token(token);
            if folded.is_empty() {
                continue;
            }
            let (keys, unmapped) = self.resolve_phrase(&folded);
            out.canonical.extend(keys);
            for clause in unmapped {
                // A wholly unrecognised token is reported as the caller wrote it.
                let reported = if clause == folded {
                    token.trim().to_string()
                } else {
                    clause.clone()
                };
                if seen_unmapped.insert(clause) {
                    out.unmapped.push(reported);
                }
            }
        }

        tracing::debug!(
            canonical = out.canonical.len(),
            unmapped = out.unmapped.len(),
            "normalized symptom tokens"
        );
        out
    }

    /// Resolve one folded token into canonical keys and the clauses that matched nothing.
    ///
    /// An exact, alias or descriptor-stripped match on the whole token is final. Otherwise a
    /// token joined by conjunctions ("vomiting and diarrhea") is also resolved clause by
    /// clause, so a rule hit on the first clause cannot swallow the rest.
    fn resolve_phrase(&self, folded: &str) -> (Vec<String>, Vec<String>) {
        let whole = self.resolve_token(folded);
        if let Some(resolution) = &whole {
            if !matches!(resolution.stage, MatchStage::Rule(_)) {
                return (vec![resolution.key.clone()], Vec::new());
            }
        }

        let clauses = split_on_conjunctions(folded);
        if clauses.len() < 2 {
            return match whole {
                Some(resolution) => (vec![resolution.key], Vec::new()),
                None => (Vec::new(), vec![folded.to_string()]),
            };
        }

        let mut keys: Vec<String> = whole.into_iter().map(|r| r.key).collect();
        let mut unmapped = Vec::new();
        for clause in clauses {
            match self.resolve_token(&clause) {
                Some(resolution) => keys.push(resolution.key),
                None => unmapped.push(clause),
            }
        }
        (keys, unmapped)
    }

    /// Split free text into clauses and normalize each clause.
    pub fn extract_from_text(&self, text: &str) -> NormalizedSymptoms {
        let clauses: Vec<String> = text
            .split(CLAUSE_SEPARATORS)
            .flat_map(split_on_conjunctions)
            .collect();
        self.normalize(clauses)
    }
}

fn split_on_conjunctions(clause: &str) -> Vec<String> {
    let mut parts = vec![fold_token(clause)];
    for conjunction in CLAUSE_CONJUNCTIONS {
        parts = parts
            .iter()
            .flat_map(|part| part.split(conjunction))
            .map(str::to_string)
            .collect();
    }
    parts.retain(|part| !part.is_empty());
    parts
}


#[cfg(test)]
mod tests {
    use super::test_support::{bundled_normalizer, bundled_vocabulary};
    use super::*;
    use proptest::prelude::*;

    fn bundled_keys() -> Vec<String> {
        bundled_vocabulary().keys().map(str::to_string).collect()
    }

    fn keys(normalized: &NormalizedSymptoms) -> Vec<&str> {
        normalized.canonical.iter().map(String::as_str).collect()
    }

    #[test]
    fn folds_case_and_whitespace() {
        assert_eq!(fold_token("  Bloody \t  Diarrhea "), "bloody diarrhea");
        assert_eq!(snake_case("bloody diarrhea"), "bloody_diarrhea");
        assert_eq!(snake_case("bloody-diarrhea"), "bloody_diarrhea");
        assert_eq!(fold_token("   "), "");
    }

    #[test]
    fn strips_leading_phase_descriptors() {
        assert_eq!(strip_phase_descriptors("chronic vomiting"), Some("vomiting"));
        assert_eq!(strip_phase_descriptors("sudden severe collapse"), Some("collapse"));
        assert_eq!(strip_phase_descriptors("a bit of diarrhea"), Some("diarrhea"));
        assert_eq!(strip_phase_descriptors("vomiting"), None);
        assert_eq!(strip_phase_descriptors("severe"), None);
        assert_eq!(strip_phase_descriptors("somersaults"), None);
    }

    #[test]
    fn precedence_canonical_then_alias_then_rule() {
        let normalizer = bundled_normalizer();

        let canonical = normalizer.resolve_token(" Vomiting ").expect("canonical");
        assert_eq!(canonical.key, "vomiting");
        assert_eq!(canonical.stage, MatchStage::Canonical);

        let snake = normalizer.resolve_token("Bloody-Diarrhea").expect("snake form");
        assert_eq!(snake.key, "bloody_diarrhea");
        assert_eq!(snake.stage, MatchStage::Canonical);

        let alias = normalizer.resolve_token("Throwing  Up").expect("alias");
        assert_eq!(alias.key, "vomiting");
        assert_eq!(alias.stage, MatchStage::Alias);

        let rule = normalizer.resolve_token("black tarry stool").expect("rule");
        assert_eq!(rule.key, "bloody_diarrhea");
        assert!(matches!(rule.stage, MatchStage::Rule(_)));
    }

    #[test]
    fn phase_descriptors_do_not_hide_exact_matches() {
        let normalizer = bundled_normalizer();
        let resolution = normalizer.resolve_token("chronic vomiting").expect("stripped");
        assert_eq!(resolution.key, "vomiting");
        assert_eq!(resolution.stage, MatchStage::Canonical);

        let resolution = normalizer.resolve_token("severe throwing up").expect("stripped alias");
        assert_eq!(resolution.key, "vomiting");
        assert_eq!(resolution.stage, MatchStage::Alias);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let normalizer = bundled_normalizer();
        let out = normalizer.normalize(Vec::<String>::new());
        assert!(out.is_empty());

        let out = normalizer.normalize(["", "   ", "\t"]);
        assert!(out.is_empty());
    }

    #[test]
    fn unmapped_tokens_are_kept_deduplicated_in_first_seen_order() {
        let normalizer = bundled_normalizer();
        let out = normalizer.normalize([
            " Zorblax ",
            "vomiting",
            "zorblax",
            "quux  flarp",
            "VOMITING",
            "Quux Flarp",
        ]);
        assert_eq!(keys(&out), vec!["vomiting"]);
        assert_eq!(out.unmapped, vec!["Zorblax".to_string(), "quux  flarp".to_string()]);
    }

    #[test]
    fn duplicates_collapse_into_one_key() {
        let normalizer = bundled_normalizer();
        let out = normalizer.normalize(["vomiting", "throwing up", "chronic vomiting", "puking"]);
        assert_eq!(keys(&out), vec!["vomiting"]);
        assert!(out.unmapped.is_empty());
    }

    #[test]
    fn joined_symptoms_in_one_token_are_all_kept() {
        let normalizer = bundled_normalizer();
        let out = normalizer.normalize(["Vomiting and diarrhea"]);
        assert_eq!(keys(&out), vec!["diarrhea", "vomiting"]);
        assert!(out.unmapped.is_empty());

        let out = normalizer.normalize(["vomiting with zorblax"]);
        assert_eq!(keys(&out), vec!["vomiting"]);
        assert_eq!(out.unmapped, vec!["zorblax".to_string()]);
    }

    #[test]
    fn conjoined_tokens_report_each_unknown_clause() {
        let normalizer = bundled_normalizer();
        let out = normalizer.normalize(["zorblax and flarp"]);
        assert!(out.canonical.is_empty());
        assert_eq!(out.unmapped, vec!["zorblax".to_string(), "flarp".to_string()]);

        let out = normalizer.normalize(["yellow eyes and gums"]);
        assert!(out.canonical.contains("jaundice"));
    }

    #[test]
    fn extracts_symptoms_from_free_text() {
        let normalizer = bundled_normalizer();
        let out = normalizer.extract_from_text(
            "He has been throwing up and has bloody stool. Very lethargic!",
        );
        assert_eq!(keys(&out), vec!["bloody_diarrhea", "lethargy", "vomiting"]);
        assert!(out.unmapped.is_empty());
    }

    #[test]
    fn free_text_keeps_unrecognised_clauses() {
        let normalizer = bundled_normalizer();
        let out = normalizer.extract_from_text("coughing; zorblax");
        assert_eq!(keys(&out), vec!["coughing"]);
        assert_eq!(out.unmapped, vec!["zorblax".to_string()]);
    }

    #[test]
    fn merge_unions_keys_and_deduplicates_unmapped() {
        let normalizer = bundled_normalizer();
        let mut first = normalizer.normalize(["vomiting", "Zorblax"]);
        let second = normalizer.normalize(["coughing", "zorblax", "flarp"]);
        first.merge(second);
        assert_eq!(keys(&first), vec!["coughing", "vomiting"]);
        assert_eq!(first.unmapped, vec!["Zorblax".to_string(), "flarp".to_string()]);
    }

    proptest! {
        #[test]
        fn canonical_keys_normalize_to_themselves(key in prop::sample::select(bundled_keys())) {
            let normalizer = bundled_normalizer();
            let out = normalizer.normalize([key.as_str()]);
            prop_assert_eq!(out.canonical.len(), 1);
            prop_assert!(out.canonical.contains(&key));
            prop_assert!(out.unmapped.is_empty());
        }

        #[test]
        fn case_and_padding_do_not_change_the_result(
            key in prop::sample::select(bundled_keys()),
            upper in proptest::collection::vec(any::<bool>(), 0..40),
            left in 0usize..4,
            right in 0usize..4,
        ) {
            let normalizer = bundled_normalizer();
            let varied: String = key
                .chars()
                .enumerate()
                .map(|(i, c)| {
                    if upper.get(i).copied().unwrap_or(false) {
                        c.to_ascii_uppercase()
                    } else {
                        c
                    }
                })
                .collect();
            let padded = format!("{}{}{}", " ".repeat(left), varied, "\t".repeat(right));
            prop_assert_eq!(normalizer.normalize([padded]), normalizer.normalize([key]));
        }
    }
}
