//! Surface-form alias table.
//!
//! Maps legacy keys, lay terms and clinical synonyms to canonical keys. Every alias resolves
//! in exactly one hop: a target that is itself an alias, or not a canonical key at all, is a
//! data error caught at load time.

use super::{fold_token, snake_case};
use crate::vocabulary::Vocabulary;
use crate::{EngineError, EngineResult};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    map: HashMap<String, String>,
}

impl AliasTable {
    /// Parse and validate the alias table from YAML text (`surface form: canonical_key`).
    ///
    /// Surface forms are folded (lower-cased, trimmed, inner whitespace collapsed) before
    /// they are stored, so lookups must fold the same way.
    ///
    /// # Errors
    ///
    /// - `EngineError::AliasLoad` if the YAML is not a string mapping, a surface form is
    ///   blank, or two surface forms fold to the same text with different targets
    /// - `EngineError::AliasShadowsCanonical` if a surface form is itself a canonical key,
    ///   directly or in its snake-cased spelling
    /// - `EngineError::AliasChain` if a target is another alias
    /// - `EngineError::UnknownAliasTarget` if a target is neither canonical nor an alias
    pub fn parse(yaml_text: &str, vocabulary: &Vocabulary) -> EngineResult<Self> {
        let deserializer = serde_yaml::Deserializer::from_str(yaml_text);
        let raw: BTreeMap<String, String> = match serde_path_to_error::deserialize(deserializer) {
            Ok(parsed) => parsed,
            Err(err) => {
                let path = err.path().to_string();
                let source = err.into_inner();
                let path = if path.is_empty() {
                    "<root>"
                } else {
                    path.as_str()
                };
                return Err(EngineError::AliasLoad(format!(
                    "schema mismatch at {path}: {source}"
                )));
            }
        };

        Self::from_pairs(raw, vocabulary)
    }

    pub fn load(path: &Path, vocabulary: &Vocabulary) -> EngineResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| EngineError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, vocabulary)
    }

    /// Build the table from `(surface form, target)` pairs, applying the same validation as
    /// [`AliasTable::parse`].
    pub fn from_pairs<K, V>(
        pairs: impl IntoIterator<Item = (K, V)>,
        vocabulary: &Vocabulary,
    ) -> EngineResult<Self>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut map: HashMap<String, String> = HashMap::new();

        for (surface, target) in pairs {
            let alias = fold_token(surface.as_ref());
            let target = fold_token(target.as_ref());

            if alias.is_empty() {
                return Err(EngineError::AliasLoad("alias surface form is blank".into()));
            }
            if vocabulary.contains(&alias) || vocabulary.contains(&snake_case(&alias)) {
                return Err(EngineError::AliasShadowsCanonical { alias });
            }

            match map.get(&alias) {
                Some(existing) if *existing != target => {
                    return Err(EngineError::AliasLoad(format!(
                        "alias '{alias}' maps to both '{existing}' and '{target}'"
                    )));
                }
                _ => {
                    map.insert(alias, target);
                }
            }
        }

        // Targets are checked once every alias is known so a chain is reported as a chain
        // regardless of the order the pairs arrived in.
        let mut aliases: Vec<(&String, &String)> = map.iter().collect();
        aliases.sort();
        for (alias, target) in aliases {
            if vocabulary.contains(target) {
                continue;
            }
            if map.contains_key(target) {
                return Err(EngineError::AliasChain {
                    alias: alias.clone(),
                    target: target.clone(),
                });
            }
            return Err(EngineError::UnknownAliasTarget {
                alias: alias.clone(),
                target: target.clone(),
            });
        }

        Ok(Self { map })
    }

    /// Look up an already-folded surface form.
    pub fn get(&self, folded: &str) -> Option<&str> {
        self.map.get(folded).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Alias pairs sorted by surface form.
    pub fn entries(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<(&str, &str)> = self
            .map
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        entries.sort();
        entries
    }
}
