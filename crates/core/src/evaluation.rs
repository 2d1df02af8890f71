//! Self-retrieval accuracy harness.
//!
//! Every profile's own canonical symptom set is submitted as a query for its species. A
//! well-formed knowledge base returns each profile at rank 1; Top-3 and Top-5 recall show
//! how far the misses fell.

use crate::constants::SELF_RETRIEVAL_ACCEPTANCE_RATE;
use crate::engine::{Engine, SymptomReport};
use crate::EngineResult;
use serde::Serialize;
use vet_types::Species;

const EVALUATION_DEPTH: usize = 5;

/// A profile that did not come back at rank 1 for its own symptoms.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalMiss {
    pub species: Species,
    pub disease: String,
    /// 1-based rank within the first five results, if present at all.
    pub rank: Option<usize>,
    pub ranked_first: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalReport {
    pub total: usize,
    pub top1: usize,
    pub top3: usize,
    pub top5: usize,
    pub misses: Vec<RetrievalMiss>,
}

impl RetrievalReport {
    fn rate(&self, hits: usize) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        hits as f64 / self.total as f64
    }

    pub fn top1_rate(&self) -> f64 {
        self.rate(self.top1)
    }

    pub fn top3_rate(&self) -> f64 {
        self.rate(self.top3)
    }

    pub fn top5_rate(&self) -> f64 {
        self.rate(self.top5)
    }

    pub fn meets_acceptance_bar(&self) -> bool {
        self.total > 0 && self.top1_rate() >= SELF_RETRIEVAL_ACCEPTANCE_RATE
    }
}

/// Query the engine with every profile's own symptoms and tally where it ranks.
pub fn evaluate_self_retrieval(engine: &Engine) -> EngineResult<RetrievalReport> {
    let mut report = RetrievalReport {
        total: 0,
        top1: 0,
        top3: 0,
        top5: 0,
        misses: Vec::new(),
    };

    for profile in engine.knowledge_base().iter() {
        let query = SymptomReport::new(profile.species.as_str(), profile.symptoms.iter().cloned());
        let diagnosis = engine.diagnose(&query, Some(EVALUATION_DEPTH))?;

        let rank = diagnosis
            .top_matches
            .iter()
            .position(|r| r.disease.folded() == profile.disease.folded())
            .map(|i| i + 1);

        report.total += 1;
        match rank {
            Some(1) => report.top1 += 1,
            _ => report.misses.push(RetrievalMiss {
                species: profile.species,
                disease: profile.disease.to_string(),
                rank,
                ranked_first: diagnosis.top_matches.first().map(|r| r.disease.to_string()),
            }),
        }
        if matches!(rank, Some(r) if r <= 3) {
            report.top3 += 1;
        }
        if rank.is_some() {
            report.top5 += 1;
        }
    }

    tracing::info!(
        total = report.total,
        top1 = report.top1,
        top3 = report.top3,
        top5 = report.top5,
        "self-retrieval evaluation"
    );
    for miss in &report.misses {
        tracing::warn!(species = %miss.species, disease = %miss.disease, rank = ?miss.rank, "self-retrieval miss");
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engine::EngineSources;
    use crate::normalizer::test_support::{BUNDLED_ALIASES, BUNDLED_VOCABULARY};
    use std::path::PathBuf;

    fn engine_for(knowledge_base: &str) -> Engine {
        Engine::from_sources(
            EngineConfig::with_defaults(PathBuf::from("data")),
            EngineSources {
                vocabulary: BUNDLED_VOCABULARY,
                aliases: BUNDLED_ALIASES,
                knowledge_base,
            },
        )
        .expect("engine builds")
    }

    #[test]
    fn identical_symptom_sets_are_reported_as_misses() {
        // Identical symptom sets can only be separated by name order.
        let engine = engine_for(
            r#"
- species: Dog
  disease: Gastritis
  symptoms: vomiting, lethargy
  urgency: mild
  contagious: "no"
  source: test
- species: Dog
  disease: Acid reflux
  symptoms: vomiting, lethargy
  urgency: mild
  contagious: "no"
  source: test
- species: Cat
  disease: Hairballs
  symptoms: vomiting, coughing
  urgency: low
  contagious: "no"
  source: test
"#,
        );

        let report = evaluate_self_retrieval(&engine).expect("evaluation runs");
        assert_eq!(report.total, 3);
        assert_eq!(report.top1, 2);
        assert_eq!(report.top3, 3);
        assert_eq!(report.top5, 3);
        assert_eq!(
            report.misses,
            vec![RetrievalMiss {
                species: Species::Dog,
                disease: "Gastritis".into(),
                rank: Some(2),
                ranked_first: Some("Acid reflux".into()),
            }]
        );
        assert!(!report.meets_acceptance_bar());
    }

    #[test]
    fn rates_are_fractions_of_total() {
        let report = RetrievalReport {
            total: 20,
            top1: 19,
            top3: 20,
            top5: 20,
            misses: Vec::new(),
        };
        assert_eq!(report.top1_rate(), 0.95);
        assert!(report.meets_acceptance_bar());

        let empty = RetrievalReport {
            total: 0,
            top1: 0,
            top3: 0,
            top5: 0,
            misses: Vec::new(),
        };
        assert_eq!(empty.top1_rate(), 0.0);
        assert!(!empty.meets_acceptance_bar());
    }
}
