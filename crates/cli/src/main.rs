use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vet_types::Species;
use vetmatch_core::config::{
    resolve_data_dir, semantic_weight_from_env_value, timeout_from_env_value,
    top_n_from_env_value,
};
use vetmatch_core::{
    evaluate_self_retrieval, DiagnosisReport, Engine, EngineConfig, SymptomReport,
    TokenOverlapSimilarity,
};

#[derive(Parser)]
#[command(name = "vetmatch")]
#[command(about = "Veterinary symptom-to-diagnosis matching CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Similarity {
    /// Structured scoring only
    None,
    /// Word-overlap similarity between free text and each disease profile
    TokenOverlap,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank candidate diseases for a set of symptoms
    Diagnose {
        /// Species (e.g. dog, cat, rabbit)
        species: String,
        /// Reported symptoms, as canonical keys or plain words
        symptoms: Vec<String>,
        /// Number of matches to return (1-100)
        #[arg(long)]
        top: Option<usize>,
        /// Owner's free-text description
        #[arg(long)]
        free_text: Option<String>,
        /// Semantic similarity backend used with --free-text
        #[arg(long, value_enum, default_value_t = Similarity::None)]
        similarity: Similarity,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show how tokens map onto the canonical vocabulary
    Normalize {
        /// Tokens to normalize
        #[arg(required = true)]
        tokens: Vec<String>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Suggest follow-up questions for a set of symptoms
    Questions {
        /// Species (e.g. dog, cat, rabbit)
        species: String,
        /// Reported symptoms
        #[arg(required = true)]
        symptoms: Vec<String>,
        /// Number of questions to return
        #[arg(long)]
        limit: Option<usize>,
        /// Print the questions as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run the self-retrieval accuracy harness over the knowledge base
    Evaluate {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run the urgency safety audit and print the knowledge base load report
    Audit {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// List supported species and their profile counts
    Species,
}

/// Resolve engine configuration from the process environment.
///
/// # Environment Variables
/// - `VETMATCH_DATA_DIR`: directory holding the reference data files
/// - `VETMATCH_DEFAULT_TOP_N`: matches returned when `--top` is not given (default: 5)
/// - `VETMATCH_SIMILARITY_TIMEOUT_MS`: budget for semantic scoring (default: 800)
/// - `VETMATCH_SEMANTIC_WEIGHT`: share of the semantic signal in blended scores (default: 0.3)
fn config_from_env() -> anyhow::Result<EngineConfig> {
    let data_dir = resolve_data_dir(std::env::var("VETMATCH_DATA_DIR").ok().map(PathBuf::from))?;
    let top_n = top_n_from_env_value(std::env::var("VETMATCH_DEFAULT_TOP_N").ok())?;
    let timeout = timeout_from_env_value(std::env::var("VETMATCH_SIMILARITY_TIMEOUT_MS").ok())?;
    let weight = semantic_weight_from_env_value(std::env::var("VETMATCH_SEMANTIC_WEIGHT").ok())?;
    Ok(EngineConfig::new(data_dir, top_n, timeout, weight)?)
}

fn load_engine() -> anyhow::Result<Engine> {
    let config = config_from_env()?;
    let data_dir = config.data_dir().to_path_buf();
    tracing::debug!(data_dir = %data_dir.display(), "loading reference data");
    Engine::load(config)
        .with_context(|| format!("failed to load reference data from {}", data_dir.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_diagnosis(diagnosis: &DiagnosisReport) {
    println!(
        "{}: {}",
        diagnosis.species,
        diagnosis.canonical_symptoms.join(", ")
    );
    for warning in &diagnosis.warnings {
        println!("  warning: {warning}");
    }
    if !diagnosis.red_flags.is_empty() {
        println!("  RED FLAGS: {}", diagnosis.red_flags.join(", "));
    }
    if diagnosis.top_matches.is_empty() {
        println!("No matching diseases found.");
        return;
    }
    for (rank, result) in diagnosis.top_matches.iter().enumerate() {
        println!(
            "{:>2}. {:<40} score {:>5.1}  coverage {:>5.1}  urgency {:<9}{}",
            rank + 1,
            result.disease.as_str(),
            result.match_score,
            result.user_coverage,
            result.urgency.as_str(),
            if result.contagious { "  contagious" } else { "" }
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("vetmatch=info".parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Diagnose {
            species,
            symptoms,
            top,
            free_text,
            similarity,
            json,
        } => {
            let mut engine = load_engine()?;
            if let Similarity::TokenOverlap = similarity {
                engine = engine.with_similarity(Arc::new(TokenOverlapSimilarity));
            }

            let mut report = SymptomReport::new(species, symptoms);
            report.free_text = free_text;
            let diagnosis = engine.diagnose_with_similarity(&report, top).await?;

            if json {
                print_json(&diagnosis)?;
            } else {
                print_diagnosis(&diagnosis);
            }
        }
        Commands::Normalize { tokens, json } => {
            let engine = load_engine()?;
            let normalized = engine.normalize(&tokens);
            if json {
                print_json(&normalized)?;
            } else {
                for token in &tokens {
                    match engine.normalizer().resolve_token(token) {
                        Some(resolution) => {
                            println!("{token:?} -> {} ({:?})", resolution.key, resolution.stage)
                        }
                        None if token.trim().is_empty() => {}
                        None => println!("{token:?} -> unmapped"),
                    }
                }
            }
        }
        Commands::Questions {
            species,
            symptoms,
            limit,
            json,
        } => {
            let engine = load_engine()?;
            let diagnosis = engine.diagnose(&SymptomReport::new(species, symptoms), None)?;
            let questions = engine.next_questions(&diagnosis, limit);
            if json {
                print_json(&questions)?;
            } else if questions.is_empty() {
                println!("No follow-up questions.");
            } else {
                for question in questions {
                    println!("- {} [{}]", question.question, question.symptom);
                }
            }
        }
        Commands::Evaluate { json } => {
            let engine = load_engine()?;
            let report = evaluate_self_retrieval(&engine)?;
            if json {
                print_json(&report)?;
            } else {
                println!("Profiles: {}", report.total);
                println!("Top-1:    {:.1}%", 100.0 * report.top1_rate());
                println!("Top-3:    {:.1}%", 100.0 * report.top3_rate());
                println!("Top-5:    {:.1}%", 100.0 * report.top5_rate());
                for miss in &report.misses {
                    println!(
                        "  miss: {} / {} (rank {}, first: {})",
                        miss.species,
                        miss.disease,
                        miss.rank.map_or("-".to_string(), |r| r.to_string()),
                        miss.ranked_first.as_deref().unwrap_or("-")
                    );
                }
            }
            if !report.meets_acceptance_bar() {
                anyhow::bail!(
                    "top-1 self-retrieval {:.1}% is below the acceptance bar",
                    100.0 * report.top1_rate()
                );
            }
        }
        Commands::Audit { json } => {
            let engine = load_engine()?;
            let violations = engine.audit();
            let load_report = engine.load_report();
            if json {
                print_json(&serde_json::json!({
                    "violations": violations,
                    "loadReport": load_report,
                }))?;
            } else {
                println!("Fingerprint: {}", load_report.fingerprint);
                println!("Loaded at:   {}", load_report.loaded_at.to_rfc3339());
                println!(
                    "Accepted: {}  Skipped: {}  Unmapped tokens: {}",
                    load_report.accepted,
                    load_report.skipped.len(),
                    load_report.unmapped_tokens.len()
                );
                for skipped in &load_report.skipped {
                    println!("  skipped #{} {}: {}", skipped.index, skipped.disease, skipped.reason);
                }
                for relaxed in &load_report.relaxed {
                    println!(
                        "  relaxed {} / {}: {} -> {}",
                        relaxed.species, relaxed.disease, relaxed.from, relaxed.to
                    );
                }
                for group in &load_report.indistinguishable {
                    println!(
                        "  indistinguishable in {}: {}",
                        group.species,
                        group.diseases.join(", ")
                    );
                }
                if violations.is_empty() {
                    println!("Urgency audit: clean");
                }
                for violation in &violations {
                    println!("  VIOLATION {violation}");
                }
            }
            if !violations.is_empty() {
                anyhow::bail!("urgency audit found {} violation(s)", violations.len());
            }
        }
        Commands::Species => {
            let engine = load_engine()?;
            for species in Species::ALL {
                println!(
                    "{:<8} {:>3} profile(s)",
                    species.as_str(),
                    engine.knowledge_base().diseases_for_species(species).len()
                );
            }
        }
    }

    Ok(())
}
