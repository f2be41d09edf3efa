//! dex: command-line front end for the dexcache facade
//!
//! Every command prints JSON on stdout.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dexcache::api::{Dex, EvolutionStage, generations};
use dexcache::{BlobStore, Config, FileBlobStore, Identifier, QuizRecord};
use serde_json::json;

/// dexcache CLI
#[derive(Parser)]
#[command(name = "dex")]
#[command(version = dexcache::version::version_string())]
#[command(about = "Cached creature-database lookups")]
struct Args {
    /// Config file (default: ~/.dexcache/config.toml, then /etc/dexcache/config.toml)
    #[arg(short, long, env = "DEXCACHE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show a pokemon with its species and evolution chain
    Show {
        /// National dex number or name
        pokemon: String,
    },

    /// Show the flattened evolution chain of a pokemon
    Evolution {
        /// National dex number or name
        pokemon: String,
    },

    /// List pokemon names page by page
    List {
        /// Number of pages to load
        #[arg(short, long, default_value_t = 1)]
        pages: usize,
    },

    /// List pokemon of one type page by page
    Type {
        /// Type name (e.g. "fire")
        name: String,
        /// Number of pages to load
        #[arg(short, long, default_value_t = 1)]
        pages: usize,
    },

    /// Display names for a generation
    Names {
        /// Generation 1-9 (omit for all)
        #[arg(short, long)]
        generation: Option<u8>,
    },

    /// Show or change persisted quiz statistics
    Stats {
        /// Zero the counters (best streak is kept)
        #[arg(long)]
        reset: bool,
        /// Set the quiz generation: 1-9 or "all"
        #[arg(long)]
        generation: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn; override with DEXCACHE_LOG or RUST_LOG).
    let filter = tracing_subscriber::EnvFilter::try_from_env("DEXCACHE_LOG")
        .or_else(|_| tracing_subscriber::EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;
    let dex = Dex::with_options(config.dex_options())?;

    let output = match args.command {
        Command::Show { pokemon } => {
            let detail = dex.detail(Identifier::parse(&pokemon)).await?;
            let stages = detail
                .evolution
                .as_ref()
                .map(|chain| chain.stages())
                .unwrap_or_default();
            json!({
                "id": detail.pokemon.id,
                "name": dexcache::api::format_name(&detail.pokemon.name),
                "number": dexcache::api::format_id(detail.pokemon.id),
                "types": detail.pokemon.type_names(),
                "height_m": f64::from(detail.pokemon.height) / 10.0,
                "weight_kg": f64::from(detail.pokemon.weight) / 10.0,
                "genus": detail.species.english_genus(),
                "description": detail.species.english_flavor_text(),
                "gender": detail.species.gender_ratio(),
                "egg_groups": detail.species.egg_group_names(),
                "stats": detail.pokemon.stats.iter()
                    .map(|s| (s.stat.name.clone(), s.base_stat))
                    .collect::<std::collections::BTreeMap<_, _>>(),
                "evolution": stages,
            })
        }
        Command::Evolution { pokemon } => {
            let species = dex.species(Identifier::parse(&pokemon)).await?;
            let stages: Vec<EvolutionStage> = match species.evolution_chain_id() {
                Some(id) => dex.evolution_chain(id).await?.stages(),
                None => Vec::new(),
            };
            serde_json::to_value(stages)?
        }
        Command::List { pages } => {
            let mut sequence = dex.pokemon_pages()?;
            sequence.load_pages(pages).await?;
            json!({
                "items": sequence.items().iter().map(|r| &r.name).collect::<Vec<_>>(),
                "has_next_page": sequence.has_next_page(),
            })
        }
        Command::Type { name, pages } => {
            let mut sequence = dex.type_pages(&name).await?;
            sequence.load_pages(pages).await?;
            let details = dex.page_details(sequence.items()).await?;
            json!({
                "type": name,
                "pokemon": details.iter().map(|p| json!({
                    "id": p.id,
                    "name": p.name,
                    "types": p.type_names(),
                })).collect::<Vec<_>>(),
                "has_next_page": sequence.has_next_page(),
            })
        }
        Command::Names { generation } => {
            let names = dex.names_for_generation(generation).await?;
            json!({
                "generation": generation,
                "count": names.len(),
                "names": names,
            })
        }
        Command::Stats { reset, generation } => {
            let store = FileBlobStore::new(config.storage.resolved_dir());
            stats(&store, reset, generation.as_deref())?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn stats(
    store: &dyn BlobStore,
    reset: bool,
    generation: Option<&str>,
) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let mut record = QuizRecord::load(store);
    let mut changed = false;

    if reset {
        record.reset_counters();
        changed = true;
    }
    if let Some(raw) = generation {
        record.generation = parse_generation(raw)?;
        changed = true;
    }
    if changed {
        record.save(store)?;
    }

    let label = record
        .generation
        .and_then(generations::generation)
        .map(|g| g.label())
        .unwrap_or_else(|| "All Generations".to_string());
    Ok(json!({
        "score": record.score,
        "best_streak": record.best_streak,
        "total_rounds": record.total_rounds,
        "correct_answers": record.correct_answers,
        "accuracy": record.accuracy(),
        "generation": record.generation,
        "generation_label": label,
    }))
}

fn parse_generation(raw: &str) -> Result<Option<u8>, String> {
    if raw.eq_ignore_ascii_case("all") {
        return Ok(None);
    }
    match raw.parse::<u8>() {
        Ok(n) if generations::generation(n).is_some() => Ok(Some(n)),
        _ => Err(format!("unknown generation {raw:?}; expected 1-9 or \"all\"")),
    }
}
