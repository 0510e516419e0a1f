//! Plait CLI: contribution graph engine.
//!
//! Usage:
//!   plait context <create|list|delete|show> [--db path]
//!   plait ingest <context> <file.json>
//!   plait retract <context> <producer> [--edge SOURCE RELATIONSHIP TARGET]
//!   plait step <context> <origin> --step out:rel [--step in:rel ...]
//!   plait trail <context> <node>

use clap::{Parser, Subcommand};
use plait::adapter::EDGE_LIST_KIND;
use plait::{Direction, EngineConfig, FindQuery, PlaitApi, StepQuery};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "plait", version, about = "Contribution graph engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Path to SQLite database file
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Path to a YAML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Enrichment loop round cap
    #[arg(long, global = true)]
    max_rounds: Option<usize>,
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage contexts
    Context {
        #[command(subcommand)]
        action: ContextAction,
    },
    /// Ingest an edge-list JSON file into a context
    Ingest {
        /// Context name or id
        context: String,
        /// JSON file with `nodes` and `edges`
        file: PathBuf,
    },
    /// Retract a producer's contributions
    Retract {
        /// Context name or id
        context: String,
        /// Producer id to retract
        producer: String,
        /// Only retract from this one edge
        #[arg(long, num_args = 3, value_names = ["SOURCE", "RELATIONSHIP", "TARGET"])]
        edge: Option<Vec<String>>,
    },
    /// Typed multi-hop traversal
    Step {
        /// Context name or id
        context: String,
        /// Origin node id
        origin: String,
        /// A step as `out:relationship` or `in:relationship`; repeat to chain
        #[arg(long = "step", required = true)]
        steps: Vec<String>,
        /// Ignore edges whose raw weight is below this value
        #[arg(long)]
        min_weight: Option<f64>,
    },
    /// Evidence trail for a concept: marks, chains and fragments
    Trail {
        /// Context name or id
        context: String,
        /// Concept node id
        node: String,
    },
    /// Find nodes by type or dimension
    Find {
        /// Context name or id
        context: String,
        #[arg(long = "type")]
        node_type: Option<String>,
        #[arg(long)]
        dimension: Option<String>,
        /// Only nodes touching an edge this producer contributed to
        #[arg(long)]
        producer: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print every edge with its contributions as JSON
    Export {
        /// Context name or id
        context: String,
    },
}

#[derive(Subcommand)]
enum ContextAction {
    /// Create a new context
    Create {
        /// Name for the new context
        name: String,
    },
    /// Delete a context by name
    Delete {
        /// Name of the context to delete
        name: String,
    },
    /// List all contexts
    List,
    /// Show one context
    Show {
        /// Name of the context
        name: String,
    },
}

/// Get the default database path (~/.local/share/plait/plait.db)
fn default_db_path() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    data_dir.join("plait").join("plait.db")
}

fn load_config(cli: &Cli) -> Result<EngineConfig, String> {
    let mut config = match cli.config {
        Some(ref path) => EngineConfig::load(path).map_err(|e| format!("Failed to load config: {}", e))?,
        None => EngineConfig::default(),
    };
    if let Some(ref db) = cli.db {
        config.db_path = Some(db.clone());
    }
    if config.db_path.is_none() {
        config.db_path = Some(default_db_path());
    }
    if let Some(rounds) = cli.max_rounds {
        config.max_enrichment_rounds = rounds;
    }
    if cli.verbose {
        config.log_level = "debug".to_string();
    }
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn init_logging(level: &str) {
    let level = level.parse::<tracing::Level>().unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn parse_step(spec: &str) -> Result<(Direction, String), String> {
    let (direction, relationship) = spec
        .split_once(':')
        .ok_or_else(|| format!("step '{}' must look like out:relationship", spec))?;
    if relationship.is_empty() {
        return Err(format!("step '{}' has no relationship", spec));
    }
    Ok((direction.parse()?, relationship.to_string()))
}

fn cmd_context(api: &PlaitApi, action: ContextAction) -> i32 {
    match action {
        ContextAction::Create { name } => match api.context_create(&name) {
            Ok(id) => {
                println!("Created context '{}' ({})", name, id);
                0
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        },
        ContextAction::Delete { name } => match api.context_delete(&name) {
            Ok(()) => {
                println!("Deleted context '{}'", name);
                0
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        },
        ContextAction::List => {
            let infos = match api.context_list() {
                Ok(infos) => infos,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return 1;
                }
            };
            if infos.is_empty() {
                println!("No contexts defined.");
                return 0;
            }
            println!("{:<36}  {:<24}  {:>7}  {:>7}", "ID", "NAME", "NODES", "EDGES");
            println!("{}", "-".repeat(80));
            for info in infos {
                println!(
                    "{:<36}  {:<24}  {:>7}  {:>7}",
                    info.id, info.name, info.node_count, info.edge_count
                );
            }
            0
        }
        ContextAction::Show { name } => match api.context_info(&name) {
            Ok(info) => print_json(&info),
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        },
    }
}

async fn cmd_ingest(api: &PlaitApi, context: &str, file: &Path) -> i32 {
    let json = match std::fs::read_to_string(file) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Error: cannot read '{}': {}", file.display(), e);
            return 1;
        }
    };
    match api.ingest(context, EDGE_LIST_KIND, Box::new(json)).await {
        Ok(outcome) => {
            for event in &outcome.outbound {
                println!("{:<16} {}", event.kind, event.detail);
            }
            for (producer, err) in &outcome.failures {
                eprintln!("Warning: {} failed: {}", producer, err);
            }
            println!(
                "{} event(s), {} enrichment round(s){}",
                outcome.events.len(),
                outcome.rounds,
                if outcome.quiesced { "" } else { ", round cap reached" }
            );
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_retract(api: &PlaitApi, context: &str, producer: &str, edge: Option<Vec<String>>) -> i32 {
    let result = match edge.as_deref() {
        Some([source, relationship, target]) => api
            .retract_contribution(context, source, relationship, target, producer)
            .map(|events| if events.is_empty() { 0 } else { 1 }),
        Some(_) => {
            eprintln!("Error: --edge takes SOURCE RELATIONSHIP TARGET");
            return 1;
        }
        None => api
            .retract_contributions(context, producer)
            .map(|r| r.edges_affected),
    };
    match result {
        Ok(affected) => {
            println!("Retracted '{}' from {} edge(s)", producer, affected);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_step(api: &PlaitApi, context: &str, origin: &str, steps: &[String], min_weight: Option<f64>) -> i32 {
    let mut query = StepQuery::from(origin);
    if let Some(threshold) = min_weight {
        query = query.min_weight(threshold);
    }
    for spec in steps {
        match parse_step(spec) {
            Ok((direction, relationship)) => query = query.step(direction, relationship),
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        }
    }
    match api.step(context, &query) {
        Ok(result) => print_json(&result),
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    init_logging(&config.log_level);

    let api = match PlaitApi::from_config(&config) {
        Ok(api) => api,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let code = match cli.command {
        Commands::Context { action } => cmd_context(&api, action),
        Commands::Ingest { context, file } => cmd_ingest(&api, &context, &file).await,
        Commands::Retract { context, producer, edge } => cmd_retract(&api, &context, &producer, edge),
        Commands::Step { context, origin, steps, min_weight } => {
            cmd_step(&api, &context, &origin, &steps, min_weight)
        }
        Commands::Trail { context, node } => match api.evidence_trail(&context, &node) {
            Ok(trail) => print_json(&trail),
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        },
        Commands::Find { context, node_type, dimension, producer, limit } => {
            let mut query = FindQuery::new();
            if let Some(t) = node_type {
                query = query.with_node_type(t);
            }
            if let Some(d) = dimension {
                query = query.with_dimension(d);
            }
            if let Some(p) = producer {
                query = query.supported_by(p);
            }
            if let Some(l) = limit {
                query = query.limit(l);
            }
            match api.find_nodes(&context, &query) {
                Ok(result) => print_json(&result),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    1
                }
            }
        }
        Commands::Export { context } => match api.export_edges(&context) {
            Ok(edges) => print_json(&edges),
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        },
    };
    std::process::exit(code);
}
