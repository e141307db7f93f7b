//! Request Types CLI
//!
//! Parses untyped values, resolves schema references, validates JSON against
//! schema definitions and checks schema documents for reference problems.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use request_types::{parse_json, parse_value, JsonKind, ReferenceGraph, SchemaStore, TypesConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "request-types")]
#[command(about = "Coerce request values and check schema documents")]
struct Cli {
    /// Configuration file (defaults to request-types.toml lookup)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse an untyped string as the first allowed JSON kind
    Parse {
        value: String,
        /// Allowed kinds, comma separated
        #[arg(short, long, value_delimiter = ',', default_value = "string")]
        allowed: Vec<String>,
    },

    /// Resolve a reference within a schema file
    Resolve {
        schema: PathBuf,
        /// Reference, e.g. `#/definitions/user` or `common.yaml#/definitions/auth`
        reference: String,
    },

    /// Validate a JSON value against one definition of a schema file
    Validate {
        schema: PathBuf,
        definition: String,
        json: String,
    },

    /// Report reference cycles and unresolvable definitions
    Check { schema: PathBuf },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = TypesConfig::load_from(cli.config.as_deref()).context("loading configuration")?;
    let store = SchemaStore::from_config(&config);

    match cli.command {
        Commands::Parse { value, allowed } => {
            let allowed = allowed
                .iter()
                .map(|kind| kind.trim().parse::<JsonKind>())
                .collect::<request_types::Result<Vec<_>>>()?;
            let (kind, parsed) = parse_value(&value, &allowed, "value")?;
            println!("{kind}: {parsed}");
            Ok(())
        }

        Commands::Resolve { schema, reference } => {
            let schema = store.load(&schema)?;
            let node = schema.resolve(&reference)?;
            println!("{}", serde_json::to_string_pretty(&node)?);
            Ok(())
        }

        Commands::Validate {
            schema,
            definition,
            json,
        } => {
            let definition = store.definition_type(&schema, &definition)?;
            let value = parse_json(&json)?;
            match definition.validate(&value) {
                Ok(value) => {
                    println!("✅ {}: {value}", definition.description());
                    Ok(())
                }
                Err(e) => {
                    println!("❌ {}", definition.description());
                    println!("{}", serde_json::to_string_pretty(e.detail())?);
                    std::process::exit(1);
                }
            }
        }

        Commands::Check { schema: path } => {
            let schema = store.load(&path)?;
            println!("🔍 Checking {}", path.display());

            let graph = ReferenceGraph::from_schema(&schema);
            println!(
                "  {} definitions, {} references",
                graph.node_count(),
                graph.edge_count()
            );

            let mut failed = false;
            for cycle in graph.cycles() {
                let chain = cycle.members.join(" -> ");
                if cycle.alias_only {
                    println!("  ❌ alias cycle: {chain}");
                    failed = true;
                } else {
                    println!("  ℹ️  recursive definitions: {chain}");
                }
            }

            for name in schema.definition_names() {
                let pointer = name.replace('~', "~0").replace('/', "~1");
                if let Err(e) = schema.resolve(&format!("#/definitions/{pointer}")) {
                    println!("  ❌ {name}: {e}");
                    failed = true;
                }
            }

            if failed {
                std::process::exit(1);
            }
            println!("  ✅ all definitions resolve");
            Ok(())
        }
    }
}
