//! Type Registry CLI
//!
//! Loads type definitions into a registry and queries custom property schemas.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use type_registry::{RegistryConfig, Type, TypeRegistry};

#[derive(Parser)]
#[command(name = "type-registry")]
#[command(about = "Load catalog types and inspect custom property schemas")]
struct Cli {
    /// Config file to load (optional)
    #[arg(short, long)]
    config: Option<String>,

    /// JSON file holding an array of type definitions, loaded in order
    #[arg(short, long)]
    types: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the types and list them with their custom properties
    Check,

    /// Print the schema of a custom property
    Schema {
        /// Entity type name
        entity_type: String,
        /// Custom property name
        property: String,
    },

    /// Validate a JSON value against a custom property schema
    Validate {
        /// Entity type name
        entity_type: String,
        /// Custom property name
        property: String,
        /// Value as JSON (e.g. '"data-team"' or '42')
        value: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = match RegistryConfig::load_from(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli, &config) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn load_types(registry: &TypeRegistry, path: &Path) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let types: Vec<Type> = serde_json::from_str(&content)
        .with_context(|| format!("parsing {}", path.display()))?;

    for ty in types {
        let name = ty.name.clone();
        registry
            .validate_and_add_type(ty)
            .with_context(|| format!("loading type {}", name))?;
    }
    Ok(())
}

fn run(cli: Cli, config: &RegistryConfig) -> anyhow::Result<()> {
    let registry = TypeRegistry::with_config(config)?;
    load_types(&registry, &cli.types)?;

    match cli.command {
        Commands::Check => {
            println!("✅ Loaded {} types", registry.len());
            for name in registry.type_names() {
                println!("  {}", name);
                for (property, definition) in registry.custom_properties_of(&name) {
                    println!("    {} -> {}", property, definition.property_type.name);
                }
            }
        }

        Commands::Schema { entity_type, property } => {
            let schema = registry.get_schema(&entity_type, &property)?;
            println!("{}", serde_json::to_string_pretty(schema.source())?);
        }

        Commands::Validate { entity_type, property, value } => {
            let value: serde_json::Value =
                serde_json::from_str(&value).context("value is not valid JSON")?;
            let schema = registry.get_schema(&entity_type, &property)?;
            match schema.validate(&value) {
                Ok(()) => println!("✅ Valid {} value", schema.type_name()),
                Err(errors) => {
                    println!("❌ Invalid {} value", schema.type_name());
                    for error in &errors {
                        println!("  - {}", error);
                    }
                    bail!("{} validation error(s)", errors.len());
                }
            }
        }
    }

    Ok(())
}
