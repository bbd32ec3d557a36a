//! Class Generator CLI
//!
//! Builds the class model for a schema tree and emits code from it.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use json_schema_classgen::{generate_with_config, inspect, EmitTarget, GeneratorConfig, SemanticType};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "classgen")]
#[command(about = "Generate classes from JSON Schema documents")]
struct Cli {
    /// Config file (layered over classgen.toml and CLASSGEN__* variables)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the class model and emit it
    Generate {
        /// Schema source directory
        #[arg(short, long)]
        source: Option<PathBuf>,
        /// Output directory
        #[arg(short, long)]
        destination: Option<PathBuf>,
        /// Output target
        #[arg(short, long, value_enum)]
        target: Option<EmitTarget>,
    },

    /// Build the class model and print it without writing anything
    Inspect {
        /// Schema source directory
        #[arg(short, long)]
        source: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config =
        GeneratorConfig::load_from(cli.config.as_deref()).context("failed to load configuration")?;

    match cli.command {
        Commands::Generate {
            source,
            destination,
            target,
        } => {
            if let Some(source) = source {
                config.source_path = source;
            }
            if let Some(destination) = destination {
                config.destination_path = destination;
            }
            if let Some(target) = target {
                config.target = target;
            }

            println!("🏗️  Generating classes");
            println!("  Source: {:?}", config.source_path);
            println!("  Destination: {:?}", config.destination_path);
            println!("  Target: {}", config.target);
            println!();

            let report = generate_with_config(&config)?;

            println!("✅ Generated {} classes from {} documents", report.classes, report.documents);
            for file in &report.emitted.files {
                println!("  📄 {}", file.display());
            }
            println!();
            println!("  Fingerprint: {}", report.fingerprint);
        }

        Commands::Inspect { source } => {
            let source = source.unwrap_or(config.source_path);
            let model = inspect(&source)?;

            println!("🔍 Class model for {:?} ({} classes)", source, model.len());
            for id in model.emission_order() {
                let Some(class) = model.get(id) else {
                    continue;
                };
                println!();
                println!("📦 {}", class.name);
                println!("  $id: {}", id);
                print_fields(class, 1);
            }
            println!();
            println!("  Fingerprint: {}", model.fingerprint()?);
        }
    }

    Ok(())
}

fn print_fields(class: &json_schema_classgen::ClassDefinition, depth: usize) {
    let indent = "  ".repeat(depth);
    for field in &class.fields {
        let constraints: Vec<String> = field.constraints.iter().map(|c| c.to_string()).collect();
        let marker = if field.required { "*" } else { " " };
        let list_note = match &field.semantic_type {
            SemanticType::List(_) => " = []",
            _ => "",
        };
        if constraints.is_empty() {
            println!("{}{} {}: {}{}", indent, marker, field.name, field.semantic_type, list_note);
        } else {
            println!(
                "{}{} {}: {}{} [{}]",
                indent,
                marker,
                field.name,
                field.semantic_type,
                list_note,
                constraints.join(", ")
            );
        }
    }
    for nested in &class.nested_classes {
        println!("{}└─ {}", indent, nested.name.simple_name());
        print_fields(nested, depth + 1);
    }
}
