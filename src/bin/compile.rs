//! Schema Compiler CLI
//!
//! Compiles the definitions of an OpenAPI/Swagger document and prints the
//! resulting document-store schemas as JSON.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docstore_schemas::{CompilerConfig, Compiler, Document, OutputFormat, ReferenceGraph};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "docstore-compile")]
#[command(about = "Compile OpenAPI/Swagger definitions into document-store schemas")]
struct Cli {
    /// Extra configuration file, applied over docstore.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile every definition (or one) and print the schemas
    Compile {
        /// OpenAPI/Swagger document (JSON)
        input: PathBuf,
        /// Only compile this definition
        #[arg(short, long)]
        definition: Option<String>,
        /// Write output to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Single-line JSON output
        #[arg(long)]
        compact: bool,
    },

    /// List definition names
    Definitions {
        input: PathBuf,
    },

    /// Report self references, indirect cycles and dangling pointers
    Cycles {
        input: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref().and_then(|p| p.to_str());
    let config = CompilerConfig::load_from(config_path).context("Failed to load configuration")?;
    let compiler = Compiler::from_config(&config);

    match cli.command {
        Commands::Compile {
            input,
            definition,
            output,
            compact,
        } => {
            let document = read_document(&input)?;

            let json = match definition {
                Some(name) => {
                    let definitions = compiler
                        .extract_definitions(document)
                        .with_context(|| format!("No definitions in {}", input.display()))?;
                    compiler
                        .build_schema(&definitions, &name)
                        .with_context(|| format!("Failed to compile definition {}", name))?
                        .to_json()
                }
                None => {
                    let compiled = compiler
                        .compile(document)
                        .with_context(|| format!("Failed to compile {}", input.display()))?;
                    tracing::info!(models = compiled.models.len(), "compiled document");
                    Value::Object(
                        compiled
                            .schemas
                            .into_iter()
                            .map(|(name, schema)| (name, schema.to_json()))
                            .collect(),
                    )
                }
            };

            let format = if compact {
                OutputFormat::Compact
            } else {
                config.output.format
            };
            let rendered = match format {
                OutputFormat::Pretty => serde_json::to_string_pretty(&json)?,
                OutputFormat::Compact => serde_json::to_string(&json)?,
            };

            match output {
                Some(path) => {
                    std::fs::write(&path, rendered + "\n")
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    eprintln!("✅ Wrote {}", path.display());
                }
                None => println!("{}", rendered),
            }
            Ok(())
        }

        Commands::Definitions { input } => {
            let definitions = compiler.extract_definitions(read_document(&input)?)?;
            for name in definitions.keys() {
                println!("{}", name);
            }
            Ok(())
        }

        Commands::Cycles { input } => {
            let definitions = compiler.extract_definitions(read_document(&input)?)?;
            let extension_key = &compiler.settings().extension_key;
            let graph = ReferenceGraph::from_definitions(&definitions, extension_key);

            let cycles = graph.indirect_cycles();
            let self_refs: Vec<&str> = graph.self_referencing().collect();

            if !self_refs.is_empty() {
                println!("🔁 Self references (stored as ids):");
                for name in &self_refs {
                    println!("  {}", name);
                }
            }

            for dangling in graph.dangling() {
                println!("⚠️  {} -> {} (unresolved)", dangling.from, dangling.pointer);
            }

            if cycles.is_empty() {
                println!("✅ No indirect reference cycles");
            } else {
                println!("❌ {} indirect cycle(s):", cycles.len());
                for cycle in &cycles {
                    println!("  {}", cycle.join(" -> "));
                }
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

fn read_document(path: &Path) -> Result<Document> {
    Document::from_path(path).with_context(|| format!("Failed to read {}", path.display()))
}
