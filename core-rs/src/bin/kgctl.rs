//! kgctl - building-platform JSON to knowledge graph
//!
//! Command-line interface over the pipeline stages

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;

use kgctl_core::artifact;
use kgctl_core::config::{EngineKind, PipelineConfig, PlatformConfig};
use kgctl_core::controller;
use kgctl_core::ontology::{ClassSuggestion, OntologyIndex, TermKind};
use kgctl_core::preprocess;
use kgctl_core::reason;
use kgctl_core::rml::{self, RmlGenerator};
use kgctl_core::rnr::{self, RnrBuilder, RnrDocument};
use kgctl_core::suggest::{IndexSuggester, SuggestionService};

#[derive(Parser)]
#[command(name = "kgctl")]
#[command(version = kgctl_core::VERSION)]
#[command(about = "Building-platform JSON to ontology-aligned knowledge graph", long_about = None)]
struct Cli {
    /// Debug-level logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Pipeline config (YAML); command-line flags override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a platform JSON dump and synthesize extra nodes
    Preprocess {
        #[arg(long)]
        input: PathBuf,
        /// Platform config JSON (ID_KEY, TYPE_KEYS, JSONPATH_EXTRA_NODES)
        #[arg(long)]
        platform: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
    /// Build the RNR document from preprocessed JSON
    BuildRnr {
        #[arg(long)]
        input: PathBuf,
        /// Ontology file or directory (repeatable)
        #[arg(long = "ontology")]
        ontologies: Vec<PathBuf>,
        #[arg(long)]
        output: PathBuf,
        /// Replace an existing RNR document
        #[arg(long)]
        force: bool,
        /// Only JSON strings can reference ids
        #[arg(long)]
        strict_ids: bool,
    },
    /// Generate the RML mapping from a reviewed RNR document
    GenerateRml {
        #[arg(long)]
        rnr: PathBuf,
        #[arg(long)]
        output: PathBuf,
        /// Base IRI for entity subjects
        #[arg(long)]
        base: Option<String>,
        /// Member holding each entity's id
        #[arg(long)]
        id_key: Option<String>,
    },
    /// Execute the RML mapping over preprocessed JSON
    Materialize {
        #[arg(long)]
        mapping: PathBuf,
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        /// builtin or morph-kgc
        #[arg(long)]
        engine: Option<EngineKind>,
    },
    /// Run OWL-RL reasoning and keep triples local to the KG
    Reason {
        #[arg(long)]
        graph: PathBuf,
        #[arg(long = "ontology")]
        ontologies: Vec<PathBuf>,
        /// Defaults to <graph-stem>_inferred.ttl
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Derive ventilation controller configuration from an inferred KG
    ControllerConfig {
        #[arg(long)]
        graph: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
    /// Build (or refresh) the ontology index sidecars
    IndexOntology {
        #[arg(long = "ontology")]
        ontologies: Vec<PathBuf>,
    },
    /// Suggest an ontology class (or property) for a term
    SuggestClass {
        term: String,
        #[arg(long = "ontology")]
        ontologies: Vec<PathBuf>,
        /// Suggest a property instead of a class
        #[arg(long)]
        property: bool,
    },
    /// Validate an RNR document without generating anything
    CheckRnr {
        #[arg(long)]
        rnr: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = PipelineConfig::load_or_default(cli.config.as_deref()).context("loading pipeline config")?;

    match cli.command {
        Commands::Preprocess {
            input,
            platform,
            output,
        } => {
            let platform = PlatformConfig::load(&platform)
                .with_context(|| format!("loading platform config {}", platform.display()))?;
            let summary = preprocess::preprocess_file(&input, &platform, &output)
                .with_context(|| format!("preprocessing {}", input.display()))?;
            done(&format!("Preprocessed JSON written to {}", output.display()));
            println!("  Entities:    {}", summary.natural);
            println!("  Extra nodes: {}", summary.synthesized);
            if summary.skipped > 0 {
                println!("  Skipped:     {}", summary.skipped.to_string().yellow());
            }
        }

        Commands::BuildRnr {
            input,
            ontologies,
            output,
            force,
            strict_ids,
        } => {
            artifact::ensure_writable(&output, force)?;
            let index = load_index(&config, &ontologies)?;
            let doc = RnrBuilder::new(&index)
                .strict_ids(strict_ids || config.strict_ids)
                .build_file(&input, &output, force)
                .with_context(|| format!("building RNR from {}", input.display()))?;
            done(&format!("RNR document written to {}", output.display()));
            println!("  Node types: {}", doc.data.len());
            println!(
                "  {} Review every value marked \"{}\" before generating RML",
                "!".yellow(),
                rnr::REVIEW_MARKER
            );
        }

        Commands::GenerateRml {
            rnr,
            output,
            base,
            id_key,
        } => {
            let generator = RmlGenerator::new(
                base.unwrap_or_else(|| config.base_iri.clone()),
                id_key.unwrap_or_else(|| config.id_key.clone()),
            );
            let mapping = generator
                .generate_file(&rnr, &output)
                .with_context(|| format!("generating RML from {}", rnr.display()))?;
            done(&format!("RML mapping written to {}", output.display()));
            println!("  TriplesMaps: {}", mapping.triples_maps.len());
        }

        Commands::Materialize {
            mapping,
            input,
            output,
            engine,
        } => {
            let engine = engine.unwrap_or(config.engine);
            let summary = rml::materialize(&mapping, &input, &output, engine)
                .with_context(|| format!("materializing {} with {}", mapping.display(), engine))?;
            done(&format!("Knowledge graph written to {}", output.display()));
            println!("  Engine:   {}", summary.engine);
            println!("  Triples:  {}", summary.triples);
            println!("  Subjects: {}", summary.subjects);
        }

        Commands::Reason {
            graph,
            ontologies,
            output,
        } => {
            let ontologies = ontology_paths(&config, &ontologies)?;
            let summary = reason::reason(&graph, &ontologies, output.as_deref())
                .with_context(|| format!("reasoning over {}", graph.display()))?;
            done(&format!("Inferred knowledge graph written to {}", summary.output.display()));
            println!("  Input triples:  {}", summary.input_triples);
            println!("  Output triples: {}", summary.output_triples);
            println!("  Rounds:         {}", summary.rounds);
        }

        Commands::ControllerConfig { graph, output } => {
            let report = controller::generate_file(&graph, &output)
                .with_context(|| format!("generating controller config from {}", graph.display()))?;
            done(&format!("Controller configuration written to {}", output.display()));
            for entry in &report.entries {
                println!("  {} {} ({})", "•".cyan(), entry.room, entry.controller_mode);
            }
            if report.skipped_rooms() > 0 {
                println!("  Rooms without a ventilation device: {}", report.skipped_rooms());
            }
            println!("  Debug dump: {}", controller::debug_path(&output).display());
        }

        Commands::IndexOntology { ontologies } => {
            let index = load_index(&config, &ontologies)?;
            done("Ontology index ready");
            for source in index.sources() {
                println!("  {}", source);
            }
            println!("  Classes:    {}", index.classes().count());
            println!("  Properties: {}", index.properties().count());
            println!("  Prefixes:   {}", index.prefixes().len());
        }

        Commands::SuggestClass {
            term,
            ontologies,
            property,
        } => {
            let index = load_index(&config, &ontologies)?;
            let kind = if property { TermKind::Property } else { TermKind::Class };
            let suggestion = IndexSuggester::new(&index).map_term(&term, kind)?;
            match &suggestion {
                ClassSuggestion::Single(s) => println!("{}", s.green()),
                ClassSuggestion::Candidates(_) => println!("{}", suggestion.to_string().yellow()),
                ClassSuggestion::NotFound(_) => println!("{}", suggestion.to_string().red()),
            }
        }

        Commands::CheckRnr { rnr: path } => {
            let doc = RnrDocument::load(&path).with_context(|| format!("reading {}", path.display()))?;
            let generator = RmlGenerator::new(config.base_iri.clone(), config.id_key.clone());
            let problems = generator.check(&doc);
            if problems.is_empty() {
                done(&format!("{} is ready for RML generation ({} node types)", path.display(), doc.data.len()));
            } else {
                for problem in &problems {
                    println!("  {} {}", "✗".red(), problem);
                }
                bail!("{} problem(s) in {}", problems.len(), path.display());
            }
        }
    }

    Ok(())
}

fn done(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Command-line ontologies, else the ones named in the pipeline config
fn ontology_paths(config: &PipelineConfig, given: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let paths = if given.is_empty() { config.ontologies.clone() } else { given.to_vec() };
    if paths.is_empty() {
        bail!("no ontology given (use --ontology or list them under 'ontologies' in the config)");
    }
    Ok(paths)
}

fn load_index(config: &PipelineConfig, given: &[PathBuf]) -> Result<OntologyIndex> {
    let paths = ontology_paths(config, given)?;
    let cache_dir = config.index_cache_dir();
    let index = OntologyIndex::build(&paths, cache_dir.as_deref())
        .context("building ontology index")?;
    if index.is_empty() {
        bail!("ontologies define no classes or properties: {}", describe(&paths));
    }
    Ok(index)
}

fn describe(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
