/// Outline: GEDCOM documents in, narrative outlines out.
///
/// Usage: outline [--registry <file>] [--reference-year <year>] [--pretty | --blocks] <gedcom>...
///
/// One document prints a single JSON outline; several are outlined in
/// parallel and printed as one JSON outline per line, in argument order.

use clap::Parser;
use lineage_narrative::core::pipeline::{OutlineEngine, DEFAULT_MAX_DOCUMENT_BYTES};
use lineage_narrative::Outline;
use std::path::PathBuf;
use std::process;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[clap(name = "outline")]
#[clap(about = "Compose narrative outlines from GEDCOM family-history files")]
struct Args {
    /// GEDCOM files to outline
    #[clap(required = true, value_name = "GEDCOM")]
    files: Vec<PathBuf>,

    /// Theme registry (RON)
    #[clap(long, env = "LINEAGE_REGISTRY", default_value = "theme_data/registry.ron")]
    registry: PathBuf,

    /// Year used for chronology checks (defaults to the current year)
    #[clap(long)]
    reference_year: Option<i32>,

    /// Refuse documents larger than this many bytes
    #[clap(long, default_value_t = DEFAULT_MAX_DOCUMENT_BYTES)]
    max_bytes: usize,

    /// Pretty-print JSON (single document only)
    #[clap(long, conflicts_with = "blocks")]
    pretty: bool,

    /// Print a readable block listing instead of JSON
    #[clap(long)]
    blocks: bool,
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lineage_narrative=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let mut builder = OutlineEngine::builder()
        .registry_path(&args.registry)
        .max_document_bytes(args.max_bytes);
    if let Some(year) = args.reference_year {
        builder = builder.reference_year(year);
    }
    let engine = match builder.build() {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            process::exit(2);
        }
    };

    let mut documents = Vec::with_capacity(args.files.len());
    for path in &args.files {
        match std::fs::read(path) {
            Ok(bytes) => documents.push(bytes),
            Err(e) => {
                eprintln!("ERROR: cannot read '{}': {}", path.display(), e);
                process::exit(1);
            }
        }
    }

    let results = engine.outline_batch(&documents, None);
    let mut failed = 0;
    for (path, result) in args.files.iter().zip(results) {
        match result {
            Ok(outline) => {
                if let Err(e) = emit(&outline, &args) {
                    error!(file = %path.display(), "serialization failed: {}", e);
                    failed += 1;
                }
            }
            Err(e) => {
                eprintln!("ERROR: {}: {} ({:?})", path.display(), e, e.kind());
                failed += 1;
            }
        }
    }

    if failed > 0 {
        process::exit(1);
    }
}

fn emit(outline: &Outline, args: &Args) -> Result<(), serde_json::Error> {
    if args.blocks {
        print_blocks(outline);
        return Ok(());
    }
    let json = if args.pretty && args.files.len() == 1 {
        outline.to_json_pretty()?
    } else {
        outline.to_json()?
    };
    println!("{}", json);
    Ok(())
}

fn print_blocks(outline: &Outline) {
    for warning in &outline.warnings {
        println!("WARNING: {}", warning);
    }
    for subject in outline.subjects() {
        let themes = if subject.fallback {
            "default".to_string()
        } else {
            subject.themes.join(", ")
        };
        println!("\n{} [{}] ({})", subject.label, subject.subject, themes);
        for block in &subject.blocks {
            let evidence: Vec<String> = outline
                .provenance(block)
                .iter()
                .map(|f| format!("{}={}", f.name, f.value))
                .collect();
            if evidence.is_empty() {
                println!("  - {}", block.block);
            } else {
                println!("  - {}  <- {}", block.block, evidence.join(", "));
            }
        }
    }
    for insight in &outline.summary.insights {
        println!("\nINSIGHT: {}", insight.describe());
    }
}
