/// Registry Linter: validates a theme registry and reports its ranking.
///
/// Usage: registry_linter [<registry.ron>]

use clap::Parser;
use lineage_narrative::core::theme::ThemeRegistry;
use lineage_narrative::schema::graph::SubjectKind;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process;

#[derive(Parser, Debug)]
#[clap(name = "registry_linter")]
#[clap(about = "Validate a theme registry and print its evaluation order")]
struct Args {
    /// Theme registry (RON)
    #[clap(default_value = "theme_data/registry.ron")]
    registry: PathBuf,
}

fn main() {
    let args = Args::parse();

    let registry = match ThemeRegistry::load_from_ron(&args.registry) {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            process::exit(1);
        }
    };

    println!(
        "Loaded {} themes (registry version '{}')",
        registry.themes().len(),
        registry.version
    );

    println!("\n=== Evaluation Order ===\n");
    for (rank, (_, theme)) in registry.ranked().enumerate() {
        let kinds: Vec<&str> = theme
            .subjects
            .iter()
            .map(|k| match k {
                SubjectKind::Individual => "individual",
                SubjectKind::Family => "family",
            })
            .collect();
        let facts: Vec<&str> = theme.when.facts().iter().map(|f| f.name()).collect();
        println!(
            "{:>2}. {} (priority {}, {}) facts: [{}]",
            rank + 1,
            theme.name,
            theme.priority,
            kinds.join("+"),
            facts.join(", ")
        );
    }
    println!("\nDefault blocks: {}", registry.default_blocks.join(", "));

    let warnings = lint(&registry);
    println!("\n=== Registry Lint Report ===\n");
    if warnings.is_empty() {
        println!("All checks passed!");
    }
    for warning in &warnings {
        println!("WARNING: {}", warning);
    }
    println!("\nSummary: 0 errors, {} warnings", warnings.len());
}

/// Non-fatal observations: blocks shared between themes (only the first
/// matching theme places them) and themes that no subject kind can reach.
fn lint(registry: &ThemeRegistry) -> Vec<String> {
    let mut warnings = Vec::new();

    let mut contributors: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (_, theme) in registry.ranked() {
        for block in &theme.blocks {
            contributors
                .entry(block.as_str())
                .or_default()
                .push(theme.name.as_str());
        }
    }
    for (block, themes) in &contributors {
        if themes.len() > 1 {
            warnings.push(format!(
                "block '{}' is shared by {}; it is placed by the first that matches",
                block,
                themes.join(", ")
            ));
        }
    }

    for theme in registry.themes() {
        if theme.subjects.is_empty() {
            warnings.push(format!("theme '{}' applies to no subject kind", theme.name));
        }
        for block in &theme.blocks {
            if registry.default_blocks.contains(block) {
                warnings.push(format!(
                    "theme '{}' repeats default block '{}'",
                    theme.name, block
                ));
            }
        }
    }

    warnings
}
