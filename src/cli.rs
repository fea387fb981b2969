//! Command-line interface for archcheck.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use crate::contract::{self, Contract};
use crate::harness;
use crate::report;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Default contract file names to search for.
pub const DEFAULT_CONTRACT_NAMES: &[&str] = &["archcheck.yaml", "arch.yaml", ".archcheck.yaml"];

/// Architecture conformance checks for PHP code bases.
///
/// Archcheck catalogs the classes, interfaces and traits declared under a
/// source tree and verifies the rules of an architecture contract against
/// them: naming, supertypes, modifiers and public surface. It also reports
/// how much of each file's type surface the rules cover.
#[derive(Parser)]
#[command(name = "archcheck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check a code base against an architecture contract
    Check(CheckArgs),
    /// Create a new archcheck contract from a template
    Init(InitArgs),
}

/// Arguments for the check command.
#[derive(Parser)]
pub struct CheckArgs {
    /// Path to check (file or directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Path to contract YAML file (default: auto-discover)
    #[arg(short, long)]
    pub contract: Option<PathBuf>,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Minimum overall coverage percentage (overrides the contract)
    #[arg(long)]
    pub min_coverage: Option<f64>,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "archcheck.yaml")]
    pub output: PathBuf,

    /// Template to use
    #[arg(short, long, default_value = "minimal")]
    pub template: String,

    /// List available templates
    #[arg(short, long)]
    pub list: bool,
}

/// Install the stderr log subscriber.
///
/// `RUST_LOG` takes precedence over the `-v` count.
pub fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("archcheck={}", default_level)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Available contract templates.
struct Template {
    name: &'static str,
    description: &'static str,
    content: &'static str,
}

/// All available templates.
static TEMPLATES: &[Template] = &[
    Template {
        name: "minimal",
        description: "Catalog everything, one naming rule to start from",
        content: include_str!("templates/minimal.yaml"),
    },
    Template {
        name: "layered",
        description: "Controllers, services and repositories with naming and interface rules",
        content: include_str!("templates/layered.yaml"),
    },
    Template {
        name: "hexagonal",
        description: "Ports as interfaces, final adapters, invokable use cases",
        content: include_str!("templates/hexagonal.yaml"),
    },
];

/// Discover a contract file next to `base`, then in the current directory.
fn discover_contract(base: &Path) -> anyhow::Result<PathBuf> {
    let dir = if base.is_dir() {
        base
    } else {
        base.parent().unwrap_or(Path::new("."))
    };
    for candidate_dir in [dir, Path::new(".")] {
        for name in DEFAULT_CONTRACT_NAMES {
            let path = candidate_dir.join(name);
            if path.exists() {
                return Ok(path);
            }
        }
    }
    anyhow::bail!(
        "no contract file found (looked for {})",
        DEFAULT_CONTRACT_NAMES.join(", ")
    )
}

/// Run the check command.
pub fn run_check(args: &CheckArgs) -> anyhow::Result<i32> {
    // Validate format
    if args.format != "pretty" && args.format != "json" {
        eprintln!(
            "Error: invalid format {:?}, must be 'pretty' or 'json'",
            args.format
        );
        return Ok(EXIT_ERROR);
    }

    // Resolve path
    let abs_path = match args.path.canonicalize() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: cannot access path {:?}: {}", args.path, e);
            return Ok(EXIT_ERROR);
        }
    };

    // Discover contract if not specified
    let contract_path = match &args.contract {
        Some(p) => p.clone(),
        None => match discover_contract(&abs_path) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!("Run 'archcheck init' to create a contract file");
                return Ok(EXIT_ERROR);
            }
        },
    };

    let contract = match Contract::parse_file(&contract_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error parsing contract: {:#}", e);
            return Ok(EXIT_ERROR);
        }
    };

    if let Err(e) = contract::validate(&contract) {
        eprintln!("Error: invalid contract: {}", e);
        return Ok(EXIT_ERROR);
    }

    if let Some(min) = args.min_coverage {
        if !(0.0..=100.0).contains(&min) {
            eprintln!("Error: --min-coverage must be between 0 and 100, got {}", min);
            return Ok(EXIT_ERROR);
        }
    }

    tracing::info!("checking {} against {}", abs_path.display(), contract_path.display());
    let run = harness::check(&contract, &abs_path)?;

    if run.result.outcomes.is_empty() {
        eprintln!("Warning: contract defines no rules");
    }

    let min_coverage = args.min_coverage.or(contract.coverage_threshold);
    let contract_path_str = contract_path.to_string_lossy().to_string();
    let path_str = args.path.to_string_lossy().to_string();

    match args.format.as_str() {
        "json" => {
            report::write_json(&path_str, &contract_path_str, &run, min_coverage)?;
        }
        _ => {
            report::write_pretty(&path_str, &contract_path_str, &run, min_coverage);
        }
    }

    if run.passed(min_coverage) {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_FAILED)
    }
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    if args.list {
        list_templates();
        return Ok(EXIT_SUCCESS);
    }

    let Some(template) = TEMPLATES.iter().find(|t| t.name == args.template) else {
        let names: Vec<_> = TEMPLATES.iter().map(|t| t.name).collect();
        eprintln!(
            "Error: unknown template {:?} (available: {})",
            args.template,
            names.join(", ")
        );
        return Ok(EXIT_ERROR);
    };

    if args.output.exists() {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Remove it or use --output to choose another path");
        return Ok(EXIT_ERROR);
    }

    if let Err(e) = write_template(&args.output, template) {
        eprintln!("Error: {:#}", e);
        return Ok(EXIT_ERROR);
    }

    println!("Created {} from template '{}'", args.output.display(), template.name);
    println!();
    println!("Next steps:");
    println!("  1. Point `sources` at your code and adjust the namespaces");
    println!("  2. Run: archcheck check . --contract {}", args.output.display());

    Ok(EXIT_SUCCESS)
}

fn write_template(output: &Path, template: &Template) -> anyhow::Result<()> {
    let parent = output.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(parent) = parent {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    std::fs::write(output, template.content)
        .with_context(|| format!("failed to write contract {}", output.display()))
}

fn list_templates() {
    println!("Available templates:");
    println!();

    for template in TEMPLATES {
        let rules = Contract::parse_str(template.content)
            .map(|c| c.rules.len())
            .unwrap_or(0);
        let marker = if template.name == "minimal" { "*" } else { " " };
        println!(
            "  {}{:<14} {:>2} rules  {}",
            marker, template.name, rules, template.description
        );
    }

    println!();
    println!("  * default");
    println!("Usage: archcheck init --template <name> [--output <file>]");
}
