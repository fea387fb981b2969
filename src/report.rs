//! Output formatting for archcheck results.
//!
//! Supports two output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: structured output for programmatic consumption

use colored::*;
use serde::Serialize;

use crate::coverage::{CoverageReport, FileCoverage};
use crate::harness::{CheckRun, Outcome, RuleOutcome};

// =============================================================================
// JSON Format
// =============================================================================

#[derive(Serialize)]
pub struct JsonReport<'a> {
    pub version: &'static str,
    pub path: &'a str,
    pub contract: &'a str,
    pub passed: bool,
    pub types_cataloged: usize,
    pub summary: JsonSummary,
    pub rules: &'a [RuleOutcome],
    pub coverage: &'a CoverageReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_coverage: Option<f64>,
}

#[derive(Serialize)]
pub struct JsonSummary {
    pub rules: usize,
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
}

pub fn json_report<'a>(
    path: &'a str,
    contract_path: &'a str,
    run: &'a CheckRun,
    min_coverage: Option<f64>,
) -> JsonReport<'a> {
    let result = &run.result;
    JsonReport {
        version: env!("CARGO_PKG_VERSION"),
        path,
        contract: contract_path,
        passed: run.passed(min_coverage),
        types_cataloged: run.catalog.user_types().count(),
        summary: JsonSummary {
            rules: result.outcomes.len(),
            passed: result.passed_count(),
            failed: result.failed_count(),
            errored: result.errored_count(),
        },
        rules: &result.outcomes,
        coverage: &run.coverage,
        min_coverage,
    }
}

/// Write results in JSON format.
pub fn write_json(
    path: &str,
    contract_path: &str,
    run: &CheckRun,
    min_coverage: Option<f64>,
) -> anyhow::Result<()> {
    let report = json_report(path, contract_path, run, min_coverage);
    let json = serde_json::to_string_pretty(&report)?;
    println!("{}", json);
    Ok(())
}

// =============================================================================
// Pretty Format
// =============================================================================

pub fn write_pretty(path: &str, contract_path: &str, run: &CheckRun, min_coverage: Option<f64>) {
    // Header
    println!();
    print!("  ");
    print!("{}", "archcheck".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();

    print!("  {}", "Checking: ".dimmed());
    println!("{}", path);
    print!("  {}", "Contract: ".dimmed());
    println!("{}", contract_path);
    print!("  {}", "Types:    ".dimmed());
    println!("{}", run.catalog.user_types().count());
    println!();

    if run.result.outcomes.is_empty() {
        println!("  {}", "No rules defined".dimmed());
    } else {
        println!("  {} ({}):", "Rules".bold(), run.result.outcomes.len());
        println!();
        for outcome in &run.result.outcomes {
            write_rule(outcome);
        }
    }
    println!();

    if !run.coverage.files.is_empty() {
        write_coverage(&run.coverage);
        println!();
    }

    write_final_status(run, min_coverage);
    println!();
}

fn write_rule(rule: &RuleOutcome) {
    match &rule.outcome {
        Outcome::Passed => {
            print!("    {} ", "PASS ".green());
            print!("{}", rule.test.method);
            println!("{}", format!("  ({} types)", rule.selected).dimmed());
        }
        Outcome::Failed {
            message,
            violations,
            no_matches,
        } => {
            print!("    {} ", "FAIL ".red());
            println!("{}", rule.test.method);
            if *no_matches {
                println!("            {}", message.yellow());
                return;
            }
            let summary = message.lines().next().unwrap_or_default();
            println!("            {}", summary);
            for v in violations {
                println!("              {} {}", "-".dimmed(), v.message);
            }
        }
        Outcome::Errored { message } => {
            print!("    {} ", "ERROR".red().bold());
            println!("{}", rule.test.method);
            println!("            {}", message);
        }
    }
}

fn write_coverage(coverage: &CoverageReport) {
    println!("  {}", "Coverage:".bold());

    for file in &coverage.files {
        write_file_coverage(file);
    }
}

fn write_file_coverage(file: &FileCoverage) {
    print!("    ");
    write_colored_percentage(file.percentage);
    print!("  {}", file.file.blue());
    let plural = if file.types.len() != 1 { "s" } else { "" };
    println!("{}", format!("  ({} type{})", file.types.len(), plural).dimmed());

    for ty in &file.types {
        println!(
            "{}",
            format!(
                "            {:<40} {}/{} pts",
                ty.name, ty.earned, ty.max
            )
            .dimmed()
        );
    }
}

fn write_colored_percentage(p: f64) {
    let text = format!("{:>5.1}%", p);
    match p {
        p if p >= 80.0 => print!("{}", text.green().bold()),
        p if p >= 50.0 => print!("{}", text.green()),
        p if p >= 25.0 => print!("{}", text.yellow()),
        _ => print!("{}", text.red()),
    }
}

fn write_final_status(run: &CheckRun, min_coverage: Option<f64>) {
    let result = &run.result;
    print!("  ");
    if run.passed(min_coverage) {
        print!("{}", "✓ PASS".green());
    } else {
        print!("{}", "✗ FAIL".red());
    }
    print!(
        "  {} passed, {} failed, {} errored",
        result.passed_count(),
        result.failed_count(),
        result.errored_count()
    );
    print!("  Coverage: ");
    write_colored_percentage(run.coverage.overall);
    if let Some(min) = min_coverage {
        print!("{}", format!(" (minimum {:.1}%)", min).dimmed());
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::harness::RunResult;

    fn empty_run() -> CheckRun {
        CheckRun {
            catalog: Catalog::new(),
            result: RunResult::default(),
            coverage: CoverageReport::default(),
        }
    }

    #[test]
    fn test_json_report_shape() {
        let run = empty_run();
        let report = json_report("src", "archcheck.yaml", &run, Some(10.0));
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(value["path"], "src");
        assert_eq!(value["contract"], "archcheck.yaml");
        assert_eq!(value["passed"], false);
        assert_eq!(value["summary"]["rules"], 0);
        assert_eq!(value["coverage"]["overall"], 0.0);
        assert_eq!(value["min_coverage"], 10.0);
    }

    #[test]
    fn test_json_report_omits_unset_minimum() {
        let run = empty_run();
        let value = serde_json::to_value(json_report("src", "c.yaml", &run, None)).unwrap();
        assert_eq!(value["passed"], true);
        assert!(value.get("min_coverage").is_none());
    }
}
