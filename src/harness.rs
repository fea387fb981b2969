//! Runs contract rules as test units.
//!
//! Every rule becomes one test `(contract name, rule name)`. The harness sets
//! that test as the evaluation context while the rule runs and clears it
//! afterwards, so the usage ledger learns which rules touched which types.

use serde::Serialize;
use std::path::Path;

use crate::assertion::{AssertionChain, AssertionFailure, RunState, TestId, Violation};
use crate::catalog::Catalog;
use crate::contract::{Contract, Rule};
use crate::coverage::{CoverageCalculator, CoverageReport};

/// Result of one rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    Passed,
    Failed {
        message: String,
        violations: Vec<Violation>,
        no_matches: bool,
    },
    /// The rule could not be evaluated (e.g. an invalid regex).
    Errored { message: String },
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Passed => "PASS",
            Outcome::Failed { .. } => "FAIL",
            Outcome::Errored { .. } => "ERROR",
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, Outcome::Passed)
    }
}

impl From<AssertionFailure> for Outcome {
    fn from(failure: AssertionFailure) -> Self {
        let message = failure.to_string();
        match failure {
            AssertionFailure::NoMatches => Outcome::Failed {
                message,
                violations: Vec::new(),
                no_matches: true,
            },
            AssertionFailure::Violations { violations, .. } => Outcome::Failed {
                message,
                violations,
                no_matches: false,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleOutcome {
    pub test: TestId,
    /// Number of types the rule's selector matched.
    pub selected: usize,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Outcomes of one contract run, in rule order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunResult {
    pub outcomes: Vec<RuleOutcome>,
}

impl RunResult {
    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(|o| o.outcome.is_passed())
    }

    pub fn passed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.outcome.is_passed()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, Outcome::Failed { .. }))
            .count()
    }

    pub fn errored_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, Outcome::Errored { .. }))
            .count()
    }
}

/// Executes contract rules against a catalog.
pub struct Harness<'c> {
    catalog: &'c Catalog,
}

impl<'c> Harness<'c> {
    pub fn new(catalog: &'c Catalog) -> Self {
        Self { catalog }
    }

    /// Run every rule of `contract`, starting from a cleared state.
    pub fn run(&self, contract: &Contract, state: &mut RunState) -> RunResult {
        state.clear();
        let outcomes = contract
            .rules
            .iter()
            .map(|rule| self.run_rule(contract.test_class(), rule, state))
            .collect();
        RunResult { outcomes }
    }

    /// Run a single rule under the test `(class, rule.name)`.
    pub fn run_rule(&self, class: &str, rule: &Rule, state: &mut RunState) -> RuleOutcome {
        let test = TestId::new(class, rule.name.as_str());
        state.set_context(test.clone());
        let evaluated = self.evaluate(rule, state);
        state.clear_context();

        let (selected, outcome) = match evaluated {
            Ok((selected, Ok(()))) => (selected, Outcome::Passed),
            Ok((selected, Err(failure))) => (selected, Outcome::from(failure)),
            Err(e) => (
                0,
                Outcome::Errored {
                    message: format!("{:#}", e),
                },
            ),
        };
        tracing::debug!("{} {} ({} selected)", outcome.label(), test, selected);
        RuleOutcome {
            test,
            selected,
            outcome,
        }
    }

    fn evaluate(
        &self,
        rule: &Rule,
        state: &mut RunState,
    ) -> anyhow::Result<(usize, Result<(), AssertionFailure>)> {
        let selector = rule.select.selector()?;
        let checks = rule.checks()?;
        let types = selector.get(self.catalog);
        let selected = types.len();

        let chain = checks
            .iter()
            .fold(AssertionChain::that(state, types), |chain, check| {
                check.apply(chain)
            });
        Ok((selected, chain.resolve(&rule.summary())))
    }
}

/// Everything a full `check` run produces.
#[derive(Debug, Clone)]
pub struct CheckRun {
    pub catalog: Catalog,
    pub result: RunResult,
    pub coverage: CoverageReport,
}

impl CheckRun {
    /// Whether every rule passed and coverage meets `min_coverage`.
    pub fn passed(&self, min_coverage: Option<f64>) -> bool {
        self.result.passed() && min_coverage.map_or(true, |min| self.coverage.overall >= min)
    }
}

/// Catalog the sources of `contract` under `base`, run its rules and score
/// coverage for every scanned file.
pub fn check(contract: &Contract, base: &Path) -> anyhow::Result<CheckRun> {
    let builder = contract.catalog_builder()?;
    let roots = contract.source_roots(base);
    for root in &roots {
        if !root.exists() {
            tracing::warn!("source root {} does not exist", root.display());
        }
    }

    let catalog = builder.build(&roots);
    tracing::info!("cataloged {} types", catalog.user_types().count());

    let mut state = RunState::new();
    let result = Harness::new(&catalog).run(contract, &mut state);

    let files = builder.source_files(&roots);
    let coverage = CoverageCalculator::new().source_report(&files, state.ledger());

    Ok(CheckRun {
        catalog,
        result,
        coverage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{TypeDescriptor, TypeKind};

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        let mut foo = TypeDescriptor::new(TypeKind::Class, "App\\Service\\FooService")
            .with_file("Foo.php")
            .with_interface("App\\Contracts\\Service");
        foo.is_final = true;
        catalog.insert(foo);
        catalog.insert(TypeDescriptor::new(TypeKind::Class, "App\\Service\\Bar").with_file("Bar.php"));
        catalog
    }

    fn contract(yaml: &str) -> Contract {
        Contract::parse_str(yaml).unwrap()
    }

    #[test]
    fn test_outcomes_in_rule_order() {
        let contract = contract(
            r#"
name: Arch
rules:
  - name: services
    message: "services need the suffix"
    select: { in_namespace: "App\\Service" }
    assert:
      - name_suffix: "Service"
  - name: nothing
    select: { in_namespace: "Nope" }
  - name: broken
    select: { matching: "(" }
  - name: contracts
    select: { implementing: "App\\Contracts\\Service" }
    assert:
      - final: true
"#,
        );
        let catalog = catalog();
        let mut state = RunState::new();
        let result = Harness::new(&catalog).run(&contract, &mut state);

        let labels: Vec<_> = result.outcomes.iter().map(|o| o.outcome.label()).collect();
        assert_eq!(labels, vec!["FAIL", "FAIL", "ERROR", "PASS"]);
        assert_eq!(result.outcomes[0].test.to_string(), "Arch::services");
        assert_eq!(result.outcomes[0].selected, 2);
        match &result.outcomes[0].outcome {
            Outcome::Failed {
                message,
                violations,
                no_matches,
            } => {
                assert!(!no_matches);
                assert_eq!(violations.len(), 1);
                assert!(message.starts_with("services need the suffix\n - App\\Service\\Bar"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(matches!(
            result.outcomes[1].outcome,
            Outcome::Failed { no_matches: true, .. }
        ));
        assert!(!result.passed());
        assert_eq!(result.failed_count(), 2);
        assert_eq!(result.errored_count(), 1);
        assert!(state.context().is_none());
    }

    #[test]
    fn test_ledger_records_each_rule() {
        let contract = contract(
            r#"
name: Arch
rules:
  - name: naming
    assert:
      - name_prefix: "Foo"
  - name: relations
    select: { matching: "Foo" }
    assert:
      - implement: "App\\Contracts\\Service"
"#,
        );
        let catalog = catalog();
        let mut state = RunState::new();
        Harness::new(&catalog).run(&contract, &mut state);

        let foo = state.ledger().get("Foo.php", "App\\Service\\FooService").unwrap();
        assert_eq!(foo.tests.len(), 2);
        assert_eq!(foo.categories.len(), 2);
        let bar = state.ledger().get("Bar.php", "App\\Service\\Bar").unwrap();
        assert_eq!(bar.tests.len(), 1);

        // A second run starts from a clean ledger.
        let empty = Contract::default();
        Harness::new(&catalog).run(&empty, &mut state);
        assert!(state.ledger().is_empty());
    }

    #[test]
    fn test_known_type_shadowing_scanned_file_is_covered() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("Foo.php"),
            "<?php namespace App; final class FooService {}",
        )
        .unwrap();
        let contract = contract(
            r#"
name: Arch
known_types:
  - name: "App\\FooService"
    kind: class
rules:
  - name: naming
    assert:
      - name_suffix: "Service"
"#,
        );

        let run = check(&contract, temp.path()).unwrap();
        assert!(run.result.passed());
        assert!(run.catalog.get("App\\FooService").unwrap().declaring_file.is_none());

        assert_eq!(run.coverage.files.len(), 1);
        let score = &run.coverage.files[0].types[0];
        assert_eq!(score.name, "App\\FooService");
        assert_eq!((score.earned, score.max), (2, 2));
        assert_eq!(run.coverage.overall, 100.0);
    }
}
