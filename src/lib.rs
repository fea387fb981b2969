//! Archcheck - architecture conformance checks for PHP code bases.
//!
//! Archcheck discovers the classes, interfaces and traits declared under a
//! source tree and verifies architecture rules against that static type
//! graph. It never executes the checked code.
//!
//! # Architecture
//!
//! - `extract`: lexer and single-pass scanner that pull type declarations
//!   out of PHP source
//! - `catalog`: name-indexed registry of discovered and built-in types
//! - `select`: immutable, composable queries over the catalog
//! - `assertion`: the rule chain, its violations and the usage ledger
//! - `coverage`: pluggable criteria scoring how much of each type the rules checked
//! - `contract`: YAML contract schema
//! - `harness`: runs contract rules as test units
//! - `report`: output formatting (text, JSON)
//!
//! # Example
//!
//! ```no_run
//! use archcheck::{AssertionChain, Catalog, RunState, Selector, TestId};
//!
//! let catalog = Catalog::discover(&["src"]);
//! let mut state = RunState::new();
//! state.set_context(TestId::new("Architecture", "services"));
//!
//! let services = Selector::new().in_namespace("App\\Service").get(&catalog);
//! let result = AssertionChain::that(&mut state, services)
//!     .have_name_suffix("Service")
//!     .be_final()
//!     .resolve("services must be final");
//! state.clear_context();
//! # let _ = result;
//! ```

pub mod assertion;
pub mod catalog;
pub mod cli;
pub mod contract;
pub mod coverage;
pub mod extract;
pub mod harness;
pub mod report;
pub mod select;

pub use assertion::{
    AssertionChain, AssertionFailure, RuleCategory, RunState, TestId, TypeUsage, UsageLedger,
    Violation,
};
pub use catalog::{Catalog, CatalogBuilder, MethodDescriptor, TypeDescriptor, TypeKind, Visibility};
pub use contract::Contract;
pub use coverage::{CoverageCalculator, CoverageReport, Criterion, FileCoverage, TypeScore};
pub use extract::{extract_all, extract_first, ExtractError, FileTypes};
pub use harness::{Harness, Outcome, RuleOutcome, RunResult};
pub use select::Selector;
