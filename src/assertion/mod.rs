//! Rule evaluation over selected types.
//!
//! An [`AssertionChain`] applies rules to a selection, collects every
//! violation and records which rule categories touched which types in the
//! [`UsageLedger`] owned by a [`RunState`].

mod chain;
mod ledger;

pub use chain::{AssertionChain, AssertionFailure, Violation};
pub use ledger::{RuleCategory, RunState, TestId, TypeUsage, UsageLedger};
