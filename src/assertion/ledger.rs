//! Rule usage bookkeeping for coverage scoring.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Category of a coverage-relevant rule.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    NamePrefix,
    NameSuffix,
    NamePattern,
    Implement,
    Extend,
    Modifier,
}

impl RuleCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleCategory::NamePrefix => "name_prefix",
            RuleCategory::NameSuffix => "name_suffix",
            RuleCategory::NamePattern => "name_pattern",
            RuleCategory::Implement => "implement",
            RuleCategory::Extend => "extend",
            RuleCategory::Modifier => "modifier",
        }
    }
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies the test unit a rule ran under.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TestId {
    pub class: String,
    pub method: String,
}

impl TestId {
    pub fn new(class: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            method: method.into(),
        }
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.class, self.method)
    }
}

/// What was checked against one type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TypeUsage {
    pub categories: BTreeSet<RuleCategory>,
    pub tests: BTreeSet<TestId>,
}

impl TypeUsage {
    pub fn has(&self, category: RuleCategory) -> bool {
        self.categories.contains(&category)
    }

    pub fn has_any(&self, categories: &[RuleCategory]) -> bool {
        categories.iter().any(|c| self.categories.contains(c))
    }

    /// Whether any rule category at all was recorded.
    pub fn has_categories(&self) -> bool {
        !self.categories.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.tests.is_empty()
    }

    pub fn merge(&mut self, other: &TypeUsage) {
        self.categories.extend(other.categories.iter().copied());
        self.tests.extend(other.tests.iter().cloned());
    }
}

/// Source file -> type name -> usage.
///
/// Types without a declaring file are kept under the empty file key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct UsageLedger {
    files: BTreeMap<String, BTreeMap<String, TypeUsage>>,
}

impl UsageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry for `(file, type_name)`, created empty if missing.
    pub fn entry(&mut self, file: &str, type_name: &str) -> &mut TypeUsage {
        self.files
            .entry(file.to_string())
            .or_default()
            .entry(type_name.to_string())
            .or_default()
    }

    pub fn get(&self, file: &str, type_name: &str) -> Option<&TypeUsage> {
        self.files.get(file).and_then(|types| types.get(type_name))
    }

    /// Usage of `type_name` in `file`, merged with anything recorded for the
    /// same name under the empty file key.
    pub fn usage_for(&self, file: &str, type_name: &str) -> TypeUsage {
        let mut usage = self.get(file, type_name).cloned().unwrap_or_default();
        if !file.is_empty() {
            if let Some(detached) = self.get("", type_name) {
                usage.merge(detached);
            }
        }
        usage
    }

    /// Every recorded file with its per-type usage, ordered by file.
    pub fn files(&self) -> impl Iterator<Item = (&str, &BTreeMap<String, TypeUsage>)> {
        self.files.iter().map(|(file, types)| (file.as_str(), types))
    }

    pub fn types_in(&self, file: &str) -> Option<&BTreeMap<String, TypeUsage>> {
        self.files.get(file)
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Number of recorded types across all files.
    pub fn len(&self) -> usize {
        self.files.values().map(BTreeMap::len).sum()
    }
}

/// Mutable state of one checking run: the usage ledger plus the test
/// context rules are currently evaluated under.
///
/// Usage is only recorded while a context is set.
#[derive(Debug, Default)]
pub struct RunState {
    ledger: UsageLedger,
    context: Option<TestId>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all recorded usage and any context.
    pub fn clear(&mut self) {
        self.ledger.clear();
        self.context = None;
    }

    pub fn set_context(&mut self, test: TestId) {
        self.context = Some(test);
    }

    pub fn clear_context(&mut self) {
        self.context = None;
    }

    pub fn context(&self) -> Option<&TestId> {
        self.context.as_ref()
    }

    pub fn ledger(&self) -> &UsageLedger {
        &self.ledger
    }

    pub(crate) fn record_test(&mut self, file: &str, type_name: &str) {
        if let Some(test) = &self.context {
            let test = test.clone();
            self.ledger.entry(file, type_name).tests.insert(test);
        }
    }

    pub(crate) fn record_category(&mut self, file: &str, type_name: &str, category: RuleCategory) {
        if self.context.is_some() {
            self.ledger.entry(file, type_name).categories.insert(category);
        }
    }
}
