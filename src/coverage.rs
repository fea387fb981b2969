//! Coverage scoring.
//!
//! Each [`Criterion`] awards points for one aspect of a type that rules can
//! check. A type's coverage is the share of its available points earned by
//! the rule categories recorded for it in the [`UsageLedger`]; a file's
//! coverage is the mean over the types it declares.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::assertion::{RuleCategory, TypeUsage, UsageLedger};
use crate::catalog::{Catalog, TypeDescriptor, TypeKind};
use crate::extract;

/// Categories that count as checking a type's name.
const NAME_CATEGORIES: &[RuleCategory] = &[
    RuleCategory::NamePrefix,
    RuleCategory::NameSuffix,
    RuleCategory::NamePattern,
];

const RELATIONSHIP_CATEGORIES: &[RuleCategory] = &[RuleCategory::Implement, RuleCategory::Extend];

const ALL_CATEGORIES: &[RuleCategory] = &[
    RuleCategory::NamePrefix,
    RuleCategory::NameSuffix,
    RuleCategory::NamePattern,
    RuleCategory::Implement,
    RuleCategory::Extend,
    RuleCategory::Modifier,
];

/// One scoring aspect of a type.
///
/// Contributions are additive, so criteria can be registered in any order.
pub trait Criterion {
    fn name(&self) -> &'static str;

    /// Rule categories that can earn this criterion's points.
    fn relevant_categories(&self) -> &'static [RuleCategory];

    fn max_points(&self, ty: &TypeDescriptor) -> u32;

    fn earned_points(&self, ty: &TypeDescriptor, usage: &TypeUsage) -> u32;
}

/// Every type has a name worth checking.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityCriterion;

impl Criterion for IdentityCriterion {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn relevant_categories(&self) -> &'static [RuleCategory] {
        NAME_CATEGORIES
    }

    fn max_points(&self, _ty: &TypeDescriptor) -> u32 {
        1
    }

    fn earned_points(&self, _ty: &TypeDescriptor, usage: &TypeUsage) -> u32 {
        u32::from(usage.has_any(NAME_CATEGORIES))
    }
}

/// A final type is covered once any rule looked at it.
#[derive(Debug, Default, Clone, Copy)]
pub struct FinalityCriterion;

impl Criterion for FinalityCriterion {
    fn name(&self) -> &'static str {
        "finality"
    }

    fn relevant_categories(&self) -> &'static [RuleCategory] {
        ALL_CATEGORIES
    }

    fn max_points(&self, ty: &TypeDescriptor) -> u32 {
        u32::from(ty.is_final)
    }

    fn earned_points(&self, ty: &TypeDescriptor, usage: &TypeUsage) -> u32 {
        u32::from(ty.is_final && usage.has_categories())
    }
}

/// A type with supertypes should have them checked.
#[derive(Debug, Default, Clone, Copy)]
pub struct RelationshipCriterion;

impl Criterion for RelationshipCriterion {
    fn name(&self) -> &'static str {
        "relationship"
    }

    fn relevant_categories(&self) -> &'static [RuleCategory] {
        RELATIONSHIP_CATEGORIES
    }

    fn max_points(&self, ty: &TypeDescriptor) -> u32 {
        u32::from(ty.has_supertypes())
    }

    fn earned_points(&self, ty: &TypeDescriptor, usage: &TypeUsage) -> u32 {
        u32::from(ty.has_supertypes() && usage.has_any(RELATIONSHIP_CATEGORIES))
    }
}

/// Score of one type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeScore {
    pub name: String,
    pub kind: TypeKind,
    pub earned: u32,
    pub max: u32,
    pub percentage: f64,
}

/// Coverage of one source file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileCoverage {
    pub file: String,
    pub types: Vec<TypeScore>,
    pub percentage: f64,
}

/// Coverage across a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CoverageReport {
    pub files: Vec<FileCoverage>,
    /// Mean over files that declare at least one type.
    pub overall: f64,
}

impl CoverageReport {
    pub fn from_files(files: Vec<FileCoverage>) -> Self {
        let scored: Vec<f64> = files
            .iter()
            .filter(|f| !f.types.is_empty())
            .map(|f| f.percentage)
            .collect();
        Self {
            overall: mean(&scored),
            files,
        }
    }

    pub fn file(&self, file: &str) -> Option<&FileCoverage> {
        self.files.iter().find(|f| f.file == file)
    }

    pub fn type_count(&self) -> usize {
        self.files.iter().map(|f| f.types.len()).sum()
    }
}

/// Registry of criteria.
pub struct CoverageCalculator {
    criteria: Vec<Box<dyn Criterion>>,
}

impl Default for CoverageCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl CoverageCalculator {
    /// Calculator with the identity, finality and relationship criteria.
    pub fn new() -> Self {
        Self::empty()
            .with(IdentityCriterion)
            .with(FinalityCriterion)
            .with(RelationshipCriterion)
    }

    /// Calculator without any criteria.
    pub fn empty() -> Self {
        Self {
            criteria: Vec::new(),
        }
    }

    pub fn with<C: Criterion + 'static>(mut self, criterion: C) -> Self {
        self.register(criterion);
        self
    }

    pub fn register<C: Criterion + 'static>(&mut self, criterion: C) {
        self.criteria.push(Box::new(criterion));
    }

    pub fn criteria(&self) -> impl Iterator<Item = &dyn Criterion> {
        self.criteria.iter().map(|c| c.as_ref())
    }

    pub fn max_points(&self, ty: &TypeDescriptor) -> u32 {
        self.criteria.iter().map(|c| c.max_points(ty)).sum()
    }

    /// Earned points, never more than [`max_points`](Self::max_points).
    pub fn earned_points(&self, ty: &TypeDescriptor, usage: &TypeUsage) -> u32 {
        let earned: u32 = self.criteria.iter().map(|c| c.earned_points(ty, usage)).sum();
        earned.min(self.max_points(ty))
    }

    /// Percentage in `0.0..=100.0`; 0 when the type has no points to earn.
    pub fn percentage(&self, ty: &TypeDescriptor, usage: &TypeUsage) -> f64 {
        let max = self.max_points(ty);
        if max == 0 {
            return 0.0;
        }
        100.0 * f64::from(self.earned_points(ty, usage)) / f64::from(max)
    }

    pub fn score(&self, ty: &TypeDescriptor, usage: &TypeUsage) -> TypeScore {
        TypeScore {
            name: ty.name.clone(),
            kind: ty.kind,
            earned: self.earned_points(ty, usage),
            max: self.max_points(ty),
            percentage: self.percentage(ty, usage),
        }
    }

    /// Score `types` as the declarations of `file`.
    pub fn file_coverage(
        &self,
        file: &str,
        types: &[TypeDescriptor],
        ledger: &UsageLedger,
    ) -> FileCoverage {
        let scores: Vec<TypeScore> = types
            .iter()
            .map(|ty| self.score(ty, &ledger.usage_for(file, &ty.name)))
            .collect();
        let percentages: Vec<f64> = scores.iter().map(|s| s.percentage).collect();
        FileCoverage {
            file: file.to_string(),
            percentage: mean(&percentages),
            types: scores,
        }
    }

    /// Score every declaration in `source`, including types no rule touched.
    pub fn file_report(
        &self,
        path: &Path,
        source: &str,
        ledger: &UsageLedger,
    ) -> Result<FileCoverage, extract::ExtractError> {
        let found = extract::extract_all(path, source)?;
        Ok(self.file_coverage(&path.to_string_lossy(), &found.types, ledger))
    }

    /// Coverage of every file in `files`; unreadable files are skipped.
    pub fn source_report(&self, files: &[PathBuf], ledger: &UsageLedger) -> CoverageReport {
        let mut coverage = Vec::new();
        for path in files {
            let source = match fs::read_to_string(path) {
                Ok(source) => source,
                Err(e) => {
                    tracing::warn!("cannot read {}: {}", path.display(), e);
                    continue;
                }
            };
            match self.file_report(path, &source, ledger) {
                Ok(file) => coverage.push(file),
                Err(e) => tracing::warn!("skipping {}: {}", path.display(), e),
            }
        }
        CoverageReport::from_files(coverage)
    }

    /// Coverage of the types recorded in `ledger`, resolved through `catalog`.
    ///
    /// Recorded names the catalog does not know are ignored.
    pub fn ledger_report(&self, catalog: &Catalog, ledger: &UsageLedger) -> CoverageReport {
        let files = ledger
            .files()
            .map(|(file, recorded)| {
                let types: Vec<TypeDescriptor> = recorded
                    .keys()
                    .filter_map(|name| catalog.get(name).cloned())
                    .collect();
                self.file_coverage(file, &types, ledger)
            })
            .collect();
        CoverageReport::from_files(files)
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
