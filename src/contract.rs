//! Architecture contract schema.
//!
//! A contract names the source roots to catalog and the rules every
//! selection of types must satisfy.

use anyhow::Context;
use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::assertion::AssertionChain;
use crate::catalog::{CatalogBuilder, MethodDescriptor, TypeDescriptor, TypeKind, Visibility};
use crate::select::Selector;

/// Test class used when the contract has no name.
const DEFAULT_CONTRACT_NAME: &str = "architecture";

/// Top-level contract definition.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Contract {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Roots to catalog, relative to the checked path (default: ".")
    #[serde(default)]
    pub sources: Vec<String>,
    /// Source file extensions without the dot (default: "php")
    #[serde(default)]
    pub extensions: Vec<String>,
    /// Glob patterns for paths to leave out of the catalog (e.g., "**/Legacy/**")
    #[serde(default)]
    pub excluded_paths: Vec<String>,
    /// Minimum overall coverage percentage
    #[serde(default)]
    pub coverage_threshold: Option<f64>,
    /// Types the environment provides that are not in the sources
    #[serde(default)]
    pub known_types: Vec<KnownType>,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl Contract {
    /// Parse a contract from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("cannot read {}", path.as_ref().display()))?;
        Self::parse_str(&content)
    }

    pub fn parse_str(content: &str) -> anyhow::Result<Self> {
        let contract: Contract = serde_yaml::from_str(content)?;
        Ok(contract)
    }

    /// Test class name rules of this contract run under.
    pub fn test_class(&self) -> &str {
        if self.name.trim().is_empty() {
            DEFAULT_CONTRACT_NAME
        } else {
            &self.name
        }
    }

    /// Source roots resolved against `base`.
    pub fn source_roots(&self, base: &Path) -> Vec<PathBuf> {
        if base.is_file() {
            return vec![base.to_path_buf()];
        }
        if self.sources.is_empty() {
            return vec![base.to_path_buf()];
        }
        self.sources.iter().map(|s| base.join(s)).collect()
    }

    /// Compiled `excluded_paths`, or None when there are none.
    pub fn excluded_globset(&self) -> anyhow::Result<Option<GlobSet>> {
        if self.excluded_paths.is_empty() {
            return Ok(None);
        }
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.excluded_paths {
            let glob = Glob::new(pattern)
                .map_err(|e| anyhow::anyhow!("invalid excluded_paths pattern {:?}: {}", pattern, e))?;
            builder.add(glob);
        }
        Ok(Some(builder.build()?))
    }

    /// Catalog builder configured from this contract.
    pub fn catalog_builder(&self) -> anyhow::Result<CatalogBuilder> {
        let mut builder = CatalogBuilder::new()
            .extensions(self.extensions.iter().cloned())
            .known_types(self.known_types.iter().map(KnownType::to_descriptor));
        if let Some(excluded) = self.excluded_globset()? {
            builder = builder.excluding(excluded);
        }
        Ok(builder)
    }
}

/// A type supplied by the environment rather than scanned.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KnownType {
    pub name: String,
    pub kind: TypeKind,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    #[serde(default, rename = "final")]
    pub is_final: bool,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    /// Names of public methods
    #[serde(default)]
    pub methods: Vec<String>,
}

impl KnownType {
    pub fn to_descriptor(&self) -> TypeDescriptor {
        let mut ty = TypeDescriptor::new(self.kind, self.name.as_str());
        ty.is_abstract = self.is_abstract;
        ty.is_final = self.is_final;
        if let Some(parent) = &self.parent {
            ty = ty.with_parent(parent.as_str());
        }
        for interface in &self.interfaces {
            ty = ty.with_interface(interface.as_str());
        }
        for method in &self.methods {
            ty = ty.with_method(MethodDescriptor::new(method.as_str(), Visibility::Public));
        }
        ty
    }
}

/// One architecture rule: a selection and the assertions it must pass.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Rule {
    pub name: String,
    /// Failure summary (default: "rule <name> failed")
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub select: SelectSpec,
    #[serde(default, rename = "assert")]
    pub assertions: Vec<AssertSpec>,
}

impl Rule {
    pub fn summary(&self) -> String {
        match &self.message {
            Some(m) if !m.trim().is_empty() => m.clone(),
            _ => format!("rule {} failed", self.name),
        }
    }

    /// Compile every assertion, in order.
    pub fn checks(&self) -> anyhow::Result<Vec<Check>> {
        self.assertions.iter().map(AssertSpec::check).collect()
    }
}

/// Selector filters, combined with AND.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SelectSpec {
    #[serde(default)]
    pub in_namespace: Option<String>,
    #[serde(default)]
    pub exclude_abstract: bool,
    #[serde(default)]
    pub exclude_interfaces: bool,
    #[serde(default)]
    pub exclude_traits: bool,
    /// Regex over the fully-qualified name
    #[serde(default)]
    pub matching: Option<String>,
    #[serde(default)]
    pub implementing: Option<String>,
    #[serde(default)]
    pub extending: Option<String>,
}

impl SelectSpec {
    pub fn selector(&self) -> anyhow::Result<Selector> {
        let mut selector = Selector::new();
        if let Some(prefix) = &self.in_namespace {
            selector = selector.in_namespace(prefix.as_str());
        }
        if self.exclude_abstract {
            selector = selector.excluding_abstract();
        }
        if self.exclude_interfaces {
            selector = selector.excluding_interfaces();
        }
        if self.exclude_traits {
            selector = selector.excluding_traits();
        }
        if let Some(pattern) = &self.matching {
            let re = Regex::new(pattern)
                .map_err(|e| anyhow::anyhow!("invalid matching pattern {:?}: {}", pattern, e))?;
            selector = selector.matching(re);
        }
        if let Some(interface) = &self.implementing {
            selector = selector.implementing(interface.as_str());
        }
        if let Some(class) = &self.extending {
            selector = selector.extending(class.as_str());
        }
        Ok(selector)
    }
}

/// One assertion. Exactly one field must be set.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AssertSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_suffix: Option<String>,
    /// Regex over the short name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_matching: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub invokable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_public_methods: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_public_methods: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exact_public_methods: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implement: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extend: Option<String>,
    #[serde(default, rename = "final", skip_serializing_if = "std::ops::Not::not")]
    pub is_final: bool,
    #[serde(default, rename = "abstract", skip_serializing_if = "std::ops::Not::not")]
    pub is_abstract: bool,
}

impl AssertSpec {
    /// Number of checks this item sets. Boolean flags count when true.
    pub fn check_count(&self) -> usize {
        [
            self.name_prefix.is_some(),
            self.name_suffix.is_some(),
            self.name_matching.is_some(),
            self.invokable,
            self.max_public_methods.is_some(),
            self.min_public_methods.is_some(),
            self.exact_public_methods.is_some(),
            self.implement.is_some(),
            self.extend.is_some(),
            self.is_final,
            self.is_abstract,
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }

    /// Compile the single check this item describes.
    pub fn check(&self) -> anyhow::Result<Check> {
        if self.check_count() != 1 {
            anyhow::bail!(
                "assertion must set exactly one check, found {}",
                self.check_count()
            );
        }
        let check = if let Some(p) = &self.name_prefix {
            Check::NamePrefix(p.clone())
        } else if let Some(s) = &self.name_suffix {
            Check::NameSuffix(s.clone())
        } else if let Some(pattern) = &self.name_matching {
            let re = Regex::new(pattern)
                .map_err(|e| anyhow::anyhow!("invalid name_matching pattern {:?}: {}", pattern, e))?;
            Check::NameMatching(re)
        } else if self.invokable {
            Check::Invokable
        } else if let Some(n) = self.max_public_methods {
            Check::MaxPublicMethods(n)
        } else if let Some(n) = self.min_public_methods {
            Check::MinPublicMethods(n)
        } else if let Some(n) = self.exact_public_methods {
            Check::ExactPublicMethods(n)
        } else if let Some(i) = &self.implement {
            Check::Implement(i.clone())
        } else if let Some(c) = &self.extend {
            Check::Extend(c.clone())
        } else if self.is_final {
            Check::Final
        } else {
            Check::Abstract
        };
        Ok(check)
    }
}

/// A compiled assertion.
#[derive(Debug, Clone)]
pub enum Check {
    NamePrefix(String),
    NameSuffix(String),
    NameMatching(Regex),
    Invokable,
    MaxPublicMethods(usize),
    MinPublicMethods(usize),
    ExactPublicMethods(usize),
    Implement(String),
    Extend(String),
    Final,
    Abstract,
}

impl Check {
    /// Apply this check to `chain`.
    pub fn apply<'s>(&self, chain: AssertionChain<'s>) -> AssertionChain<'s> {
        match self {
            Check::NamePrefix(p) => chain.have_name_prefix(p),
            Check::NameSuffix(s) => chain.have_name_suffix(s),
            Check::NameMatching(re) => chain.have_name_matching(re),
            Check::Invokable => chain.be_invokable(),
            Check::MaxPublicMethods(n) => chain.have_at_most_public_methods(*n),
            Check::MinPublicMethods(n) => chain.have_at_least_public_methods(*n),
            Check::ExactPublicMethods(n) => chain.have_exactly_public_methods(*n),
            Check::Implement(i) => chain.implement(i),
            Check::Extend(c) => chain.extend(c),
            Check::Final => chain.be_final(),
            Check::Abstract => chain.be_abstract(),
        }
    }
}

/// Validate a contract for correctness.
///
/// Regexes are compiled when the rule runs, so an invalid one fails only
/// that rule.
pub fn validate(contract: &Contract) -> anyhow::Result<()> {
    let mut seen = HashSet::new();
    for rule in &contract.rules {
        if rule.name.trim().is_empty() {
            anyhow::bail!("rule names must not be empty");
        }
        if !seen.insert(rule.name.as_str()) {
            anyhow::bail!("duplicate rule name {:?}", rule.name);
        }
        for (i, assertion) in rule.assertions.iter().enumerate() {
            let count = assertion.check_count();
            if count != 1 {
                anyhow::bail!(
                    "rule {:?}: assertion #{} must set exactly one check, found {}",
                    rule.name,
                    i + 1,
                    count
                );
            }
        }
    }

    if let Some(threshold) = contract.coverage_threshold {
        if !(0.0..=100.0).contains(&threshold) {
            anyhow::bail!("coverage_threshold must be between 0 and 100, got {}", threshold);
        }
    }

    contract.excluded_globset()?;
    Ok(())
}
