//! Fluent rule evaluation over a selection of types.

use regex::Regex;
use serde::Serialize;

use super::ledger::{RuleCategory, RunState};
use crate::catalog::TypeDescriptor;

/// One type failing one rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub type_name: String,
    pub message: String,
}

/// Failure returned by [`AssertionChain::resolve`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssertionFailure {
    #[error("no classes matched the selector")]
    NoMatches,
    #[error("{}", render(.summary, .violations))]
    Violations {
        summary: String,
        violations: Vec<Violation>,
    },
}

impl AssertionFailure {
    pub fn violations(&self) -> &[Violation] {
        match self {
            AssertionFailure::NoMatches => &[],
            AssertionFailure::Violations { violations, .. } => violations,
        }
    }
}

fn render(summary: &str, violations: &[Violation]) -> String {
    let mut out = summary.to_string();
    for v in violations {
        out.push_str("\n - ");
        out.push_str(&v.message);
    }
    out
}

/// Evaluates rules against a fixed selection of types.
///
/// Every rule checks every selected type and keeps going past failures;
/// all violations are reported together by [`resolve`](Self::resolve).
/// Name, relationship and modifier rules record their category for each
/// selected type in the run's ledger, pass or fail, while a test context
/// is set.
#[must_use = "an assertion chain does nothing until resolved"]
pub struct AssertionChain<'s> {
    state: &'s mut RunState,
    types: Vec<TypeDescriptor>,
    violations: Vec<Violation>,
}

impl<'s> AssertionChain<'s> {
    /// Start a chain over `types`, registering them with the current test.
    pub fn that(state: &'s mut RunState, types: Vec<TypeDescriptor>) -> Self {
        for ty in &types {
            state.record_test(&ty.file_key(), &ty.name);
        }
        Self {
            state,
            types,
            violations: Vec::new(),
        }
    }

    pub fn types(&self) -> &[TypeDescriptor] {
        &self.types
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn have_name_prefix(self, prefix: &str) -> Self {
        self.check(
            Some(RuleCategory::NamePrefix),
            |ty| ty.short_name().starts_with(prefix),
            |ty| format!("{} should have name prefix \"{}\"", ty.name, prefix),
        )
    }

    pub fn have_name_suffix(self, suffix: &str) -> Self {
        self.check(
            Some(RuleCategory::NameSuffix),
            |ty| ty.short_name().ends_with(suffix),
            |ty| format!("{} should have name suffix \"{}\"", ty.name, suffix),
        )
    }

    /// The short name must contain a match for `pattern`.
    pub fn have_name_matching(self, pattern: &Regex) -> Self {
        self.check(
            Some(RuleCategory::NamePattern),
            |ty| pattern.is_match(ty.short_name()),
            |ty| format!("{} should have a name matching /{}/", ty.name, pattern.as_str()),
        )
    }

    pub fn be_invokable(self) -> Self {
        self.check(
            None,
            |ty| ty.has_public_method("__invoke"),
            |ty| format!("{} should be invokable (public __invoke method)", ty.name),
        )
    }

    pub fn have_at_most_public_methods(self, max: usize) -> Self {
        self.check(
            None,
            |ty| ty.public_method_count() <= max,
            |ty| {
                format!(
                    "{} should have at most {} public methods, has {}",
                    ty.name,
                    max,
                    ty.public_method_count()
                )
            },
        )
    }

    pub fn have_at_least_public_methods(self, min: usize) -> Self {
        self.check(
            None,
            |ty| ty.public_method_count() >= min,
            |ty| {
                format!(
                    "{} should have at least {} public methods, has {}",
                    ty.name,
                    min,
                    ty.public_method_count()
                )
            },
        )
    }

    pub fn have_exactly_public_methods(self, count: usize) -> Self {
        self.check(
            None,
            |ty| ty.public_method_count() == count,
            |ty| {
                format!(
                    "{} should have exactly {} public methods, has {}",
                    ty.name,
                    count,
                    ty.public_method_count()
                )
            },
        )
    }

    /// `interface` must be among the directly declared interfaces.
    pub fn implement(self, interface: &str) -> Self {
        self.check(
            Some(RuleCategory::Implement),
            |ty| ty.implements_directly(interface),
            |ty| format!("{} should implement {}", ty.name, interface),
        )
    }

    /// `class` must be the directly declared parent.
    pub fn extend(self, class: &str) -> Self {
        self.check(
            Some(RuleCategory::Extend),
            |ty| ty.extends_directly(class),
            |ty| format!("{} should extend {}", ty.name, class),
        )
    }

    pub fn be_final(self) -> Self {
        self.check(
            Some(RuleCategory::Modifier),
            |ty| ty.is_final,
            |ty| format!("{} should be final", ty.name),
        )
    }

    pub fn be_abstract(self) -> Self {
        self.check(
            Some(RuleCategory::Modifier),
            |ty| ty.is_abstract,
            |ty| format!("{} should be abstract", ty.name),
        )
    }

    fn check<P, M>(mut self, category: Option<RuleCategory>, passes: P, describe: M) -> Self
    where
        P: Fn(&TypeDescriptor) -> bool,
        M: Fn(&TypeDescriptor) -> String,
    {
        for ty in &self.types {
            if !passes(ty) {
                self.violations.push(Violation {
                    type_name: ty.name.clone(),
                    message: describe(ty),
                });
            }
            if let Some(category) = category {
                self.state.record_category(&ty.file_key(), &ty.name, category);
            }
        }
        self
    }

    /// Finish the chain.
    ///
    /// An empty selection fails with [`AssertionFailure::NoMatches`] even when
    /// no rule was applied.
    pub fn resolve(self, summary: &str) -> Result<(), AssertionFailure> {
        if self.types.is_empty() {
            return Err(AssertionFailure::NoMatches);
        }
        if !self.violations.is_empty() {
            return Err(AssertionFailure::Violations {
                summary: summary.to_string(),
                violations: self.violations,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assertion::TestId;
    use crate::catalog::{MethodDescriptor, TypeKind, Visibility};

    fn foo() -> TypeDescriptor {
        let mut ty = TypeDescriptor::new(TypeKind::Class, "Foo")
            .with_file("A.php")
            .with_interface("Bar");
        ty.is_final = true;
        ty
    }

    fn baz() -> TypeDescriptor {
        TypeDescriptor::new(TypeKind::Class, "Baz").with_file("B.php")
    }

    #[test]
    fn test_violations_across_all_types() {
        let mut state = RunState::new();
        let err = AssertionChain::that(&mut state, vec![foo(), baz()])
            .have_name_suffix("Service")
            .resolve("must be services")
            .unwrap_err();

        let message = err.to_string();
        assert!(message.starts_with("must be services\n - "));
        assert!(message.contains("Foo"));
        assert!(message.contains("Baz"));
        assert_eq!(err.violations().len(), 2);
    }

    #[test]
    fn test_rules_do_not_affect_each_other() {
        let mut state = RunState::new();
        let chain = AssertionChain::that(&mut state, vec![foo(), baz()])
            .have_name_prefix("F")
            .implement("Bar");
        let names: Vec<_> = chain
            .violations()
            .iter()
            .map(|v| v.type_name.as_str())
            .collect();
        assert_eq!(names, vec!["Baz", "Baz"]);
    }

    #[test]
    fn test_empty_selection_reports_no_matches() {
        let mut state = RunState::new();
        let result = AssertionChain::that(&mut state, Vec::new()).resolve("anything");
        assert_eq!(result, Err(AssertionFailure::NoMatches));

        let result = AssertionChain::that(&mut state, Vec::new())
            .have_name_prefix("X")
            .resolve("anything");
        assert_eq!(
            result.unwrap_err().to_string(),
            "no classes matched the selector"
        );
    }

    #[test]
    fn test_usage_recorded_under_context() {
        let mut state = RunState::new();
        state.set_context(TestId::new("Arch", "relations"));
        AssertionChain::that(&mut state, vec![foo()])
            .implement("Bar")
            .implement("Bar")
            .be_invokable()
            .resolve("ignored")
            .unwrap_err();

        let usage = state.ledger().get("A.php", "Foo").unwrap();
        assert_eq!(usage.categories.iter().collect::<Vec<_>>(), vec![&RuleCategory::Implement]);
        assert!(usage.tests.contains(&TestId::new("Arch", "relations")));
    }

    #[test]
    fn test_category_recorded_even_when_rule_fails() {
        let mut state = RunState::new();
        state.set_context(TestId::new("Arch", "naming"));
        let _ = AssertionChain::that(&mut state, vec![baz()])
            .have_name_prefix("Nope")
            .resolve("naming");

        assert!(state
            .ledger()
            .get("B.php", "Baz")
            .unwrap()
            .has(RuleCategory::NamePrefix));
    }

    #[test]
    fn test_public_method_rules() {
        let handler = TypeDescriptor::new(TypeKind::Class, "Handler")
            .with_method(MethodDescriptor::new("__construct", Visibility::Public))
            .with_method(MethodDescriptor::new("__invoke", Visibility::Public))
            .with_method(MethodDescriptor::new("secret", Visibility::Private));

        let mut state = RunState::new();
        assert!(AssertionChain::that(&mut state, vec![handler.clone()])
            .be_invokable()
            .have_exactly_public_methods(1)
            .have_at_most_public_methods(1)
            .have_at_least_public_methods(1)
            .resolve("single action")
            .is_ok());

        let err = AssertionChain::that(&mut state, vec![handler])
            .have_at_least_public_methods(2)
            .resolve("too small")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "too small\n - Handler should have at least 2 public methods, has 1"
        );
    }

    #[test]
    fn test_modifier_rules() {
        let mut state = RunState::new();
        let err = AssertionChain::that(&mut state, vec![foo(), baz()])
            .be_final()
            .be_abstract()
            .resolve("modifiers")
            .unwrap_err();
        let messages: Vec<_> = err.violations().iter().map(|v| v.message.as_str()).collect();
        assert_eq!(
            messages,
            vec!["Baz should be final", "Foo should be abstract", "Baz should be abstract"]
        );
    }
}
