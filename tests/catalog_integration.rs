//! Catalog, selector and assertion chain over the fixture trees.

use std::path::PathBuf;

use archcheck::catalog::CatalogBuilder;
use archcheck::coverage::RelationshipCriterion;
use archcheck::{
    AssertionChain, AssertionFailure, Catalog, CoverageCalculator, Criterion, RuleCategory,
    RunState, Selector, TestId, TypeKind,
};

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn pair_catalog() -> Catalog {
    Catalog::discover(&[testdata_path().join("pair")])
}

#[test]
fn test_empty_namespace_selects_both_files() {
    let catalog = pair_catalog();
    let selected = Selector::new().in_namespace("").get(&catalog);
    let names: Vec<_> = selected.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Foo", "Baz"]);

    let foo = catalog.get("Foo").unwrap();
    assert!(foo.is_final);
    assert!(foo.implements_directly("Bar"));
    assert!(foo.declaring_file.as_ref().unwrap().ends_with("A.php"));
}

#[test]
fn test_suffix_rule_reports_every_type() {
    let catalog = pair_catalog();
    let mut state = RunState::new();
    let selected = Selector::new().in_namespace("").get(&catalog);

    let failure = AssertionChain::that(&mut state, selected)
        .have_name_suffix("Service")
        .resolve("must be services")
        .unwrap_err();

    assert_eq!(failure.violations().len(), 2);
    let message = failure.to_string();
    assert!(message.starts_with("must be services"));
    assert!(message.contains("Foo"));
    assert!(message.contains("Baz"));
}

#[test]
fn test_implement_rule_scores_relationship() {
    let catalog = pair_catalog();
    let mut state = RunState::new();
    state.clear();
    state.set_context(TestId::new("PairTest", "foo_implements_bar"));

    let foo = Selector::new().matching(regex::Regex::new("^Foo$").unwrap()).get(&catalog);
    assert_eq!(foo.len(), 1);
    AssertionChain::that(&mut state, foo.clone())
        .implement("Bar")
        .resolve("Foo implements Bar")
        .unwrap();
    state.clear_context();

    let file = foo[0].declaring_file.as_ref().unwrap().to_string_lossy().to_string();
    let usage = state.ledger().get(&file, "Foo").unwrap();
    assert!(usage.has(RuleCategory::Implement));
    assert!(usage
        .tests
        .contains(&TestId::new("PairTest", "foo_implements_bar")));

    assert_eq!(RelationshipCriterion.earned_points(&foo[0], usage), 1);
    assert_eq!(RelationshipCriterion.max_points(&foo[0]), 1);

    let report = CoverageCalculator::new().ledger_report(&catalog, state.ledger());
    assert_eq!(report.files.len(), 1);
    assert_eq!(report.files[0].types[0].earned, 2);
}

#[test]
fn test_selector_has_no_matches_outside_catalog() {
    let catalog = pair_catalog();
    let mut state = RunState::new();
    let none = Selector::new().in_namespace("App").get(&catalog);
    assert_eq!(
        AssertionChain::that(&mut state, none).resolve("unused"),
        Err(AssertionFailure::NoMatches)
    );
}

#[test]
fn test_app_catalog_skips_broken_and_excluded_files() {
    let app = testdata_path().join("app").join("src");
    let mut excluded = globset::GlobSetBuilder::new();
    excluded.add(globset::Glob::new("**/Legacy/**").unwrap());
    let catalog = CatalogBuilder::new()
        .excluding(excluded.build().unwrap())
        .build(&[app]);

    let names: Vec<_> = catalog.user_types().map(|t| t.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "App\\Http\\Controller\\AbstractController",
            "App\\Http\\Controller\\HomeController",
            "App\\Service\\Mailer",
            "App\\Service\\OrderService",
            "App\\Service\\OrderServiceInterface",
            "App\\UseCase\\PlaceOrder",
        ]
    );

    let service = catalog.get("App\\Service\\OrderService").unwrap();
    assert!(service.implements_directly("App\\Service\\OrderServiceInterface"));
    assert_eq!(service.public_method_count(), 2);

    let interface = catalog.get("app\\service\\orderserviceinterface").unwrap();
    assert_eq!(interface.kind, TypeKind::Interface);
    assert!(interface.methods.iter().all(|m| m.is_abstract));

    assert!(catalog.get("Countable").unwrap().is_internal);
    assert!(!catalog.contains("App\\Legacy\\OldThing"));
    assert!(!catalog.contains("App\\Broken"));
}

#[test]
fn test_selectors_branch_from_a_shared_base() {
    let app = testdata_path().join("app").join("src");
    let catalog = Catalog::discover(&[app]);

    let base = Selector::new().in_namespace("App\\Service");
    assert_eq!(base.get(&catalog).len(), 3);
    assert_eq!(base.excluding_interfaces().get(&catalog).len(), 2);
    assert_eq!(
        base.implementing("App\\Service\\OrderServiceInterface")
            .get(&catalog)
            .len(),
        1
    );

    let controllers = Selector::new().extending("App\\Http\\Controller\\AbstractController");
    let found = controllers.get(&catalog);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].short_name(), "HomeController");
}
