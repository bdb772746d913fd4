#[path = "../fixtures/mod.rs"]
mod fixtures;

use gridplan::core::report::{IssueKind, Severity, ValidationReport, ValidationStatus};
use gridplan::plugins::axes::*;
use gridplan::plugins::catalog::{SubscenarioCatalog, SubscenarioEntry};
use gridplan::plugins::composer::{ScenarioComposer, ScenarioRequest};
use gridplan::plugins::flags::*;
use gridplan::plugins::lifecycle::RunStatus;
use std::sync::Arc;

fn composer() -> ScenarioComposer {
    ScenarioComposer::new(Arc::new(fixtures::catalog()))
}

fn issues_on<'a>(
    report: &'a ValidationReport,
    axis: &'a str,
) -> impl Iterator<Item = &'a gridplan::core::report::ValidationIssue> + 'a {
    report.issues().iter().filter(move |i| i.axis_or_module == axis)
}

fn with_carbon_cap(request: ScenarioRequest) -> ScenarioRequest {
    request
        .with_ref(CARBON_CAP_ZONE_AXIS, 1)
        .with_ref("project_carbon_cap_zone_scenario_id", 1)
        .with_ref("carbon_cap_target_scenario_id", 1)
}

#[test]
fn base_request_resolves_cleanly() {
    let (resolved, report) = composer().resolve(&fixtures::base_request("base_case"));
    assert!(report.issues().is_empty(), "{:?}", report.issues());
    assert_eq!(resolved.validation_status, ValidationStatus::Valid);
    assert_eq!(resolved.run_status, RunStatus::Created);
    assert_eq!(resolved.scenario_id, None);
    assert_eq!(resolved.bound_axis_refs.len(), 10);
    assert_eq!(resolved.entry(LOAD_AXIS).unwrap().subscenario_id, 1);
    assert_eq!(resolved.fingerprint.len(), 64);
}

#[test]
fn resolve_is_idempotent() {
    let composer = composer();
    let request = with_carbon_cap(fixtures::fuels_request("twice")).with_flag(OF_CARBON_CAP, true);
    let (first, first_report) = composer.resolve(&request);
    let (second, second_report) = composer.resolve(&request);
    assert_eq!(first, second);
    assert_eq!(first_report.fingerprint(), second_report.fingerprint());
}

#[test]
fn enabled_flag_binds_gated_axes() {
    let request = with_carbon_cap(fixtures::base_request("cap")).with_flag(OF_CARBON_CAP, true);
    let (resolved, report) = composer().resolve(&request);
    assert!(report.issues().is_empty(), "{:?}", report.issues());
    for rule in gated_axes(OF_CARBON_CAP) {
        assert!(resolved.bound(rule.axis_name).is_some(), "{} unbound", rule.axis_name);
    }
}

#[test]
fn disabled_flag_ignores_refs_with_one_warning_each() {
    let request = with_carbon_cap(fixtures::base_request("cap_off")).with_flag(OF_CARBON_CAP, false);
    let (resolved, report) = composer().resolve(&request);
    assert_eq!(report.status(), ValidationStatus::Valid);
    for rule in gated_axes(OF_CARBON_CAP) {
        assert!(resolved.bound(rule.axis_name).is_none());
        let issues: Vec<_> = issues_on(&report, rule.axis_name).collect();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Warning);
        assert_eq!(issues[0].kind, IssueKind::FeatureMismatch);
    }
    assert_eq!(report.count(Severity::Warning), 3);
}

#[test]
fn enabled_flag_with_null_ref_is_fatal_reference_error() {
    let request = fixtures::base_request("cap_missing")
        .with_flag(OF_CARBON_CAP, true)
        .with_null(CARBON_CAP_ZONE_AXIS)
        .with_ref("project_carbon_cap_zone_scenario_id", 1)
        .with_ref("carbon_cap_target_scenario_id", 1);
    let (resolved, report) = composer().resolve(&request);
    assert_eq!(resolved.validation_status, ValidationStatus::Invalid);
    assert_eq!(report.count(Severity::Fatal), 1);
    let issue = issues_on(&report, CARBON_CAP_ZONE_AXIS).next().unwrap();
    assert_eq!(issue.kind, IssueKind::ReferenceError);
    assert_eq!(issue.severity, Severity::Fatal);
}

#[test]
fn missing_always_required_axis_is_fatal() {
    let mut request = fixtures::base_request("no_load");
    request.axis_refs.remove(LOAD_AXIS);
    let (_, report) = composer().resolve(&request);
    let issue = issues_on(&report, LOAD_AXIS).next().unwrap();
    assert_eq!((issue.severity, issue.kind), (Severity::Fatal, IssueKind::ReferenceError));
    assert!(issue.description.contains("always required"));
}

#[test]
fn unregistered_id_is_fatal() {
    let request = fixtures::base_request("bad_ref").with_ref(LOAD_AXIS, 77);
    let (resolved, report) = composer().resolve(&request);
    assert!(resolved.bound(LOAD_AXIS).is_none());
    let issue = issues_on(&report, LOAD_AXIS).next().unwrap();
    assert_eq!((issue.severity, issue.kind), (Severity::Fatal, IssueKind::ReferenceError));
}

#[test]
fn flag_implications_are_fatal_feature_mismatches() {
    let request = fixtures::base_request("imports").with_flag(OF_TRACK_CARBON_IMPORTS, true);
    let (_, report) = composer().resolve(&request);
    let mismatches: Vec<_> = issues_on(&report, OF_TRACK_CARBON_IMPORTS).collect();
    assert_eq!(mismatches.len(), 2);
    assert!(mismatches
        .iter()
        .all(|i| i.severity == Severity::Fatal && i.kind == IssueKind::FeatureMismatch));
}

#[test]
fn unknown_axes_and_flags_warn() {
    let request = fixtures::base_request("unknowns")
        .with_ref("weather_scenario_id", 1)
        .with_flag("of_unicorns", true);
    let (resolved, report) = composer().resolve(&request);
    assert_eq!(report.status(), ValidationStatus::Valid);
    assert!(resolved.bound("weather_scenario_id").is_none());
    let axis_issue = issues_on(&report, "weather_scenario_id").next().unwrap();
    assert_eq!((axis_issue.severity, axis_issue.kind), (Severity::Warning, IssueKind::ReferenceError));
    assert!(report
        .issues()
        .iter()
        .any(|i| i.kind == IssueKind::FeatureMismatch && i.description.contains("of_unicorns")));
}

fn markets_request(name: &str) -> ScenarioRequest {
    fixtures::base_request(name)
        .with_flag(OF_MARKETS, true)
        .with_ref("load_zone_market_scenario_id", 1)
        .with_ref("market_price_scenario_id", 1)
}

#[test]
fn cardinality_rules() {
    let composer = composer();

    let (_, report) = composer.resolve(&fixtures::base_request("list_on_single").with_refs(LOAD_AXIS, &[1]));
    let issue = issues_on(&report, LOAD_AXIS).next().unwrap();
    assert_eq!((issue.severity, issue.kind), (Severity::Fatal, IssueKind::ReferenceError));

    let (_, report) = composer.resolve(&markets_request("empty_multi").with_refs("market_scenario_id", &[]));
    let issue = issues_on(&report, "market_scenario_id").next().unwrap();
    assert_eq!((issue.severity, issue.kind), (Severity::Fatal, IssueKind::ReferenceError));

    let (resolved, report) =
        composer.resolve(&markets_request("dup_multi").with_refs("market_scenario_id", &[2, 1, 2]));
    assert_eq!(report.status(), ValidationStatus::Valid);
    assert_eq!(resolved.bound("market_scenario_id").unwrap().subscenario_ids(), vec![2, 1]);
    assert_eq!(issues_on(&report, "market_scenario_id").count(), 1);

    let (resolved, report) = composer.resolve(&markets_request("scalar_multi").with_ref("market_scenario_id", 1));
    assert!(report.issues().is_empty(), "{:?}", report.issues());
    assert_eq!(resolved.bound("market_scenario_id").unwrap().subscenario_ids(), vec![1]);
}

#[test]
fn cross_axis_membership_violation_is_fatal() {
    let mut catalog = SubscenarioCatalog::new();
    catalog
        .register_temporal(fixtures::temporal_entry(), fixtures::temporal_data())
        .unwrap();
    for entry in fixtures::entries() {
        if entry.category == "project_load_zone" {
            continue;
        }
        catalog.register(entry).unwrap();
    }
    catalog
        .register(
            SubscenarioEntry::new("project_load_zone", 1, "stray", "")
                .with_references(REF_PROJECT, ["gas_ct", "solar_9"])
                .with_references(REF_LOAD_ZONE, ["north"]),
        )
        .unwrap();

    let (_, report) = ScenarioComposer::new(Arc::new(catalog)).resolve(&fixtures::base_request("stray"));
    let issues: Vec<_> = issues_on(&report, PROJECT_LOAD_ZONE_AXIS).collect();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].kind, IssueKind::ReferenceError);
    assert!(issues[0].description.contains("solar_9"));
    assert!(!issues[0].description.contains("gas_ct"));
}

#[test]
fn references_into_a_disabled_axis_are_fatal() {
    // Gas-fired chars name fuel "gas" while of_fuels is off.
    let request = fixtures::base_request("fuel_off").with_ref(PROJECT_OPERATIONAL_CHARS_AXIS, 2);
    let (resolved, report) = composer().resolve(&request);
    assert_eq!(resolved.validation_status, ValidationStatus::Invalid);
    let issues: Vec<_> = issues_on(&report, PROJECT_OPERATIONAL_CHARS_AXIS).collect();
    assert_eq!(issues.len(), 1, "{:?}", report.issues());
    assert_eq!(issues[0].kind, IssueKind::ReferenceError);
    assert_eq!(issues[0].severity, Severity::Fatal);
    assert!(issues[0].description.contains("operational_chars_fuels"));
    assert!(issues[0].description.contains("gas"));
    assert!(issues[0].description.contains(OF_FUELS));
}

#[test]
fn fuel_free_chars_need_no_fuel_axis() {
    let (_, report) = composer().resolve(&fixtures::base_request("no_fuels"));
    assert!(report.issues().is_empty(), "{:?}", report.issues());

    let (_, report) = composer().resolve(&fixtures::fuels_request("fuels"));
    assert!(report.issues().is_empty(), "{:?}", report.issues());
}

#[test]
fn target_that_failed_to_bind_reports_only_its_own_issue() {
    let request = fixtures::fuels_request("missing_fuel").with_ref(FUEL_AXIS, 9);
    let (_, report) = composer().resolve(&request);
    assert!(issues_on(&report, FUEL_AXIS).any(|i| i.severity == Severity::Fatal));
    assert_eq!(issues_on(&report, PROJECT_OPERATIONAL_CHARS_AXIS).count(), 0);
}

#[test]
fn request_json_round_trip() {
    let request = markets_request("json").with_refs("market_scenario_id", &[1, 2]).with_null(FUEL_AXIS);
    let text = serde_json::to_string(&request).unwrap();
    let back: ScenarioRequest = serde_json::from_str(&text).unwrap();
    assert_eq!(back, request);
}

#[test]
fn fingerprint_tracks_bindings() {
    let composer = composer();
    let (a, _) = composer.resolve(&markets_request("fp").with_refs("market_scenario_id", &[1]));
    let (b, _) = composer.resolve(&markets_request("fp").with_refs("market_scenario_id", &[1, 2]));
    assert_ne!(a.fingerprint, b.fingerprint);
}
