#[path = "../fixtures/mod.rs"]
mod fixtures;

use gridplan::core::config::EngineConfig;
use gridplan::core::report::{IssueKind, Severity, ValidationStatus};
use gridplan::plugins::axes::*;
use gridplan::plugins::catalog::{SubscenarioCatalog, SubscenarioEntry};
use gridplan::plugins::flags::OF_CARBON_CAP;
use gridplan::plugins::validation::ValidationEngine;
use serde_json::json;
use std::sync::Arc;

fn engine(catalog: SubscenarioCatalog) -> ValidationEngine {
    ValidationEngine::new(Arc::new(catalog), &EngineConfig::default())
}

fn portfolio(gas_periods: serde_json::Value, wind_vintage: i64) -> SubscenarioEntry {
    SubscenarioEntry::new("project_portfolio", 1, "gas and wind", "")
        .with_members(["gas_ct", "wind_1"])
        .with_attributes("gas_ct", json!({ "capacity_type": "existing", "periods": gas_periods }))
        .with_attributes(
            "wind_1",
            json!({ "capacity_type": "new_build", "vintage": wind_vintage, "operational_lifetime_periods": 10 }),
        )
}

#[test]
fn base_scenario_is_valid() {
    let (resolved, report) = engine(fixtures::catalog()).resolve_and_validate(&fixtures::base_request("base"));
    assert!(report.issues().is_empty(), "{:?}", report.issues());
    assert_eq!(resolved.validation_status, ValidationStatus::Valid);
}

#[test]
fn carbon_cap_without_zone_is_invalid_with_one_fatal() {
    let request = fixtures::base_request("cap_no_zone")
        .with_flag(OF_CARBON_CAP, true)
        .with_null(CARBON_CAP_ZONE_AXIS)
        .with_ref("project_carbon_cap_zone_scenario_id", 1)
        .with_ref("carbon_cap_target_scenario_id", 1);
    let (resolved, report) = engine(fixtures::catalog()).resolve_and_validate(&request);
    assert_eq!(resolved.validation_status, ValidationStatus::Invalid);
    let fatal: Vec<_> = report
        .issues()
        .iter()
        .filter(|i| i.severity == Severity::Fatal)
        .collect();
    assert_eq!(fatal.len(), 1, "{:?}", report.issues());
    assert_eq!(fatal[0].kind, IssueKind::ReferenceError);
    assert_eq!(fatal[0].axis_or_module, CARBON_CAP_ZONE_AXIS);
}

#[test]
fn operational_type_rules_are_constraint_violations() {
    let chars = SubscenarioEntry::new("project_operational_chars", 1, "broken", "")
        .with_references(REF_PROJECT, ["gas_ct", "wind_1"])
        .with_attributes("gas_ct", json!({ "operational_type": "stor", "charging_efficiency": 0.9 }))
        .with_attributes("wind_1", json!({ "operational_type": "gen_warp" }));
    let (resolved, report) =
        engine(fixtures::catalog_with(vec![chars])).resolve_and_validate(&fixtures::base_request("chars"));
    assert_eq!(resolved.validation_status, ValidationStatus::Invalid);
    let on_chars: Vec<_> = report
        .issues()
        .iter()
        .filter(|i| i.axis_or_module == PROJECT_OPERATIONAL_CHARS_AXIS)
        .collect();
    assert_eq!(on_chars.len(), 2, "{:?}", on_chars);
    assert!(on_chars
        .iter()
        .all(|i| i.kind == IssueKind::ConstraintViolation && i.severity == Severity::Fatal));
}

#[test]
fn asset_outside_study_is_temporal_inconsistency() {
    let (_, report) = engine(fixtures::catalog_with(vec![portfolio(json!([2020]), 2040)]))
        .resolve_and_validate(&fixtures::base_request("late_wind"));
    let issue = report
        .issues()
        .iter()
        .find(|i| i.axis_or_module == PROJECT_PORTFOLIO_AXIS)
        .unwrap();
    assert_eq!((issue.severity, issue.kind), (Severity::Fatal, IssueKind::TemporalInconsistency));
    assert!(issue.description.contains("wind_1"));
}

#[test]
fn out_of_study_existing_periods_warn_when_configured() {
    let catalog = Arc::new(fixtures::catalog_with(vec![portfolio(json!([2020, 2045]), 2020)]));
    let request = fixtures::base_request("old_gas");

    let (resolved, report) = ValidationEngine::new(Arc::clone(&catalog), &EngineConfig::default())
        .resolve_and_validate(&request);
    assert_eq!(resolved.validation_status, ValidationStatus::Valid);
    assert_eq!(report.count(Severity::Warning), 1);
    assert!(report.issues()[0].description.contains("2045"));

    let mut quiet = EngineConfig::default();
    quiet.validation.warn_on_out_of_study_periods = false;
    let (_, report) = ValidationEngine::new(catalog, &quiet).resolve_and_validate(&request);
    assert!(report.issues().is_empty());
}

#[test]
fn existing_asset_entirely_outside_study_is_fatal() {
    let (resolved, report) = engine(fixtures::catalog_with(vec![portfolio(json!([2050, 2055]), 2020)]))
        .resolve_and_validate(&fixtures::base_request("stranded_gas"));
    assert_eq!(resolved.validation_status, ValidationStatus::Invalid);
    let on_portfolio: Vec<_> = report
        .issues()
        .iter()
        .filter(|i| i.axis_or_module == PROJECT_PORTFOLIO_AXIS)
        .collect();
    assert_eq!(on_portfolio.len(), 1, "{:?}", report.issues());
    assert_eq!(
        (on_portfolio[0].severity, on_portfolio[0].kind),
        (Severity::Fatal, IssueKind::TemporalInconsistency)
    );
    assert!(on_portfolio[0].description.contains("gas_ct"));
}

#[test]
fn fuel_references_with_fuels_disabled_invalidate_the_scenario() {
    let request = fixtures::base_request("fuel_off").with_ref(PROJECT_OPERATIONAL_CHARS_AXIS, 2);
    let (resolved, report) = engine(fixtures::catalog()).resolve_and_validate(&request);
    assert_eq!(resolved.validation_status, ValidationStatus::Invalid);
    assert!(report.issues().iter().any(|i| i.severity == Severity::Fatal
        && i.kind == IssueKind::ReferenceError
        && i.axis_or_module == PROJECT_OPERATIONAL_CHARS_AXIS));
}

#[test]
fn malformed_capacity_attributes_are_reported() {
    let bad = SubscenarioEntry::new("project_portfolio", 1, "mixed", "")
        .with_members(["gas_ct", "wind_1"])
        .with_attributes("gas_ct", json!({ "capacity_type": "existing", "vintage": 2020, "periods": [2020] }))
        .with_attributes("wind_1", json!({ "capacity_type": "new_build", "vintage": 2020 }));
    let (_, report) = engine(fixtures::catalog_with(vec![bad])).resolve_and_validate(&fixtures::base_request("mixed"));
    let on_portfolio: Vec<_> = report
        .issues()
        .iter()
        .filter(|i| i.axis_or_module == PROJECT_PORTFOLIO_AXIS)
        .collect();
    assert_eq!(on_portfolio.len(), 2);
    assert!(on_portfolio
        .iter()
        .all(|i| i.kind == IssueKind::ConstraintViolation));
}

#[test]
fn temporal_entry_without_data_is_fatal() {
    let mut catalog = SubscenarioCatalog::new();
    catalog.register(fixtures::temporal_entry()).unwrap();
    for entry in fixtures::entries() {
        catalog.register(entry).unwrap();
    }
    let (_, report) = engine(catalog).resolve_and_validate(&fixtures::base_request("no_data"));
    let issue = report
        .issues()
        .iter()
        .find(|i| i.axis_or_module == TEMPORAL_AXIS)
        .unwrap();
    assert_eq!((issue.severity, issue.kind), (Severity::Fatal, IssueKind::TemporalInconsistency));
}

#[test]
fn validate_recomputes_and_sets_status() {
    let engine = engine(fixtures::catalog());
    let (mut resolved, first) = engine.resolve_and_validate(&fixtures::base_request("again"));
    resolved.validation_status = ValidationStatus::Pending;
    let second = engine.validate(&mut resolved);
    assert_eq!(resolved.validation_status, ValidationStatus::Valid);
    assert_eq!(first.fingerprint(), second.fingerprint());
}
