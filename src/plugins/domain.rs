//! Domain rules over operational characteristics.
//!
//! Each operational type requires some characteristic fields and forbids others.
//! The tables are static; `check_domain` applies them to the bound
//! operational-characteristics subscenarios of a resolved scenario.

use crate::core::report::{IssueKind, ValidationReport};
use crate::plugins::axes::{PROJECT_OPERATIONAL_CHARS_AXIS, TRANSMISSION_OPERATIONAL_CHARS_AXIS};
use crate::plugins::catalog::SubscenarioEntry;
use crate::plugins::composer::ResolvedScenario;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

pub const OPERATIONAL_TYPE_FIELD: &str = "operational_type";
pub const FUEL_FIELD: &str = "fuel";
pub const HEAT_RATE_FIELD: &str = "heat_rate_curves_scenario_id";

#[derive(Debug, Clone, Serialize)]
pub struct OperationalTypeRule {
    pub operational_type: &'static str,
    pub required: &'static [&'static str],
    pub forbidden: &'static [&'static str],
}

const fn rule(
    operational_type: &'static str,
    required: &'static [&'static str],
    forbidden: &'static [&'static str],
) -> OperationalTypeRule {
    OperationalTypeRule {
        operational_type,
        required,
        forbidden,
    }
}

const STORAGE_FIELDS: &[&str] = &["charging_efficiency", "discharging_efficiency"];

pub static PROJECT_OPERATIONAL_TYPES: &[OperationalTypeRule] = &[
    rule("gen_simple", &[], &["min_stable_level_fraction", "charging_efficiency", "discharging_efficiency"]),
    rule("gen_commit_bin", &["min_stable_level_fraction"], STORAGE_FIELDS),
    rule("gen_commit_lin", &["min_stable_level_fraction"], STORAGE_FIELDS),
    rule("gen_commit_cap", &["min_stable_level_fraction", "unit_size_mw"], STORAGE_FIELDS),
    rule("gen_must_run", &[], &["min_stable_level_fraction", "startup_cost_per_mw", "shutdown_cost_per_mw"]),
    rule("gen_always_on", &["min_stable_level_fraction"], &["startup_cost_per_mw", "shutdown_cost_per_mw"]),
    rule("gen_var", &["variable_generator_profile_scenario_id"], &[FUEL_FIELD, HEAT_RATE_FIELD, "min_stable_level_fraction"]),
    rule("gen_var_must_take", &["variable_generator_profile_scenario_id"], &[FUEL_FIELD, HEAT_RATE_FIELD, "min_stable_level_fraction"]),
    rule("gen_hydro", &["hydro_operational_chars_scenario_id"], &[FUEL_FIELD, HEAT_RATE_FIELD]),
    rule("gen_hydro_must_take", &["hydro_operational_chars_scenario_id"], &[FUEL_FIELD, HEAT_RATE_FIELD]),
    rule("stor", STORAGE_FIELDS, &[FUEL_FIELD, HEAT_RATE_FIELD, "min_stable_level_fraction"]),
    rule("dr", &[], &[FUEL_FIELD, HEAT_RATE_FIELD]),
];

pub static TRANSMISSION_OPERATIONAL_TYPES: &[OperationalTypeRule] = &[
    rule("tx_simple", &[], &["reactance_ohms"]),
    rule("tx_dcopf", &["reactance_ohms"], &[]),
    rule("tx_simple_binary", &[], &["reactance_ohms"]),
];

/// Fields constrained to the unit interval. `true` excludes zero.
static FRACTION_FIELDS: &[(&str, bool)] = &[
    ("min_stable_level_fraction", false),
    ("charging_efficiency", true),
    ("discharging_efficiency", true),
];

pub fn find_operational_type(
    table: &'static [OperationalTypeRule],
    operational_type: &str,
) -> Option<&'static OperationalTypeRule> {
    table.iter().find(|r| r.operational_type == operational_type)
}

fn present(attrs: &BTreeMap<String, JsonValue>, field: &str) -> bool {
    attrs.get(field).is_some_and(|v| !v.is_null())
}

/// Problems with one member's characteristics, as human-readable strings.
pub fn check_member(
    table: &'static [OperationalTypeRule],
    member: &str,
    attrs: &BTreeMap<String, JsonValue>,
) -> Vec<String> {
    let mut problems = Vec::new();
    let op_type = match attrs.get(OPERATIONAL_TYPE_FIELD).and_then(JsonValue::as_str) {
        Some(t) => t,
        None => {
            problems.push(format!("{}: {} is missing", member, OPERATIONAL_TYPE_FIELD));
            return problems;
        }
    };
    let Some(rule) = find_operational_type(table, op_type) else {
        problems.push(format!("{}: unknown {} '{}'", member, OPERATIONAL_TYPE_FIELD, op_type));
        return problems;
    };

    for field in rule.required {
        if !present(attrs, field) {
            problems.push(format!("{}: {} requires {}", member, op_type, field));
        }
    }
    for field in rule.forbidden {
        if present(attrs, field) {
            problems.push(format!("{}: {} may not set {}", member, op_type, field));
        }
    }
    if present(attrs, FUEL_FIELD) && !present(attrs, HEAT_RATE_FIELD) {
        problems.push(format!(
            "{}: a fuel requires {}",
            member, HEAT_RATE_FIELD
        ));
    }
    for (field, exclusive_zero) in FRACTION_FIELDS {
        let Some(value) = attrs.get(*field).filter(|v| !v.is_null()) else {
            continue;
        };
        match value.as_f64() {
            Some(v) if v <= 1.0 && (v > 0.0 || (!exclusive_zero && v == 0.0)) => {}
            Some(v) => problems.push(format!("{}: {} = {} is out of range", member, field, v)),
            None => problems.push(format!("{}: {} must be a number", member, field)),
        }
    }
    problems
}

fn check_entry(
    table: &'static [OperationalTypeRule],
    axis: &str,
    entry: &SubscenarioEntry,
    report: &mut ValidationReport,
) {
    for (member, attrs) in &entry.payload.attributes {
        for problem in check_member(table, member, attrs) {
            report.fatal(IssueKind::ConstraintViolation, axis, problem);
        }
    }
}

/// Operational-type rules over the scenario's bound characteristics.
pub fn check_domain(resolved: &ResolvedScenario) -> ValidationReport {
    let mut report = ValidationReport::new();
    for (axis, table) in [
        (PROJECT_OPERATIONAL_CHARS_AXIS, PROJECT_OPERATIONAL_TYPES),
        (TRANSMISSION_OPERATIONAL_CHARS_AXIS, TRANSMISSION_OPERATIONAL_TYPES),
    ] {
        if let Some(entry) = resolved.entry(axis) {
            check_entry(table, axis, entry, &mut report);
        }
    }
    report
}
