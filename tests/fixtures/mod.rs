//! Shared catalog and request fixtures for the integration tests.
#![allow(dead_code)]

use gridplan::plugins::axes::*;
use gridplan::plugins::catalog::{self, SubscenarioCatalog, SubscenarioEntry, TEMPORAL_CATEGORY};
use gridplan::plugins::composer::ScenarioRequest;
use gridplan::plugins::temporal::{Boundary, Horizon, Period, TemporalSubscenario, Timepoint};
use serde_json::json;
use std::path::Path;

pub const STUDY_PERIODS: [i64; 4] = [2020, 2025, 2030, 2035];

/// Four five-year periods, two timepoints each, one `day` horizon per period
/// (circular) and one `year` horizon per period (linear).
pub fn temporal_data() -> TemporalSubscenario {
    let mut data = TemporalSubscenario::default();
    for (i, period) in STUDY_PERIODS.iter().enumerate() {
        let i = i as i64;
        data.periods.push(Period {
            period: *period,
            discount_factor: 1.0,
            period_weight: 5.0,
        });
        let tmps = [i * 2 + 1, i * 2 + 2];
        for tmp in tmps {
            data.timepoints.push(Timepoint {
                id: tmp,
                period: *period,
                weight: 182.5,
                duration_hours: 24.0,
            });
        }
        data.horizons.push(Horizon {
            id: i + 1,
            balancing_type: "day".to_string(),
            boundary: Boundary::Circular,
            timepoints: tmps.to_vec(),
        });
        data.horizons.push(Horizon {
            id: 100 + i,
            balancing_type: "year".to_string(),
            boundary: Boundary::Linear,
            timepoints: tmps.to_vec(),
        });
    }
    data
}

pub fn temporal_entry() -> SubscenarioEntry {
    SubscenarioEntry::new(TEMPORAL_CATEGORY, 1, "4 periods, 2 days", "test study")
}

/// Every non-temporal entry the fixtures bind.
pub fn entries() -> Vec<SubscenarioEntry> {
    vec![
        SubscenarioEntry::new("load_zone", 1, "two zones", "").with_members(["north", "south"]),
        SubscenarioEntry::new("load", 1, "base load", "")
            .with_references(REF_LOAD_ZONE, ["north", "south"]),
        SubscenarioEntry::new("project_portfolio", 1, "gas and wind", "")
            .with_members(["gas_ct", "wind_1"])
            .with_attributes("gas_ct", json!({ "capacity_type": "existing", "periods": [2020, 2025] }))
            .with_attributes(
                "wind_1",
                json!({ "capacity_type": "new_build", "vintage": 2020, "operational_lifetime_periods": 10 }),
            ),
        SubscenarioEntry::new("project_operational_chars", 1, "base chars", "")
            .with_references(REF_PROJECT, ["gas_ct", "wind_1"])
            .with_attributes("gas_ct", json!({ "operational_type": "gen_simple" }))
            .with_attributes(
                "wind_1",
                json!({ "operational_type": "gen_var", "variable_generator_profile_scenario_id": 1 }),
            ),
        SubscenarioEntry::new("project_operational_chars", 2, "gas-fired chars", "")
            .with_references(REF_PROJECT, ["gas_ct", "wind_1"])
            .with_references(REF_FUEL, ["gas"])
            .with_attributes(
                "gas_ct",
                json!({ "operational_type": "gen_simple", "fuel": "gas", "heat_rate_curves_scenario_id": 1 }),
            )
            .with_attributes(
                "wind_1",
                json!({ "operational_type": "gen_var", "variable_generator_profile_scenario_id": 1 }),
            ),
        SubscenarioEntry::new("project_load_zone", 1, "zones", "")
            .with_references(REF_PROJECT, ["gas_ct", "wind_1"])
            .with_references(REF_LOAD_ZONE, ["north", "south"]),
        SubscenarioEntry::new("project_specified_capacity", 1, "existing", "")
            .with_references(REF_PROJECT, ["gas_ct"]),
        SubscenarioEntry::new("project_availability", 1, "always", "")
            .with_references(REF_PROJECT, ["gas_ct", "wind_1"]),
        SubscenarioEntry::new("project_new_cost", 1, "costs", "")
            .with_references(REF_PROJECT, ["wind_1"]),
        SubscenarioEntry::new("project_new_potential", 1, "unbounded", ""),
        SubscenarioEntry::new("fuel", 1, "gas", "").with_members(["gas"]),
        SubscenarioEntry::new("fuel_price", 1, "flat", "").with_references(REF_FUEL, ["gas"]),
        SubscenarioEntry::new("carbon_cap_zone", 1, "state", "").with_members(["ca"]),
        SubscenarioEntry::new("project_carbon_cap_zone", 1, "gas in cap", "")
            .with_references(REF_PROJECT, ["gas_ct"])
            .with_references("carbon_cap_zone", ["ca"]),
        SubscenarioEntry::new("carbon_cap_target", 1, "declining", ""),
        SubscenarioEntry::new("market", 1, "day-ahead", ""),
        SubscenarioEntry::new("market", 2, "real-time", ""),
        SubscenarioEntry::new("load_zone_market", 1, "north", "")
            .with_references(REF_LOAD_ZONE, ["north"]),
        SubscenarioEntry::new("market_price", 1, "flat", ""),
    ]
}

pub fn catalog() -> SubscenarioCatalog {
    let mut catalog = SubscenarioCatalog::new();
    catalog
        .register_temporal(temporal_entry(), temporal_data())
        .expect("temporal");
    for entry in entries() {
        catalog.register(entry).expect("register");
    }
    catalog
}

/// Writes the fixture catalog to `catalog.db` under `root`.
pub fn persist_catalog(root: &Path) {
    catalog::initialize_catalog_db(root).expect("catalog init");
    catalog::save_temporal(root, "loader", &temporal_entry(), &temporal_data()).expect("save temporal");
    for entry in entries() {
        catalog::save_entry(root, "loader", &entry).expect("save entry");
    }
}

/// A request binding every always-required axis; resolves with no issues.
pub fn base_request(name: &str) -> ScenarioRequest {
    ScenarioRequest::new(name)
        .with_ref(TEMPORAL_AXIS, 1)
        .with_ref(LOAD_ZONE_AXIS, 1)
        .with_ref(LOAD_AXIS, 1)
        .with_ref(PROJECT_PORTFOLIO_AXIS, 1)
        .with_ref(PROJECT_OPERATIONAL_CHARS_AXIS, 1)
        .with_ref(PROJECT_LOAD_ZONE_AXIS, 1)
        .with_ref("project_specified_capacity_scenario_id", 1)
        .with_ref("project_availability_scenario_id", 1)
        .with_ref("project_new_cost_scenario_id", 1)
        .with_ref("project_new_potential_scenario_id", 1)
}

/// Base request with fuels enabled and bound, using the gas-fired characteristics.
pub fn fuels_request(name: &str) -> ScenarioRequest {
    base_request(name)
        .with_ref(PROJECT_OPERATIONAL_CHARS_AXIS, 2)
        .with_flag(gridplan::plugins::flags::OF_FUELS, true)
        .with_ref(FUEL_AXIS, 1)
        .with_ref("fuel_price_scenario_id", 1)
}

/// The fixture catalog with same-key entries swapped for `replacements`.
pub fn catalog_with(replacements: Vec<SubscenarioEntry>) -> SubscenarioCatalog {
    let mut catalog = SubscenarioCatalog::new();
    catalog
        .register_temporal(temporal_entry(), temporal_data())
        .expect("temporal");
    for entry in entries() {
        if replacements.iter().any(|r| r.key() == entry.key()) {
            continue;
        }
        catalog.register(entry).expect("register");
    }
    for entry in replacements {
        catalog.register(entry).expect("replacement");
    }
    catalog
}
