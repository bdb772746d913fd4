//! Axis rule table (compiled into binary).
//!
//! A scenario selects one subscenario per configuration axis. Each axis is either
//! always required or gated by one feature flag, draws from one catalog category,
//! and is single- or multi-valued. Cross-axis rules state which ids one axis may
//! mention only if another axis defines them.

use crate::plugins::flags::*;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    Single,
    Multi,
}

#[derive(Debug, Clone, Serialize)]
pub struct AxisRule {
    pub axis_name: &'static str,
    /// `None` means the axis is always required.
    pub gating_flag: Option<&'static str>,
    pub catalog_category: &'static str,
    pub cardinality: Cardinality,
}

const fn required(axis_name: &'static str, catalog_category: &'static str) -> AxisRule {
    AxisRule {
        axis_name,
        gating_flag: None,
        catalog_category,
        cardinality: Cardinality::Single,
    }
}

const fn gated(
    axis_name: &'static str,
    flag: &'static str,
    catalog_category: &'static str,
) -> AxisRule {
    AxisRule {
        axis_name,
        gating_flag: Some(flag),
        catalog_category,
        cardinality: Cardinality::Single,
    }
}

const fn gated_multi(
    axis_name: &'static str,
    flag: &'static str,
    catalog_category: &'static str,
) -> AxisRule {
    AxisRule {
        axis_name,
        gating_flag: Some(flag),
        catalog_category,
        cardinality: Cardinality::Multi,
    }
}

// --- Axis names referenced by engine code ---

pub const TEMPORAL_AXIS: &str = "temporal_scenario_id";
pub const LOAD_ZONE_AXIS: &str = "load_zone_scenario_id";
pub const LOAD_AXIS: &str = "load_scenario_id";
pub const PROJECT_PORTFOLIO_AXIS: &str = "project_portfolio_scenario_id";
pub const PROJECT_OPERATIONAL_CHARS_AXIS: &str = "project_operational_chars_scenario_id";
pub const PROJECT_LOAD_ZONE_AXIS: &str = "project_load_zone_scenario_id";
pub const FUEL_AXIS: &str = "fuel_scenario_id";
pub const TRANSMISSION_PORTFOLIO_AXIS: &str = "transmission_portfolio_scenario_id";
pub const TRANSMISSION_OPERATIONAL_CHARS_AXIS: &str =
    "transmission_operational_chars_scenario_id";
pub const CARBON_CAP_ZONE_AXIS: &str = "carbon_cap_zone_scenario_id";

pub static AXIS_RULES: &[AxisRule] = &[
    // Geography, time and load
    required(TEMPORAL_AXIS, "temporal"),
    required(LOAD_ZONE_AXIS, "load_zone"),
    required(LOAD_AXIS, "load"),
    // Project portfolio
    required(PROJECT_PORTFOLIO_AXIS, "project_portfolio"),
    required(PROJECT_OPERATIONAL_CHARS_AXIS, "project_operational_chars"),
    required(PROJECT_LOAD_ZONE_AXIS, "project_load_zone"),
    required("project_specified_capacity_scenario_id", "project_specified_capacity"),
    required("project_availability_scenario_id", "project_availability"),
    required("project_new_cost_scenario_id", "project_new_cost"),
    required("project_new_potential_scenario_id", "project_new_potential"),
    // Fuels
    gated(FUEL_AXIS, OF_FUELS, "fuel"),
    gated("fuel_price_scenario_id", OF_FUELS, "fuel_price"),
    gated("fuel_burn_limit_ba_scenario_id", OF_FUEL_BURN_LIMIT, "fuel_burn_limit_ba"),
    gated("project_fuel_burn_limit_ba_scenario_id", OF_FUEL_BURN_LIMIT, "project_fuel_burn_limit_ba"),
    gated("fuel_burn_limit_scenario_id", OF_FUEL_BURN_LIMIT, "fuel_burn_limit"),
    // Transmission
    gated(TRANSMISSION_PORTFOLIO_AXIS, OF_TRANSMISSION, "transmission_portfolio"),
    gated("transmission_load_zone_scenario_id", OF_TRANSMISSION, "transmission_load_zone"),
    gated("transmission_specified_capacity_scenario_id", OF_TRANSMISSION, "transmission_specified_capacity"),
    gated(TRANSMISSION_OPERATIONAL_CHARS_AXIS, OF_TRANSMISSION, "transmission_operational_chars"),
    gated("transmission_hurdle_rate_scenario_id", OF_TRANSMISSION_HURDLE_RATES, "transmission_hurdle_rate"),
    gated("transmission_simultaneous_flow_limit_scenario_id", OF_SIMULTANEOUS_FLOW_LIMITS, "transmission_simultaneous_flow_limit"),
    gated("transmission_simultaneous_flow_limit_line_group_scenario_id", OF_SIMULTANEOUS_FLOW_LIMITS, "transmission_simultaneous_flow_limit_line_group"),
    // Reserves
    gated("lf_reserves_up_ba_scenario_id", OF_LF_RESERVES_UP, "lf_reserves_up_ba"),
    gated("project_lf_reserves_up_ba_scenario_id", OF_LF_RESERVES_UP, "project_lf_reserves_up_ba"),
    gated("lf_reserves_up_scenario_id", OF_LF_RESERVES_UP, "lf_reserves_up"),
    gated("lf_reserves_down_ba_scenario_id", OF_LF_RESERVES_DOWN, "lf_reserves_down_ba"),
    gated("project_lf_reserves_down_ba_scenario_id", OF_LF_RESERVES_DOWN, "project_lf_reserves_down_ba"),
    gated("lf_reserves_down_scenario_id", OF_LF_RESERVES_DOWN, "lf_reserves_down"),
    gated("regulation_up_ba_scenario_id", OF_REGULATION_UP, "regulation_up_ba"),
    gated("project_regulation_up_ba_scenario_id", OF_REGULATION_UP, "project_regulation_up_ba"),
    gated("regulation_up_scenario_id", OF_REGULATION_UP, "regulation_up"),
    gated("regulation_down_ba_scenario_id", OF_REGULATION_DOWN, "regulation_down_ba"),
    gated("project_regulation_down_ba_scenario_id", OF_REGULATION_DOWN, "project_regulation_down_ba"),
    gated("regulation_down_scenario_id", OF_REGULATION_DOWN, "regulation_down"),
    gated("frequency_response_ba_scenario_id", OF_FREQUENCY_RESPONSE, "frequency_response_ba"),
    gated("project_frequency_response_ba_scenario_id", OF_FREQUENCY_RESPONSE, "project_frequency_response_ba"),
    gated("frequency_response_scenario_id", OF_FREQUENCY_RESPONSE, "frequency_response"),
    gated("spinning_reserves_ba_scenario_id", OF_SPINNING_RESERVES, "spinning_reserves_ba"),
    gated("project_spinning_reserves_ba_scenario_id", OF_SPINNING_RESERVES, "project_spinning_reserves_ba"),
    gated("spinning_reserves_scenario_id", OF_SPINNING_RESERVES, "spinning_reserves"),
    // Policy
    gated("rps_zone_scenario_id", OF_RPS, "rps_zone"),
    gated("project_rps_zone_scenario_id", OF_RPS, "project_rps_zone"),
    gated("rps_target_scenario_id", OF_RPS, "rps_target"),
    gated(CARBON_CAP_ZONE_AXIS, OF_CARBON_CAP, "carbon_cap_zone"),
    gated("project_carbon_cap_zone_scenario_id", OF_CARBON_CAP, "project_carbon_cap_zone"),
    gated("carbon_cap_target_scenario_id", OF_CARBON_CAP, "carbon_cap_target"),
    gated("transmission_carbon_cap_zone_scenario_id", OF_TRACK_CARBON_IMPORTS, "transmission_carbon_cap_zone"),
    gated("carbon_tax_zone_scenario_id", OF_CARBON_TAX, "carbon_tax_zone"),
    gated("project_carbon_tax_zone_scenario_id", OF_CARBON_TAX, "project_carbon_tax_zone"),
    gated("carbon_tax_scenario_id", OF_CARBON_TAX, "carbon_tax"),
    // Reliability
    gated("prm_zone_scenario_id", OF_PRM, "prm_zone"),
    gated("project_prm_zone_scenario_id", OF_PRM, "project_prm_zone"),
    gated("prm_requirement_scenario_id", OF_PRM, "prm_requirement"),
    gated("project_elcc_chars_scenario_id", OF_PRM, "project_elcc_chars"),
    gated("elcc_surface_scenario_id", OF_ELCC_SURFACE, "elcc_surface"),
    gated("local_capacity_zone_scenario_id", OF_LOCAL_CAPACITY, "local_capacity_zone"),
    gated("project_local_capacity_zone_scenario_id", OF_LOCAL_CAPACITY, "project_local_capacity_zone"),
    gated("local_capacity_requirement_scenario_id", OF_LOCAL_CAPACITY, "local_capacity_requirement"),
    gated("project_local_capacity_chars_scenario_id", OF_LOCAL_CAPACITY, "project_local_capacity_chars"),
    // Markets
    gated_multi("market_scenario_id", OF_MARKETS, "market"),
    gated("load_zone_market_scenario_id", OF_MARKETS, "load_zone_market"),
    gated("market_price_scenario_id", OF_MARKETS, "market_price"),
    // Hydrology
    gated("water_system_scenario_id", OF_WATER, "water_system"),
    gated("water_node_reservoir_scenario_id", OF_WATER, "water_node_reservoir"),
    gated_multi("water_inflow_scenario_id", OF_WATER, "water_inflow"),
    // Tuning
    gated("tuning_scenario_id", OF_TUNING, "tuning"),
];

pub fn axis_rules() -> &'static [AxisRule] {
    AXIS_RULES
}

pub fn find_axis(axis_name: &str) -> Option<&'static AxisRule> {
    AXIS_RULES.iter().find(|r| r.axis_name == axis_name)
}

/// Axes switched on by `flag`.
pub fn gated_axes(flag: &str) -> impl Iterator<Item = &'static AxisRule> + '_ {
    AXIS_RULES.iter().filter(move |r| r.gating_flag == Some(flag))
}

// --- Cross-axis membership rules ---

#[derive(Debug, Clone, Serialize)]
pub struct CrossAxisRule {
    pub name: &'static str,
    /// Axis whose subscenario mentions ids.
    pub source_axis: &'static str,
    /// Reference kind inside the source payload.
    pub reference_kind: &'static str,
    /// Axis whose subscenario must define those ids as members.
    pub target_axis: &'static str,
}

const fn membership(
    name: &'static str,
    source_axis: &'static str,
    reference_kind: &'static str,
    target_axis: &'static str,
) -> CrossAxisRule {
    CrossAxisRule {
        name,
        source_axis,
        reference_kind,
        target_axis,
    }
}

pub const REF_PROJECT: &str = "project";
pub const REF_TRANSMISSION_LINE: &str = "transmission_line";
pub const REF_FUEL: &str = "fuel";
pub const REF_LOAD_ZONE: &str = "load_zone";

pub static CROSS_AXIS_RULES: &[CrossAxisRule] = &[
    membership("project_load_zone_projects", PROJECT_LOAD_ZONE_AXIS, REF_PROJECT, PROJECT_PORTFOLIO_AXIS),
    membership("project_load_zone_zones", PROJECT_LOAD_ZONE_AXIS, REF_LOAD_ZONE, LOAD_ZONE_AXIS),
    membership("load_zones", LOAD_AXIS, REF_LOAD_ZONE, LOAD_ZONE_AXIS),
    membership("operational_chars_projects", PROJECT_OPERATIONAL_CHARS_AXIS, REF_PROJECT, PROJECT_PORTFOLIO_AXIS),
    membership("operational_chars_fuels", PROJECT_OPERATIONAL_CHARS_AXIS, REF_FUEL, FUEL_AXIS),
    membership("specified_capacity_projects", "project_specified_capacity_scenario_id", REF_PROJECT, PROJECT_PORTFOLIO_AXIS),
    membership("availability_projects", "project_availability_scenario_id", REF_PROJECT, PROJECT_PORTFOLIO_AXIS),
    membership("new_cost_projects", "project_new_cost_scenario_id", REF_PROJECT, PROJECT_PORTFOLIO_AXIS),
    membership("fuel_prices", "fuel_price_scenario_id", REF_FUEL, FUEL_AXIS),
    membership("transmission_load_zone_lines", "transmission_load_zone_scenario_id", REF_TRANSMISSION_LINE, TRANSMISSION_PORTFOLIO_AXIS),
    membership("transmission_load_zone_zones", "transmission_load_zone_scenario_id", REF_LOAD_ZONE, LOAD_ZONE_AXIS),
    membership("transmission_operational_chars_lines", TRANSMISSION_OPERATIONAL_CHARS_AXIS, REF_TRANSMISSION_LINE, TRANSMISSION_PORTFOLIO_AXIS),
    membership("lf_reserves_up_projects", "project_lf_reserves_up_ba_scenario_id", REF_PROJECT, PROJECT_PORTFOLIO_AXIS),
    membership("lf_reserves_down_projects", "project_lf_reserves_down_ba_scenario_id", REF_PROJECT, PROJECT_PORTFOLIO_AXIS),
    membership("regulation_up_projects", "project_regulation_up_ba_scenario_id", REF_PROJECT, PROJECT_PORTFOLIO_AXIS),
    membership("regulation_down_projects", "project_regulation_down_ba_scenario_id", REF_PROJECT, PROJECT_PORTFOLIO_AXIS),
    membership("frequency_response_projects", "project_frequency_response_ba_scenario_id", REF_PROJECT, PROJECT_PORTFOLIO_AXIS),
    membership("spinning_reserves_projects", "project_spinning_reserves_ba_scenario_id", REF_PROJECT, PROJECT_PORTFOLIO_AXIS),
    membership("rps_projects", "project_rps_zone_scenario_id", REF_PROJECT, PROJECT_PORTFOLIO_AXIS),
    membership("rps_zones", "project_rps_zone_scenario_id", "rps_zone", "rps_zone_scenario_id"),
    membership("carbon_cap_projects", "project_carbon_cap_zone_scenario_id", REF_PROJECT, PROJECT_PORTFOLIO_AXIS),
    membership("carbon_cap_zones", "project_carbon_cap_zone_scenario_id", "carbon_cap_zone", CARBON_CAP_ZONE_AXIS),
    membership("carbon_import_lines", "transmission_carbon_cap_zone_scenario_id", REF_TRANSMISSION_LINE, TRANSMISSION_PORTFOLIO_AXIS),
    membership("carbon_tax_projects", "project_carbon_tax_zone_scenario_id", REF_PROJECT, PROJECT_PORTFOLIO_AXIS),
    membership("prm_projects", "project_prm_zone_scenario_id", REF_PROJECT, PROJECT_PORTFOLIO_AXIS),
    membership("prm_zones", "project_prm_zone_scenario_id", "prm_zone", "prm_zone_scenario_id"),
    membership("elcc_projects", "project_elcc_chars_scenario_id", REF_PROJECT, PROJECT_PORTFOLIO_AXIS),
    membership("local_capacity_projects", "project_local_capacity_zone_scenario_id", REF_PROJECT, PROJECT_PORTFOLIO_AXIS),
    membership("fuel_burn_limit_projects", "project_fuel_burn_limit_ba_scenario_id", REF_PROJECT, PROJECT_PORTFOLIO_AXIS),
    membership("market_load_zones", "load_zone_market_scenario_id", REF_LOAD_ZONE, LOAD_ZONE_AXIS),
];

pub fn cross_axis_rules() -> &'static [CrossAxisRule] {
    CROSS_AXIS_RULES
}
