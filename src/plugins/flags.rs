//! Feature flags: boolean toggles for the optional modeling subsystems.
//!
//! Flags gate axes (see `axes`) and may imply other flags. Consistency checks
//! return every mismatch; deciding severity is the caller's job.

use serde::Serialize;
use std::collections::BTreeMap;

pub const OF_FUELS: &str = "of_fuels";
pub const OF_FUEL_BURN_LIMIT: &str = "of_fuel_burn_limit";
pub const OF_TRANSMISSION: &str = "of_transmission";
pub const OF_TRANSMISSION_HURDLE_RATES: &str = "of_transmission_hurdle_rates";
pub const OF_SIMULTANEOUS_FLOW_LIMITS: &str = "of_simultaneous_flow_limits";
pub const OF_LF_RESERVES_UP: &str = "of_lf_reserves_up";
pub const OF_LF_RESERVES_DOWN: &str = "of_lf_reserves_down";
pub const OF_REGULATION_UP: &str = "of_regulation_up";
pub const OF_REGULATION_DOWN: &str = "of_regulation_down";
pub const OF_FREQUENCY_RESPONSE: &str = "of_frequency_response";
pub const OF_SPINNING_RESERVES: &str = "of_spinning_reserves";
pub const OF_RPS: &str = "of_rps";
pub const OF_CARBON_CAP: &str = "of_carbon_cap";
pub const OF_TRACK_CARBON_IMPORTS: &str = "of_track_carbon_imports";
pub const OF_CARBON_TAX: &str = "of_carbon_tax";
pub const OF_PRM: &str = "of_prm";
pub const OF_ELCC_SURFACE: &str = "of_elcc_surface";
pub const OF_LOCAL_CAPACITY: &str = "of_local_capacity";
pub const OF_MARKETS: &str = "of_markets";
pub const OF_WATER: &str = "of_water";
pub const OF_TUNING: &str = "of_tuning";

#[derive(Debug, Clone, Serialize)]
pub struct FlagDef {
    pub name: &'static str,
    pub description: &'static str,
}

pub static FLAG_DEFINITIONS: &[FlagDef] = &[
    FlagDef { name: OF_FUELS, description: "Fuel-based generation with fuel prices and heat rates" },
    FlagDef { name: OF_FUEL_BURN_LIMIT, description: "Fuel burn limits by balancing area" },
    FlagDef { name: OF_TRANSMISSION, description: "Transmission lines between load zones" },
    FlagDef { name: OF_TRANSMISSION_HURDLE_RATES, description: "Hurdle rates on transmission flows" },
    FlagDef { name: OF_SIMULTANEOUS_FLOW_LIMITS, description: "Limits on groups of transmission flows" },
    FlagDef { name: OF_LF_RESERVES_UP, description: "Load-following reserves, upward" },
    FlagDef { name: OF_LF_RESERVES_DOWN, description: "Load-following reserves, downward" },
    FlagDef { name: OF_REGULATION_UP, description: "Regulation reserves, upward" },
    FlagDef { name: OF_REGULATION_DOWN, description: "Regulation reserves, downward" },
    FlagDef { name: OF_FREQUENCY_RESPONSE, description: "Frequency response reserves" },
    FlagDef { name: OF_SPINNING_RESERVES, description: "Spinning reserves" },
    FlagDef { name: OF_RPS, description: "Renewable portfolio standard (energy target)" },
    FlagDef { name: OF_CARBON_CAP, description: "Carbon cap policy" },
    FlagDef { name: OF_TRACK_CARBON_IMPORTS, description: "Carbon accounting on imported energy" },
    FlagDef { name: OF_CARBON_TAX, description: "Carbon tax policy" },
    FlagDef { name: OF_PRM, description: "Planning reserve margin" },
    FlagDef { name: OF_ELCC_SURFACE, description: "ELCC surface for PRM contributions" },
    FlagDef { name: OF_LOCAL_CAPACITY, description: "Local capacity requirements" },
    FlagDef { name: OF_MARKETS, description: "Market participation" },
    FlagDef { name: OF_WATER, description: "Water network and reservoir hydrology" },
    FlagDef { name: OF_TUNING, description: "Objective tuning costs" },
];

/// `(flag, required)`: enabling `flag` requires `required` to be enabled too.
pub static FLAG_IMPLICATIONS: &[(&str, &str)] = &[
    (OF_FUEL_BURN_LIMIT, OF_FUELS),
    (OF_TRANSMISSION_HURDLE_RATES, OF_TRANSMISSION),
    (OF_SIMULTANEOUS_FLOW_LIMITS, OF_TRANSMISSION),
    (OF_TRACK_CARBON_IMPORTS, OF_CARBON_CAP),
    (OF_TRACK_CARBON_IMPORTS, OF_TRANSMISSION),
    (OF_ELCC_SURFACE, OF_PRM),
];

pub fn is_known_flag(name: &str) -> bool {
    FLAG_DEFINITIONS.iter().any(|f| f.name == name)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureMismatchError {
    pub flag: String,
    pub requires: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeatureFlagSet {
    flags: BTreeMap<String, bool>,
}

impl FeatureFlagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(flags: &BTreeMap<String, bool>) -> Self {
        Self {
            flags: flags.clone(),
        }
    }

    pub fn with(mut self, flag: &str, enabled: bool) -> Self {
        self.flags.insert(flag.to_string(), enabled);
        self
    }

    /// Unset flags are disabled.
    pub fn is_enabled(&self, flag: &str) -> bool {
        self.flags.get(flag).copied().unwrap_or(false)
    }

    /// Flag names that no subsystem defines.
    pub fn unknown_flags(&self) -> Vec<&str> {
        self.flags
            .keys()
            .map(String::as_str)
            .filter(|name| !is_known_flag(name))
            .collect()
    }

    pub fn check_flag_consistency(&self) -> Vec<FeatureMismatchError> {
        FLAG_IMPLICATIONS
            .iter()
            .filter(|(flag, required)| self.is_enabled(flag) && !self.is_enabled(required))
            .map(|(flag, required)| FeatureMismatchError {
                flag: flag.to_string(),
                requires: required.to_string(),
                message: format!("{} is enabled but requires {} to be enabled", flag, required),
            })
            .collect()
    }
}
