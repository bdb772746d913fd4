//! Temporal hierarchy and expansion.
//!
//! Periods contain horizons, horizons contain timepoints. For each balancing type
//! the horizons partition every period's timepoints: no gaps, no overlaps, and no
//! horizon spanning two periods. Asset operating periods come from vintage and
//! lifetime (new builds) or from an explicit list (existing assets).

use crate::core::config::TemporalSection;
use crate::core::error::GridplanError;
use crate::plugins::axes::{PROJECT_PORTFOLIO_AXIS, TEMPORAL_AXIS, TRANSMISSION_PORTFOLIO_AXIS};
use crate::plugins::catalog::{SubscenarioCatalog, SubscenarioEntry};
use crate::plugins::composer::ResolvedScenario;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, BTreeSet};

pub type PeriodId = i64;
pub type HorizonId = i64;
pub type TimepointId = i64;

fn one() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
    pub period: PeriodId,
    #[serde(default = "one")]
    pub discount_factor: f64,
    /// Number of years the period represents.
    #[serde(default = "one")]
    pub period_weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timepoint {
    pub id: TimepointId,
    pub period: PeriodId,
    #[serde(default = "one")]
    pub weight: f64,
    #[serde(default = "one")]
    pub duration_hours: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Boundary {
    Linear,
    Circular,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Horizon {
    pub id: HorizonId,
    pub balancing_type: String,
    pub boundary: Boundary,
    /// Timepoints in operating order.
    pub timepoints: Vec<TimepointId>,
}

impl Horizon {
    /// The timepoint before `tmp`. The first timepoint of a circular horizon sees
    /// the last one; in a linear horizon it has no predecessor.
    pub fn previous_timepoint(&self, tmp: TimepointId) -> Option<TimepointId> {
        let idx = self.timepoints.iter().position(|t| *t == tmp)?;
        if idx > 0 {
            return Some(self.timepoints[idx - 1]);
        }
        match self.boundary {
            Boundary::Circular => self.timepoints.last().copied(),
            Boundary::Linear => None,
        }
    }

    /// The timepoint after `tmp`, wrapping to the first on circular horizons.
    pub fn next_timepoint(&self, tmp: TimepointId) -> Option<TimepointId> {
        let idx = self.timepoints.iter().position(|t| *t == tmp)?;
        if idx + 1 < self.timepoints.len() {
            return Some(self.timepoints[idx + 1]);
        }
        match self.boundary {
            Boundary::Circular => self.timepoints.first().copied(),
            Boundary::Linear => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemporalSubscenario {
    pub periods: Vec<Period>,
    #[serde(default)]
    pub timepoints: Vec<Timepoint>,
    #[serde(default)]
    pub horizons: Vec<Horizon>,
}

impl TemporalSubscenario {
    pub fn period_ids(&self) -> BTreeSet<PeriodId> {
        self.periods.iter().map(|p| p.period).collect()
    }

    pub fn balancing_types(&self) -> BTreeSet<&str> {
        self.horizons
            .iter()
            .map(|h| h.balancing_type.as_str())
            .collect()
    }

    pub fn horizon(&self, balancing_type: &str, id: HorizonId) -> Option<&Horizon> {
        self.horizons
            .iter()
            .find(|h| h.balancing_type == balancing_type && h.id == id)
    }

    /// Structural problems independent of any balancing type.
    pub fn check_structure(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.periods.is_empty() {
            problems.push("no periods defined".to_string());
        }
        let mut periods = FxHashSet::default();
        for p in &self.periods {
            if !periods.insert(p.period) {
                problems.push(format!("period {} defined more than once", p.period));
            }
        }
        let mut tmps = FxHashSet::default();
        for t in &self.timepoints {
            if !tmps.insert(t.id) {
                problems.push(format!("timepoint {} defined more than once", t.id));
            }
            if !periods.contains(&t.period) {
                problems.push(format!(
                    "timepoint {} belongs to undefined period {}",
                    t.id, t.period
                ));
            }
            if t.weight < 0.0 || t.duration_hours <= 0.0 {
                problems.push(format!(
                    "timepoint {} has invalid weight {} or duration {}",
                    t.id, t.weight, t.duration_hours
                ));
            }
        }
        problems
    }
}

// --- Assets ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Project,
    TransmissionLine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityType {
    Existing,
    NewBuild,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    pub kind: AssetKind,
    pub capacity_type: CapacityType,
    pub vintage: Option<PeriodId>,
    pub operational_lifetime_periods: Option<u32>,
    pub explicit_periods: BTreeSet<PeriodId>,
}

impl Asset {
    pub fn new_build(id: &str, kind: AssetKind, vintage: PeriodId, lifetime: u32) -> Self {
        Self {
            id: id.to_string(),
            kind,
            capacity_type: CapacityType::NewBuild,
            vintage: Some(vintage),
            operational_lifetime_periods: Some(lifetime),
            explicit_periods: BTreeSet::new(),
        }
    }

    pub fn existing(id: &str, kind: AssetKind, periods: impl IntoIterator<Item = PeriodId>) -> Self {
        Self {
            id: id.to_string(),
            kind,
            capacity_type: CapacityType::Existing,
            vintage: None,
            operational_lifetime_periods: None,
            explicit_periods: periods.into_iter().collect(),
        }
    }

    /// Parse a portfolio member's attributes. New builds need `vintage` and
    /// `operational_lifetime_periods` and may not list `periods`; existing assets
    /// need `periods` and may not carry a vintage or lifetime.
    pub fn from_attributes(
        id: &str,
        kind: AssetKind,
        attrs: &BTreeMap<String, JsonValue>,
    ) -> Result<Self, GridplanError> {
        let present = |key: &str| attrs.get(key).is_some_and(|v| !v.is_null());
        let mut problems = Vec::new();

        let capacity_type = match attrs.get("capacity_type").and_then(JsonValue::as_str) {
            Some("existing") => CapacityType::Existing,
            Some("new_build") => CapacityType::NewBuild,
            Some(other) => {
                return Err(GridplanError::ConstraintViolation(format!(
                    "asset {}: unknown capacity_type '{}'",
                    id, other
                )));
            }
            None => {
                return Err(GridplanError::ConstraintViolation(format!(
                    "asset {}: capacity_type is required",
                    id
                )));
            }
        };

        let asset = match capacity_type {
            CapacityType::NewBuild => {
                let vintage = attrs.get("vintage").and_then(JsonValue::as_i64);
                let lifetime = attrs
                    .get("operational_lifetime_periods")
                    .and_then(JsonValue::as_u64)
                    .and_then(|v| u32::try_from(v).ok());
                if vintage.is_none() {
                    problems.push("new_build requires an integer vintage");
                }
                if lifetime.is_none() {
                    problems.push("new_build requires a non-negative operational_lifetime_periods");
                }
                if present("periods") {
                    problems.push("new_build may not list explicit periods");
                }
                match (vintage, lifetime) {
                    (Some(v), Some(l)) => Some(Asset::new_build(id, kind, v, l)),
                    _ => None,
                }
            }
            CapacityType::Existing => {
                if present("vintage") || present("operational_lifetime_periods") {
                    problems.push("existing assets may not carry a vintage or lifetime");
                }
                let periods: Option<Vec<PeriodId>> = attrs
                    .get("periods")
                    .and_then(JsonValue::as_array)
                    .map(|items| items.iter().filter_map(JsonValue::as_i64).collect());
                match periods {
                    Some(p) => Some(Asset::existing(id, kind, p)),
                    None => {
                        problems.push("existing assets require a periods list");
                        None
                    }
                }
            }
        };

        match asset {
            Some(a) if problems.is_empty() => Ok(a),
            _ => Err(GridplanError::ConstraintViolation(format!(
                "asset {}: {}",
                id,
                problems.join("; ")
            ))),
        }
    }
}

/// Assets defined by a portfolio entry's attributes; parse failures are returned per asset.
pub fn assets_from_portfolio(
    entry: &SubscenarioEntry,
    kind: AssetKind,
) -> Vec<Result<Asset, GridplanError>> {
    entry
        .payload
        .members
        .iter()
        .map(|id| match entry.payload.attributes.get(id) {
            Some(attrs) => Asset::from_attributes(id, kind, attrs),
            None => Err(GridplanError::ConstraintViolation(format!(
                "asset {}: no capacity attributes in {} subscenario {}",
                id, entry.category, entry.subscenario_id
            ))),
        })
        .collect()
}

/// Project and transmission assets bound by a resolved scenario.
pub fn scenario_assets(resolved: &ResolvedScenario) -> Vec<Result<Asset, GridplanError>> {
    let mut out = Vec::new();
    for (axis, kind) in [
        (PROJECT_PORTFOLIO_AXIS, AssetKind::Project),
        (TRANSMISSION_PORTFOLIO_AXIS, AssetKind::TransmissionLine),
    ] {
        if let Some(entry) = resolved.entry(axis) {
            out.extend(assets_from_portfolio(entry, kind));
        }
    }
    out
}

// --- Expansion ---

#[derive(Debug, Default)]
pub struct PortfolioExpansion {
    pub operational_periods: BTreeMap<(AssetKind, String), BTreeSet<PeriodId>>,
    pub failures: Vec<((AssetKind, String), GridplanError)>,
}

/// Solver Runner input contract derived from a resolved scenario.
#[derive(Debug, Clone, Serialize)]
pub struct TemporalPlan {
    pub temporal_scenario_id: i64,
    pub periods: Vec<Period>,
    pub project_operational_periods: BTreeMap<String, BTreeSet<PeriodId>>,
    pub transmission_operational_periods: BTreeMap<String, BTreeSet<PeriodId>>,
    /// balancing_type → timepoint → horizon
    pub horizon_assignments: BTreeMap<String, BTreeMap<TimepointId, HorizonId>>,
}

#[derive(Debug, Clone)]
pub struct TemporalExpander {
    max_lifetime_periods: u32,
    parallel: bool,
}

impl Default for TemporalExpander {
    fn default() -> Self {
        Self::from_config(&TemporalSection::default())
    }
}

impl TemporalExpander {
    pub fn from_config(cfg: &TemporalSection) -> Self {
        Self {
            max_lifetime_periods: cfg.max_lifetime_periods,
            parallel: cfg.parallel_expansion,
        }
    }

    /// Periods in which `asset` can operate within the temporal subscenario.
    pub fn expand_operational_periods(
        &self,
        asset: &Asset,
        temporal: &TemporalSubscenario,
    ) -> Result<BTreeSet<PeriodId>, GridplanError> {
        match asset.capacity_type {
            CapacityType::Existing => {
                if asset.explicit_periods.is_empty() {
                    return Err(GridplanError::TemporalInconsistency(format!(
                        "asset {} lists no operating periods",
                        asset.id
                    )));
                }
                let inside: BTreeSet<PeriodId> = asset
                    .explicit_periods
                    .intersection(&temporal.period_ids())
                    .copied()
                    .collect();
                if inside.is_empty() {
                    return Err(GridplanError::TemporalInconsistency(format!(
                        "asset {} operates only in periods {:?}, none of which the study defines",
                        asset.id, asset.explicit_periods
                    )));
                }
                Ok(inside)
            }
            CapacityType::NewBuild => {
                let (vintage, lifetime) =
                    match (asset.vintage, asset.operational_lifetime_periods) {
                        (Some(v), Some(l)) => (v, l),
                        _ => {
                            return Err(GridplanError::ConstraintViolation(format!(
                                "asset {} is new_build without vintage and lifetime",
                                asset.id
                            )));
                        }
                    };
                if lifetime == 0 || lifetime > self.max_lifetime_periods {
                    return Err(GridplanError::ConstraintViolation(format!(
                        "asset {} lifetime {} outside 1..={}",
                        asset.id, lifetime, self.max_lifetime_periods
                    )));
                }

                let Some(last) = vintage.checked_add(i64::from(lifetime) - 1) else {
                    return Err(GridplanError::ConstraintViolation(format!(
                        "asset {} vintage {} with lifetime {} overflows the period range",
                        asset.id, vintage, lifetime
                    )));
                };
                let defined = temporal.period_ids();
                let operational: BTreeSet<PeriodId> =
                    defined.range(vintage..=last).copied().collect();

                if operational.is_empty() {
                    return Err(GridplanError::TemporalInconsistency(format!(
                        "asset {} (vintage {}, lifetime {}) has no operating period among {:?}",
                        asset.id, vintage, lifetime, defined
                    )));
                }
                Ok(operational)
            }
        }
    }

    /// Expand every asset, in parallel when configured. Output order is deterministic.
    pub fn expand_portfolio(
        &self,
        assets: &[Asset],
        temporal: &TemporalSubscenario,
    ) -> PortfolioExpansion {
        let expand = |asset: &Asset| {
            (
                (asset.kind, asset.id.clone()),
                self.expand_operational_periods(asset, temporal),
            )
        };
        let results: Vec<_> = if self.parallel {
            assets.par_iter().map(expand).collect()
        } else {
            assets.iter().map(expand).collect()
        };

        let mut expansion = PortfolioExpansion::default();
        for (key, result) in results {
            match result {
                Ok(periods) => {
                    expansion.operational_periods.insert(key, periods);
                }
                Err(e) => expansion.failures.push((key, e)),
            }
        }
        expansion.failures.sort_by(|a, b| a.0.cmp(&b.0));
        expansion
    }

    /// Map every timepoint to its horizon for one balancing type, checking the
    /// partition. All problems are reported together.
    pub fn assign_horizons(
        &self,
        temporal: &TemporalSubscenario,
        balancing_type: &str,
    ) -> Result<BTreeMap<TimepointId, HorizonId>, GridplanError> {
        let mut horizons: Vec<&Horizon> = temporal
            .horizons
            .iter()
            .filter(|h| h.balancing_type == balancing_type)
            .collect();
        if horizons.is_empty() {
            return Err(GridplanError::TemporalInconsistency(format!(
                "no horizons defined for balancing type '{}'",
                balancing_type
            )));
        }
        horizons.sort_by_key(|h| h.id);

        let tmp_period: FxHashMap<TimepointId, PeriodId> = temporal
            .timepoints
            .iter()
            .map(|t| (t.id, t.period))
            .collect();

        let mut problems = Vec::new();
        let mut assignment: BTreeMap<TimepointId, HorizonId> = BTreeMap::new();
        let mut seen_horizons = FxHashSet::default();

        for h in &horizons {
            if !seen_horizons.insert(h.id) {
                problems.push(format!("horizon {} defined more than once", h.id));
            }
            if h.timepoints.is_empty() {
                problems.push(format!("horizon {} has no timepoints", h.id));
            }
            let mut periods = BTreeSet::new();
            for tmp in &h.timepoints {
                match tmp_period.get(tmp) {
                    Some(p) => {
                        periods.insert(*p);
                    }
                    None => problems.push(format!(
                        "horizon {} references undefined timepoint {}",
                        h.id, tmp
                    )),
                }
                if let Some(prev) = assignment.insert(*tmp, h.id) {
                    problems.push(format!(
                        "timepoint {} assigned to horizons {} and {}",
                        tmp, prev, h.id
                    ));
                }
            }
            if periods.len() > 1 {
                problems.push(format!("horizon {} spans periods {:?}", h.id, periods));
            }
        }

        for t in &temporal.timepoints {
            if !assignment.contains_key(&t.id) {
                problems.push(format!(
                    "timepoint {} of period {} is not in any horizon",
                    t.id, t.period
                ));
            }
        }

        if !problems.is_empty() {
            return Err(GridplanError::TemporalInconsistency(format!(
                "balancing type '{}': {}",
                balancing_type,
                problems.join("; ")
            )));
        }
        Ok(assignment)
    }

    /// Build the Solver Runner's temporal input for a resolved scenario.
    /// Fails on the first inconsistency; run validation first for the full list.
    pub fn plan(
        &self,
        resolved: &ResolvedScenario,
        catalog: &SubscenarioCatalog,
    ) -> Result<TemporalPlan, GridplanError> {
        let entry = resolved.entry(TEMPORAL_AXIS).ok_or_else(|| {
            GridplanError::ReferenceError(format!(
                "scenario '{}' has no bound {}",
                resolved.scenario_name, TEMPORAL_AXIS
            ))
        })?;
        let temporal = catalog.temporal(entry.subscenario_id)?;

        let mut horizon_assignments = BTreeMap::new();
        for bt in temporal.balancing_types() {
            horizon_assignments.insert(bt.to_string(), self.assign_horizons(&temporal, bt)?);
        }

        let assets = scenario_assets(resolved)
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;
        let mut expansion = self.expand_portfolio(&assets, &temporal);
        if let Some((_, err)) = expansion.failures.drain(..).next() {
            return Err(err);
        }

        let mut plan = TemporalPlan {
            temporal_scenario_id: entry.subscenario_id,
            periods: temporal.periods.clone(),
            project_operational_periods: BTreeMap::new(),
            transmission_operational_periods: BTreeMap::new(),
            horizon_assignments,
        };
        for ((kind, id), periods) in expansion.operational_periods {
            match kind {
                AssetKind::Project => plan.project_operational_periods.insert(id, periods),
                AssetKind::TransmissionLine => {
                    plan.transmission_operational_periods.insert(id, periods)
                }
            };
        }
        Ok(plan)
    }
}
