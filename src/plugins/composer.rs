//! Scenario composition.
//!
//! Resolves a `ScenarioRequest` (flags plus one reference per axis) against the axis
//! rule table and the subscenario catalog. Resolution never fails: every problem
//! is recorded in the returned `ValidationReport`.

use crate::core::report::{IssueKind, ValidationReport, ValidationStatus};
use crate::plugins::axes::{self, AxisRule, Cardinality, CrossAxisRule};
use crate::plugins::catalog::{SubscenarioCatalog, SubscenarioEntry};
use crate::plugins::flags::FeatureFlagSet;
use crate::plugins::lifecycle::RunStatus;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, LazyLock};

static SCENARIO_NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.\-]{0,127}$").unwrap());

const FLAGS_MODULE: &str = "feature_flags";
const NAME_MODULE: &str = "scenario_name";

/// A single subscenario id, or a list for multi-valued axes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AxisRef {
    One(i64),
    Many(Vec<i64>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRequest {
    pub scenario_name: String,
    #[serde(default)]
    pub feature_flags: BTreeMap<String, bool>,
    /// Axis → reference. `null` and an absent key both mean "no reference".
    #[serde(default)]
    pub axis_refs: BTreeMap<String, Option<AxisRef>>,
}

impl ScenarioRequest {
    pub fn new(scenario_name: &str) -> Self {
        Self {
            scenario_name: scenario_name.to_string(),
            ..Self::default()
        }
    }

    pub fn with_flag(mut self, flag: &str, enabled: bool) -> Self {
        self.feature_flags.insert(flag.to_string(), enabled);
        self
    }

    pub fn with_ref(mut self, axis: &str, subscenario_id: i64) -> Self {
        self.axis_refs
            .insert(axis.to_string(), Some(AxisRef::One(subscenario_id)));
        self
    }

    pub fn with_refs(mut self, axis: &str, ids: &[i64]) -> Self {
        self.axis_refs
            .insert(axis.to_string(), Some(AxisRef::Many(ids.to_vec())));
        self
    }

    pub fn with_null(mut self, axis: &str) -> Self {
        self.axis_refs.insert(axis.to_string(), None);
        self
    }

    pub fn flags(&self) -> FeatureFlagSet {
        FeatureFlagSet::from_map(&self.feature_flags)
    }
}

/// Catalog entries bound to one axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundAxis {
    pub category: String,
    pub cardinality: Cardinality,
    pub entries: Vec<Arc<SubscenarioEntry>>,
}

impl BoundAxis {
    /// The bound entry of a single-valued axis.
    pub fn single(&self) -> Option<&SubscenarioEntry> {
        match self.cardinality {
            Cardinality::Single => self.entries.first().map(Arc::as_ref),
            Cardinality::Multi => None,
        }
    }

    pub fn subscenario_ids(&self) -> Vec<i64> {
        self.entries.iter().map(|e| e.subscenario_id).collect()
    }

    fn members(&self) -> BTreeSet<&str> {
        self.entries
            .iter()
            .flat_map(|e| e.payload.members.iter().map(String::as_str))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedScenario {
    /// Assigned by the scenario store on first persistence.
    pub scenario_id: Option<i64>,
    pub scenario_name: String,
    pub feature_flags: BTreeMap<String, bool>,
    pub bound_axis_refs: BTreeMap<String, BoundAxis>,
    pub validation_status: ValidationStatus,
    pub run_status: RunStatus,
    pub queue_claim_token: Option<String>,
    pub run_process_id: Option<String>,
    pub run_start_time: Option<String>,
    pub run_end_time: Option<String>,
    /// sha256 over name, flags and bindings.
    pub fingerprint: String,
    /// The request this scenario was resolved from.
    pub request: ScenarioRequest,
}

impl ResolvedScenario {
    pub fn bound(&self, axis: &str) -> Option<&BoundAxis> {
        self.bound_axis_refs.get(axis)
    }

    /// First entry bound to `axis` (the only one for single-valued axes).
    pub fn entry(&self, axis: &str) -> Option<&SubscenarioEntry> {
        self.bound(axis)
            .and_then(|b| b.entries.first())
            .map(Arc::as_ref)
    }

    pub fn flags(&self) -> FeatureFlagSet {
        FeatureFlagSet::from_map(&self.feature_flags)
    }

    /// Every (category, subscenario_id) this scenario binds.
    pub fn bindings(&self) -> Vec<(&str, &str, i64)> {
        self.bound_axis_refs
            .iter()
            .flat_map(|(axis, bound)| {
                bound
                    .entries
                    .iter()
                    .map(move |e| (axis.as_str(), bound.category.as_str(), e.subscenario_id))
            })
            .collect()
    }
}

fn scenario_fingerprint(
    name: &str,
    flags: &BTreeMap<String, bool>,
    bound: &BTreeMap<String, BoundAxis>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update([0x1e]);
    for (flag, on) in flags {
        hasher.update(flag.as_bytes());
        hasher.update(if *on { b"=1" } else { b"=0" });
        hasher.update([0x1f]);
    }
    hasher.update([0x1e]);
    for (axis, b) in bound {
        hasher.update(axis.as_bytes());
        hasher.update([0x1d]);
        hasher.update(b.category.as_bytes());
        for id in b.subscenario_ids() {
            hasher.update([0x1d]);
            hasher.update(id.to_string().as_bytes());
        }
        hasher.update([0x1f]);
    }
    format!("{:x}", hasher.finalize())
}

pub struct ScenarioComposer {
    catalog: Arc<SubscenarioCatalog>,
}

impl ScenarioComposer {
    pub fn new(catalog: Arc<SubscenarioCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &SubscenarioCatalog {
        &self.catalog
    }

    /// Resolve `request` into a scenario and the list of problems found on the way.
    /// Pure: the same request against the same catalog yields the same result.
    pub fn resolve(&self, request: &ScenarioRequest) -> (ResolvedScenario, ValidationReport) {
        let mut report = ValidationReport::new();
        let flags = request.flags();

        if !SCENARIO_NAME_PATTERN.is_match(&request.scenario_name) {
            report.fatal(
                IssueKind::ConstraintViolation,
                NAME_MODULE,
                format!(
                    "invalid scenario name '{}': use letters, digits, '_', '.' or '-' (max 128)",
                    request.scenario_name
                ),
            );
        }

        for flag in flags.unknown_flags() {
            report.warning(
                IssueKind::FeatureMismatch,
                FLAGS_MODULE,
                format!("unknown feature flag '{}' ignored", flag),
            );
        }
        for mismatch in flags.check_flag_consistency() {
            report.fatal(IssueKind::FeatureMismatch, &mismatch.flag, mismatch.message);
        }

        for axis in request.axis_refs.keys() {
            if axes::find_axis(axis).is_none() {
                report.warning(
                    IssueKind::ReferenceError,
                    axis,
                    format!("unknown axis '{}' ignored", axis),
                );
            }
        }

        let mut bound = BTreeMap::new();
        for rule in axes::axis_rules() {
            let supplied = request
                .axis_refs
                .get(rule.axis_name)
                .and_then(Option::as_ref);
            if let Some(b) = self.bind_axis(rule, supplied, &flags, &mut report) {
                bound.insert(rule.axis_name.to_string(), b);
            }
        }

        check_cross_axis(&bound, &flags, &mut report);

        let feature_flags = request.feature_flags.clone();
        let fingerprint = scenario_fingerprint(&request.scenario_name, &feature_flags, &bound);
        let resolved = ResolvedScenario {
            scenario_id: None,
            scenario_name: request.scenario_name.clone(),
            feature_flags,
            bound_axis_refs: bound,
            validation_status: report.status(),
            run_status: RunStatus::Created,
            queue_claim_token: None,
            run_process_id: None,
            run_start_time: None,
            run_end_time: None,
            fingerprint,
            request: request.clone(),
        };
        (resolved, report)
    }

    fn bind_axis(
        &self,
        rule: &AxisRule,
        supplied: Option<&AxisRef>,
        flags: &FeatureFlagSet,
        report: &mut ValidationReport,
    ) -> Option<BoundAxis> {
        let axis = rule.axis_name;

        if let Some(flag) = rule.gating_flag
            && !flags.is_enabled(flag)
        {
            if supplied.is_some() {
                report.warning(
                    IssueKind::FeatureMismatch,
                    axis,
                    format!("reference ignored because {} is disabled", flag),
                );
            }
            return None;
        }

        let requirement = match rule.gating_flag {
            Some(flag) => format!("required when {} is enabled", flag),
            None => "always required".to_string(),
        };

        let ids: Vec<i64> = match (supplied, rule.cardinality) {
            (None, _) => {
                report.fatal(
                    IssueKind::ReferenceError,
                    axis,
                    format!("no subscenario referenced ({})", requirement),
                );
                return None;
            }
            (Some(AxisRef::One(id)), _) => vec![*id],
            (Some(AxisRef::Many(_)), Cardinality::Single) => {
                report.fatal(
                    IssueKind::ReferenceError,
                    axis,
                    "axis is single-valued but a list was supplied",
                );
                return None;
            }
            (Some(AxisRef::Many(list)), Cardinality::Multi) => {
                if list.is_empty() {
                    report.fatal(
                        IssueKind::ReferenceError,
                        axis,
                        format!("empty subscenario list ({})", requirement),
                    );
                    return None;
                }
                let mut seen = BTreeSet::new();
                let mut ids = Vec::with_capacity(list.len());
                for id in list {
                    if seen.insert(*id) {
                        ids.push(*id);
                    } else {
                        report.warning(
                            IssueKind::ReferenceError,
                            axis,
                            format!("subscenario {} listed more than once", id),
                        );
                    }
                }
                ids
            }
        };

        let mut entries = Vec::with_capacity(ids.len());
        for id in ids {
            match self.catalog.lookup(rule.catalog_category, id) {
                Ok(entry) => entries.push(entry),
                Err(_) => report.fatal(
                    IssueKind::ReferenceError,
                    axis,
                    format!(
                        "{} subscenario {} is not registered",
                        rule.catalog_category, id
                    ),
                ),
            }
        }
        if entries.is_empty() {
            return None;
        }
        Some(BoundAxis {
            category: rule.catalog_category.to_string(),
            cardinality: rule.cardinality,
            entries,
        })
    }
}

/// Membership checks between bound axes. A target switched off by its flag
/// defines nothing, so any reference into it is dangling. A target that failed
/// to bind for another reason already carries its own fatal issue.
fn check_cross_axis(
    bound: &BTreeMap<String, BoundAxis>,
    flags: &FeatureFlagSet,
    report: &mut ValidationReport,
) {
    for rule in axes::cross_axis_rules() {
        let Some(source) = bound.get(rule.source_axis) else {
            continue;
        };
        let Some(target) = bound.get(rule.target_axis) else {
            let disabled_by = axes::find_axis(rule.target_axis)
                .and_then(|r| r.gating_flag)
                .filter(|flag| !flags.is_enabled(flag));
            if let Some(flag) = disabled_by {
                check_gated_off_target(rule, source, flag, report);
            }
            continue;
        };
        let defined = target.members();
        for entry in &source.entries {
            let missing: Vec<&str> = entry
                .payload
                .references(rule.reference_kind)
                .filter(|id| !defined.contains(id))
                .collect();
            if !missing.is_empty() {
                report.fatal(
                    IssueKind::ReferenceError,
                    rule.source_axis,
                    format!(
                        "{}: {} subscenario {} references {} [{}] not defined by {} {:?}",
                        rule.name,
                        entry.category,
                        entry.subscenario_id,
                        rule.reference_kind,
                        missing.join(", "),
                        rule.target_axis,
                        target.subscenario_ids()
                    ),
                );
            }
        }
    }
}

fn check_gated_off_target(
    rule: &CrossAxisRule,
    source: &BoundAxis,
    flag: &str,
    report: &mut ValidationReport,
) {
    for entry in &source.entries {
        let referenced: Vec<&str> = entry.payload.references(rule.reference_kind).collect();
        if referenced.is_empty() {
            continue;
        }
        report.fatal(
            IssueKind::ReferenceError,
            rule.source_axis,
            format!(
                "{}: {} subscenario {} references {} [{}] but {} is unbound because {} is disabled",
                rule.name,
                entry.category,
                entry.subscenario_id,
                rule.reference_kind,
                referenced.join(", "),
                rule.target_axis,
                flag
            ),
        );
    }
}
