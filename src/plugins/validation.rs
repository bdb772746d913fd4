//! Scenario validation: composition issues, temporal issues and domain rules in
//! one report. Any fatal issue makes the scenario invalid.

use crate::core::config::EngineConfig;
use crate::core::error::GridplanError;
use crate::core::report::{IssueKind, ValidationReport};
use crate::plugins::axes::{PROJECT_PORTFOLIO_AXIS, TEMPORAL_AXIS, TRANSMISSION_PORTFOLIO_AXIS};
use crate::plugins::catalog::SubscenarioCatalog;
use crate::plugins::composer::{ResolvedScenario, ScenarioComposer, ScenarioRequest};
use crate::plugins::domain;
use crate::plugins::temporal::{
    AssetKind, CapacityType, TemporalExpander, TemporalSubscenario, assets_from_portfolio,
};
use std::sync::Arc;

/// Issue kind and bare message for an error raised inside a rule.
fn classify(err: GridplanError) -> (IssueKind, String) {
    match err {
        GridplanError::NotFound(m) => (IssueKind::NotFound, m),
        GridplanError::ReferenceError(m) => (IssueKind::ReferenceError, m),
        GridplanError::FeatureMismatch(m) => (IssueKind::FeatureMismatch, m),
        GridplanError::TemporalInconsistency(m) => (IssueKind::TemporalInconsistency, m),
        GridplanError::ConstraintViolation(m) => (IssueKind::ConstraintViolation, m),
        other => (IssueKind::ConstraintViolation, other.to_string()),
    }
}

fn portfolio_axis(kind: AssetKind) -> &'static str {
    match kind {
        AssetKind::Project => PROJECT_PORTFOLIO_AXIS,
        AssetKind::TransmissionLine => TRANSMISSION_PORTFOLIO_AXIS,
    }
}

pub struct ValidationEngine {
    composer: ScenarioComposer,
    expander: TemporalExpander,
    warn_on_out_of_study_periods: bool,
}

impl ValidationEngine {
    pub fn new(catalog: Arc<SubscenarioCatalog>, config: &EngineConfig) -> Self {
        Self {
            composer: ScenarioComposer::new(catalog),
            expander: TemporalExpander::from_config(&config.temporal),
            warn_on_out_of_study_periods: config.validation.warn_on_out_of_study_periods,
        }
    }

    pub fn composer(&self) -> &ScenarioComposer {
        &self.composer
    }

    pub fn expander(&self) -> &TemporalExpander {
        &self.expander
    }

    /// Resolve and fully validate a request.
    pub fn resolve_and_validate(&self, request: &ScenarioRequest) -> (ResolvedScenario, ValidationReport) {
        let (mut resolved, _) = self.composer.resolve(request);
        let report = self.validate(&mut resolved);
        (resolved, report)
    }

    /// Validate a resolved scenario and set its validation status.
    /// Composition issues are recomputed from the scenario's request.
    pub fn validate(&self, resolved: &mut ResolvedScenario) -> ValidationReport {
        let (_, mut report) = self.composer.resolve(&resolved.request);
        report.extend(self.temporal_issues(resolved));
        report.extend(domain::check_domain(resolved));
        resolved.validation_status = report.status();
        report
    }

    fn temporal_issues(&self, resolved: &ResolvedScenario) -> ValidationReport {
        let mut report = ValidationReport::new();
        // Missing temporal binding is already a composition issue.
        let Some(entry) = resolved.entry(TEMPORAL_AXIS) else {
            return report;
        };
        let temporal = match self.composer.catalog().temporal(entry.subscenario_id) {
            Ok(t) => t,
            Err(e) => {
                let (_, msg) = classify(e);
                report.fatal(IssueKind::TemporalInconsistency, TEMPORAL_AXIS, msg);
                return report;
            }
        };

        for problem in temporal.check_structure() {
            report.fatal(IssueKind::TemporalInconsistency, TEMPORAL_AXIS, problem);
        }
        let balancing_types = temporal.balancing_types();
        if balancing_types.is_empty() {
            report.fatal(
                IssueKind::TemporalInconsistency,
                TEMPORAL_AXIS,
                "no horizons defined for any balancing type",
            );
        }
        for bt in balancing_types {
            if let Err(e) = self.expander.assign_horizons(&temporal, bt) {
                let (kind, msg) = classify(e);
                report.fatal(kind, TEMPORAL_AXIS, msg);
            }
        }

        self.asset_issues(resolved, &temporal, &mut report);
        report
    }

    fn asset_issues(
        &self,
        resolved: &ResolvedScenario,
        temporal: &TemporalSubscenario,
        report: &mut ValidationReport,
    ) {
        let mut assets = Vec::new();
        for kind in [AssetKind::Project, AssetKind::TransmissionLine] {
            let axis = portfolio_axis(kind);
            let Some(entry) = resolved.entry(axis) else {
                continue;
            };
            for parsed in assets_from_portfolio(entry, kind) {
                match parsed {
                    Ok(asset) => assets.push(asset),
                    Err(e) => {
                        let (kind, msg) = classify(e);
                        report.fatal(kind, axis, msg);
                    }
                }
            }
        }

        let expansion = self.expander.expand_portfolio(&assets, temporal);
        for ((kind, _), err) in expansion.failures {
            let (issue_kind, msg) = classify(err);
            report.fatal(issue_kind, portfolio_axis(kind), msg);
        }

        if self.warn_on_out_of_study_periods {
            let defined = temporal.period_ids();
            for asset in assets
                .iter()
                .filter(|a| a.capacity_type == CapacityType::Existing)
                .filter(|a| expansion.operational_periods.contains_key(&(a.kind, a.id.clone())))
            {
                let outside: Vec<String> = asset
                    .explicit_periods
                    .difference(&defined)
                    .map(|p| p.to_string())
                    .collect();
                if !outside.is_empty() {
                    report.warning(
                        IssueKind::TemporalInconsistency,
                        portfolio_axis(asset.kind),
                        format!(
                            "asset {} lists periods outside the study: {}",
                            asset.id,
                            outside.join(", ")
                        ),
                    );
                }
            }
        }
    }
}
