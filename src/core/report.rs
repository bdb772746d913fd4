//! Validation issues and reports.
//!
//! Composition and validation never fail fast: every problem becomes a
//! `ValidationIssue` appended to a `ValidationReport`, and the report as a whole
//! decides the scenario's validation status.

use crate::core::time;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Fatal,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Fatal => "fatal",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "info" => Some(Severity::Info),
            "warning" => Some(Severity::Warning),
            "fatal" => Some(Severity::Fatal),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    NotFound,
    ReferenceError,
    FeatureMismatch,
    TemporalInconsistency,
    ConstraintViolation,
}

impl IssueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueKind::NotFound => "not_found",
            IssueKind::ReferenceError => "reference_error",
            IssueKind::FeatureMismatch => "feature_mismatch",
            IssueKind::TemporalInconsistency => "temporal_inconsistency",
            IssueKind::ConstraintViolation => "constraint_violation",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "not_found" => Some(IssueKind::NotFound),
            "reference_error" => Some(IssueKind::ReferenceError),
            "feature_mismatch" => Some(IssueKind::FeatureMismatch),
            "temporal_inconsistency" => Some(IssueKind::TemporalInconsistency),
            "constraint_violation" => Some(IssueKind::ConstraintViolation),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub kind: IssueKind,
    pub axis_or_module: String,
    pub description: String,
    pub timestamp: String,
}

impl ValidationIssue {
    pub fn new(
        severity: Severity,
        kind: IssueKind,
        axis_or_module: &str,
        description: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            kind,
            axis_or_module: axis_or_module.to_string(),
            description: description.into(),
            timestamp: time::now_epoch_z(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Pending,
    Valid,
    Invalid,
}

impl ValidationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ValidationStatus::Pending => "pending",
            ValidationStatus::Valid => "valid",
            ValidationStatus::Invalid => "invalid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ValidationStatus::Pending),
            "valid" => Some(ValidationStatus::Valid),
            "invalid" => Some(ValidationStatus::Invalid),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    pub fn fatal(&mut self, kind: IssueKind, axis_or_module: &str, description: impl Into<String>) {
        self.push(ValidationIssue::new(
            Severity::Fatal,
            kind,
            axis_or_module,
            description,
        ));
    }

    pub fn warning(
        &mut self,
        kind: IssueKind,
        axis_or_module: &str,
        description: impl Into<String>,
    ) {
        self.push(ValidationIssue::new(
            Severity::Warning,
            kind,
            axis_or_module,
            description,
        ));
    }

    pub fn extend(&mut self, other: ValidationReport) {
        self.issues.extend(other.issues);
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    pub fn has_fatal(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Fatal)
    }

    pub fn status(&self) -> ValidationStatus {
        if self.has_fatal() {
            ValidationStatus::Invalid
        } else {
            ValidationStatus::Valid
        }
    }

    /// sha256 over the ordered issue list, ignoring timestamps.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for issue in &self.issues {
            hasher.update(issue.severity.as_str().as_bytes());
            hasher.update([0x1f]);
            hasher.update(issue.kind.as_str().as_bytes());
            hasher.update([0x1f]);
            hasher.update(issue.axis_or_module.as_bytes());
            hasher.update([0x1f]);
            hasher.update(issue.description.as_bytes());
            hasher.update([0x1e]);
        }
        format!("{:x}", hasher.finalize())
    }
}

impl From<Vec<ValidationIssue>> for ValidationReport {
    fn from(issues: Vec<ValidationIssue>) -> Self {
        Self { issues }
    }
}
