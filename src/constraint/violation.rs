//! Constraint violation payloads.
//!
//! A violation is data, not a Rust error: it is returned to the agent so it
//! can correct course, and every one carries resolution guidance.
//!
//! ## Types
//!
//! - [`Severity`]: how strongly a violation blocks progress
//! - [`ConstraintViolation`]: one violation with id, message, details, and
//!   resolution steps
//!
//! ## Example
//!
//! ```
//! use waymark::constraint::{ConstraintViolation, Severity};
//!
//! let violation = ConstraintViolation::new("no_vendor_edits", "Vendored code is off limits")
//!     .with_severity(Severity::Critical)
//!     .with_resolution_step("Patch the wrapper module instead");
//!
//! assert!(violation.is_blocking());
//! assert_eq!(violation.resolution_steps().len(), 1);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;

use crate::phase::Phase;

/// Constraint id for modifying a file that was never read.
pub const FILE_READ_BEFORE_MODIFICATION: &str = "FileReadBeforeModification";
/// Constraint id for `..` segments in a target path.
pub const PATH_TRAVERSAL: &str = "PathTraversal";
/// Constraint id for touching a restricted location.
pub const RESTRICTED_PATH: &str = "RestrictedPath";
/// Constraint id for reading outside the read allowlist.
pub const READ_ACCESS_DENIED: &str = "ReadAccessDenied";
/// Constraint id for writing outside the write allowlist.
pub const WRITE_ACCESS_DENIED: &str = "WriteAccessDenied";
/// Constraint id for skipping ahead in the phase sequence.
pub const PHASE_PROGRESSION_VIOLATION: &str = "PhaseProgressionViolation";
/// Constraint id for a quality score below the configured floor.
pub const QUALITY_STANDARDS_VIOLATION: &str = "QualityStandardsViolation";
/// Constraint id for unmet phase completion criteria.
pub const COMPLETENESS_VIOLATION: &str = "CompletenessViolation";

/// How strongly a violation blocks progress.
///
/// Severities are ordered from most to least severe.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Safety rule broken; the action must not happen.
    Critical,
    /// The action is denied until the agent corrects course.
    #[default]
    High,
    /// Should be addressed, does not block on its own.
    Medium,
    /// Advisory only.
    Low,
}

impl Severity {
    /// Whether a violation at this severity denies the action outright.
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::Critical | Self::High)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        };
        write!(f, "{}", s)
    }
}

/// A single constraint violation with actionable resolution guidance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintViolation {
    /// Which constraint fired; well-known ids live in this module's consts
    constraint_id: String,
    /// Human-readable description of what went wrong
    message: String,
    /// Structured context for the agent
    #[serde(default, skip_serializing_if = "Value::is_null")]
    details: Value,
    /// Concrete steps that clear the violation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    resolution_steps: Vec<String>,
    severity: Severity,
}

impl ConstraintViolation {
    /// Create a violation with default (high) severity and no details.
    pub fn new(constraint_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            constraint_id: constraint_id.into(),
            message: message.into(),
            details: Value::Null,
            resolution_steps: Vec::new(),
            severity: Severity::default(),
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    pub fn with_resolution_step(mut self, step: impl Into<String>) -> Self {
        self.resolution_steps.push(step.into());
        self
    }

    pub fn with_resolution_steps(
        mut self,
        steps: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.resolution_steps
            .extend(steps.into_iter().map(Into::into));
        self
    }

    pub fn constraint_id(&self) -> &str {
        &self.constraint_id
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> &Value {
        &self.details
    }

    pub fn resolution_steps(&self) -> &[String] {
        &self.resolution_steps
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Whether this violation denies the action.
    pub fn is_blocking(&self) -> bool {
        self.severity.is_blocking()
    }

    /// Resolution steps joined into one line, if any exist.
    pub fn resolution_summary(&self) -> Option<String> {
        if self.resolution_steps.is_empty() {
            None
        } else {
            Some(self.resolution_steps.join("; "))
        }
    }

    // ---- well-known violations ----

    /// Modifying a file the session has never read.
    pub fn file_read_before_modification(path: &str) -> Self {
        Self::new(
            FILE_READ_BEFORE_MODIFICATION,
            format!("Cannot modify a file before reading it: {path} has not been read in this session"),
        )
        .with_severity(Severity::Critical)
        .with_details(json!({ "path": path }))
        .with_resolution_step(format!("Read {path} first, then retry the modification"))
    }

    /// A `..` segment in the target path.
    pub fn path_traversal(path: &str) -> Self {
        Self::new(
            PATH_TRAVERSAL,
            format!("Path '{path}' contains a traversal sequence"),
        )
        .with_severity(Severity::Critical)
        .with_details(json!({ "path": path }))
        .with_resolution_step("Use a normalized path inside the project tree")
    }

    /// The path sits under a restricted prefix.
    pub fn restricted_path(path: &str, prefix: &str) -> Self {
        Self::new(
            RESTRICTED_PATH,
            format!("Access to '{path}' is blocked: '{prefix}' is a restricted location"),
        )
        .with_severity(Severity::Critical)
        .with_details(json!({ "path": path, "restricted_prefix": prefix }))
        .with_resolution_step("Work outside the restricted locations")
    }

    /// Read target outside the read allowlist.
    pub fn read_access_denied(path: &str) -> Self {
        Self::new(
            READ_ACCESS_DENIED,
            format!("Read access to '{path}' is outside the allowed read paths"),
        )
        .with_details(json!({ "path": path }))
        .with_resolution_step("Request the path be added to the read allowlist, or read an allowed path")
    }

    /// Write target outside the write allowlist.
    pub fn write_access_denied(path: &str) -> Self {
        Self::new(
            WRITE_ACCESS_DENIED,
            format!("Write access to '{path}' is outside the allowed write paths"),
        )
        .with_details(json!({ "path": path }))
        .with_resolution_step("Request the path be added to the write allowlist, or write to an allowed path")
    }

    /// Skipping ahead more than one phase.
    pub fn phase_progression(current: Phase, target: Phase, next_allowed: Option<Phase>) -> Self {
        let violation = Self::new(
            PHASE_PROGRESSION_VIOLATION,
            format!("Cannot move from {current} to {target}: phases must be worked in order"),
        )
        .with_details(json!({ "current": current, "target": target }));
        match next_allowed {
            Some(next) => violation
                .with_resolution_step(format!("Complete {current}, then move to {next}")),
            None => violation.with_resolution_step("Finish the selected workflow in order"),
        }
    }

    /// Target phase is not part of the configured workflow.
    pub fn phase_not_selected(target: Phase, selected: &[Phase]) -> Self {
        let names: Vec<&str> = selected.iter().map(|p| p.wire_name()).collect();
        Self::new(
            PHASE_PROGRESSION_VIOLATION,
            format!("{target} is not part of the configured workflow"),
        )
        .with_details(json!({ "target": target, "selected_phases": selected }))
        .with_resolution_step(format!("Pick one of the configured phases: {}", names.join(", ")))
    }

    /// Quality score landed below the configured floor.
    pub fn quality_standards(score: u8, floor: u8, risks: &[String]) -> Self {
        Self::new(
            QUALITY_STANDARDS_VIOLATION,
            format!("Quality score {score} is below the required floor {floor}"),
        )
        .with_details(json!({ "score": score, "floor": floor, "risks": risks }))
        .with_resolution_steps(risks.iter().map(|r| format!("Address: {r}")))
    }

    /// Completion criteria for a phase were not all met.
    pub fn completeness(phase: Phase, failed: &[String]) -> Self {
        Self::new(
            COMPLETENESS_VIOLATION,
            format!(
                "Phase {phase} completion criteria not met: {}",
                failed.join(", ")
            ),
        )
        .with_details(json!({ "phase": phase, "failed": failed }))
        .with_resolution_steps(failed.iter().map(|f| format!("Satisfy requirement '{f}'")))
    }
}
