//! Declarative custom constraint rules.
//!
//! Rules are data: a predicate over a proposed action plus metadata for the
//! violation emitted when the predicate matches. They serialize cleanly so a
//! deployment can ship its own rule set alongside the workflow configuration.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::fmt;

use crate::constraint::violation::{ConstraintViolation, Severity};
use crate::phase::Phase;
use crate::session::SessionMetrics;

/// A proposed agent action submitted for validation.
///
/// `action` is the free-form description the agent supplies ("modify file",
/// "run tests"), `target` the path or object it applies to, and `context`
/// any extra structured hints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionRequest {
    action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    context: HashMap<String, Value>,
}

impl ActionRequest {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            target: None,
            context: HashMap::new(),
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_flag(mut self, key: impl Into<String>, value: bool) -> Self {
        self.context.insert(key.into(), Value::Bool(value));
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// A context flag, false when absent or not a boolean.
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.context.get(key), Some(Value::Bool(true)))
    }

    pub fn context_value(&self, key: &str) -> Option<&Value> {
        self.context.get(key)
    }
}

/// A session counter a rule predicate can threshold against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMetric {
    FilesAnalyzed,
    FilesModified,
    LintIssuesFound,
    LintIssuesFixed,
    PhasesCompleted,
}

impl SessionMetric {
    pub fn value_in(&self, metrics: &SessionMetrics) -> u64 {
        match self {
            Self::FilesAnalyzed => metrics.files_analyzed,
            Self::FilesModified => metrics.files_modified,
            Self::LintIssuesFound => metrics.lint_issues_found,
            Self::LintIssuesFixed => metrics.lint_issues_fixed,
            Self::PhasesCompleted => metrics.phases_completed,
        }
    }
}

impl fmt::Display for SessionMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::FilesAnalyzed => "files_analyzed",
            Self::FilesModified => "files_modified",
            Self::LintIssuesFound => "lint_issues_found",
            Self::LintIssuesFixed => "lint_issues_fixed",
            Self::PhasesCompleted => "phases_completed",
        };
        write!(f, "{}", s)
    }
}

/// Composable predicate over an [`ActionRequest`] and the session metrics.
///
/// String matching on the action is case-insensitive; target matching is
/// exact-case prefix/suffix. A missing target never matches a target
/// predicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RulePredicate {
    /// Action description contains the needle.
    ActionContains { needle: String },
    /// Action description equals the given action.
    ActionIs { action: String },
    /// Target path starts with the prefix.
    TargetStartsWith { prefix: String },
    /// Target path ends with the suffix.
    TargetEndsWith { suffix: String },
    /// Context carries this flag set to true.
    ContextFlag { key: String },
    /// Session metric is at or above the threshold.
    MetricAtLeast { metric: SessionMetric, min: u64 },
    /// Every sub-rule matches (vacuously true when empty).
    All { rules: Vec<RulePredicate> },
    /// At least one sub-rule matches.
    Any { rules: Vec<RulePredicate> },
    /// The sub-rule does not match.
    Not { rule: Box<RulePredicate> },
}

impl RulePredicate {
    pub fn evaluate(&self, request: &ActionRequest, metrics: &SessionMetrics) -> bool {
        match self {
            Self::ActionContains { needle } => request
                .action()
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            Self::ActionIs { action } => request.action().eq_ignore_ascii_case(action),
            Self::TargetStartsWith { prefix } => {
                request.target().is_some_and(|t| t.starts_with(prefix.as_str()))
            }
            Self::TargetEndsWith { suffix } => {
                request.target().is_some_and(|t| t.ends_with(suffix.as_str()))
            }
            Self::ContextFlag { key } => request.flag(key),
            Self::MetricAtLeast { metric, min } => metric.value_in(metrics) >= *min,
            Self::All { rules } => rules.iter().all(|r| r.evaluate(request, metrics)),
            Self::Any { rules } => rules.iter().any(|r| r.evaluate(request, metrics)),
            Self::Not { rule } => !rule.evaluate(request, metrics),
        }
    }
}

/// A named custom constraint: predicate plus the violation it produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintRule {
    id: String,
    name: String,
    predicate: RulePredicate,
    /// Empty means the rule applies in every phase
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    applicable_phases: Vec<Phase>,
    #[serde(default)]
    severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    resolution_steps: Vec<String>,
}

impl ConstraintRule {
    pub fn new(id: impl Into<String>, name: impl Into<String>, predicate: RulePredicate) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            predicate,
            applicable_phases: Vec::new(),
            severity: Severity::default(),
            message: None,
            resolution_steps: Vec::new(),
        }
    }

    /// Restrict the rule to specific phases.
    pub fn for_phases(mut self, phases: impl IntoIterator<Item = Phase>) -> Self {
        self.applicable_phases.extend(phases);
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Override the violation message (defaults to the rule name).
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_resolution_step(mut self, step: impl Into<String>) -> Self {
        self.resolution_steps.push(step.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn applies_to(&self, phase: Phase) -> bool {
        self.applicable_phases.is_empty() || self.applicable_phases.contains(&phase)
    }

    /// Evaluate the rule, producing a violation when the predicate matches.
    pub fn check(
        &self,
        phase: Phase,
        request: &ActionRequest,
        metrics: &SessionMetrics,
    ) -> Option<ConstraintViolation> {
        if !self.applies_to(phase) || !self.predicate.evaluate(request, metrics) {
            return None;
        }
        let message = self.message.clone().unwrap_or_else(|| self.name.clone());
        Some(
            ConstraintViolation::new(&self.id, message)
                .with_severity(self.severity)
                .with_details(json!({ "rule": self.name, "action": request.action() }))
                .with_resolution_steps(self.resolution_steps.iter().cloned()),
        )
    }
}
