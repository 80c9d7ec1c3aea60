//! Constraint enforcement for agent actions.
//!
//! The engine answers one question: is this action allowed right now? Checks
//! are pure; nothing here mutates the session. Recording the effect of an
//! allowed action (a read, a modification) is the caller's explicit step.
//!
//! Three constraint families:
//!
//! - filesystem safety: read-before-write, path traversal, restricted
//!   prefixes, opt-in allowlists
//! - phase progression: forward movement through the configured sequence one
//!   step at a time
//! - custom rules: deployment-defined [`ConstraintRule`] predicates

pub mod rules;
pub mod violation;

pub use rules::{ActionRequest, ConstraintRule, RulePredicate, SessionMetric};
pub use violation::{ConstraintViolation, Severity};

use crate::config::WorkflowConfiguration;
use crate::phase::Phase;
use crate::session::{Session, SessionMetrics};

/// File operation class derived from an action description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOp {
    Read,
    Write,
    Delete,
}

impl FileOp {
    /// Classify a free-form action description by keyword.
    ///
    /// Write keywords win over delete, delete over read, so the strictest
    /// applicable checks run when a description mixes verbs. Returns `None`
    /// for actions that are not file operations at all.
    pub fn from_action(action: &str) -> Option<Self> {
        let lowered = action.to_lowercase();
        let tokens: Vec<&str> = lowered
            .split_whitespace()
            .map(|t| t.trim_matches(|c: char| !c.is_ascii_alphanumeric()))
            .collect();
        let has = |keywords: &[&str]| tokens.iter().any(|t| keywords.contains(t));

        if has(&["modify", "write", "edit", "create", "update", "change", "rewrite", "append"]) {
            Some(Self::Write)
        } else if has(&["delete", "remove", "rm"]) {
            Some(Self::Delete)
        } else if has(&["read", "view", "open", "inspect", "cat"]) {
            Some(Self::Read)
        } else {
            None
        }
    }

    pub fn is_mutation(&self) -> bool {
        matches!(self, Self::Write | Self::Delete)
    }
}

impl std::fmt::Display for FileOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Delete => "delete",
        };
        write!(f, "{}", s)
    }
}

/// Filesystem access policy: restricted prefixes plus opt-in allowlists.
///
/// An empty allowlist imposes no restriction from that list. Prefixes match
/// against the path with any leading `./` stripped.
#[derive(Debug, Clone)]
pub struct FilesystemPolicy {
    restricted_prefixes: Vec<String>,
    allowed_read_prefixes: Vec<String>,
    allowed_write_prefixes: Vec<String>,
}

impl Default for FilesystemPolicy {
    fn default() -> Self {
        Self {
            restricted_prefixes: vec![
                ".git".to_string(),
                ".env".to_string(),
                "node_modules".to_string(),
            ],
            allowed_read_prefixes: Vec::new(),
            allowed_write_prefixes: Vec::new(),
        }
    }
}

impl FilesystemPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// A policy with no restricted prefixes and no allowlists.
    pub fn unrestricted() -> Self {
        Self {
            restricted_prefixes: Vec::new(),
            allowed_read_prefixes: Vec::new(),
            allowed_write_prefixes: Vec::new(),
        }
    }

    pub fn with_restricted_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.restricted_prefixes.push(prefix.into());
        self
    }

    pub fn with_allowed_read_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.allowed_read_prefixes.push(prefix.into());
        self
    }

    pub fn with_allowed_write_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.allowed_write_prefixes.push(prefix.into());
        self
    }

    pub fn restricted_prefixes(&self) -> &[String] {
        &self.restricted_prefixes
    }

    /// The restricted prefix the path falls under, if any.
    pub fn matching_restriction(&self, path: &str) -> Option<&str> {
        let normalized = normalize_path(path);
        self.restricted_prefixes
            .iter()
            .find(|prefix| normalized.starts_with(prefix.as_str()))
            .map(String::as_str)
    }

    pub fn read_allowed(&self, path: &str) -> bool {
        allowed_by(&self.allowed_read_prefixes, path)
    }

    pub fn write_allowed(&self, path: &str) -> bool {
        allowed_by(&self.allowed_write_prefixes, path)
    }
}

fn allowed_by(prefixes: &[String], path: &str) -> bool {
    if prefixes.is_empty() {
        return true;
    }
    let normalized = normalize_path(path);
    prefixes.iter().any(|prefix| normalized.starts_with(prefix.as_str()))
}

fn normalize_path(path: &str) -> &str {
    path.trim().trim_start_matches("./")
}

/// Validates agent actions against filesystem, progression, and custom rules.
#[derive(Debug, Default)]
pub struct ConstraintEngine {
    policy: FilesystemPolicy,
    rules: Vec<ConstraintRule>,
    read_before_write_disabled: bool,
}

impl ConstraintEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(mut self, policy: FilesystemPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_rule(mut self, rule: ConstraintRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_rules(mut self, rules: impl IntoIterator<Item = ConstraintRule>) -> Self {
        self.rules.extend(rules);
        self
    }

    /// Turn off the read-before-write rule. On by default.
    pub fn without_read_before_write(mut self) -> Self {
        self.read_before_write_disabled = true;
        self
    }

    pub fn policy(&self) -> &FilesystemPolicy {
        &self.policy
    }

    pub fn rules(&self) -> &[ConstraintRule] {
        &self.rules
    }

    /// Validate a file operation against session history and the policy.
    ///
    /// Pure check: the session is read, never mutated. Callers record the
    /// read or modification themselves once the action actually happens.
    pub fn validate_file_operation(
        &self,
        session: &Session,
        path: &str,
        op: FileOp,
    ) -> Result<(), ConstraintViolation> {
        if op == FileOp::Write
            && !self.read_before_write_disabled
            && !session.file_has_been_read(path)
        {
            return Err(ConstraintViolation::file_read_before_modification(path));
        }
        self.validate_filesystem_access(path, op)
    }

    /// Path-level checks alone: traversal, restricted prefixes, allowlists.
    pub fn validate_filesystem_access(
        &self,
        path: &str,
        op: FileOp,
    ) -> Result<(), ConstraintViolation> {
        if path.contains("../") || path.contains("..\\") {
            return Err(ConstraintViolation::path_traversal(path));
        }
        if let Some(prefix) = self.policy.matching_restriction(path) {
            return Err(ConstraintViolation::restricted_path(path, prefix));
        }
        match op {
            FileOp::Read => {
                if !self.policy.read_allowed(path) {
                    return Err(ConstraintViolation::read_access_denied(path));
                }
            }
            FileOp::Write | FileOp::Delete => {
                if !self.policy.write_allowed(path) {
                    return Err(ConstraintViolation::write_access_denied(path));
                }
            }
        }
        Ok(())
    }

    /// Validate a phase transition against the configured sequence.
    ///
    /// Staying put or moving backward is always fine; skipping forward by
    /// more than one step is not. The escalation phase is reachable from
    /// anywhere, and a current phase outside the selection places no
    /// constraint on where work resumes.
    pub fn validate_phase_progression(
        &self,
        config: &WorkflowConfiguration,
        current: Phase,
        target: Phase,
    ) -> Result<(), ConstraintViolation> {
        if target.is_terminal() {
            return Ok(());
        }
        let Some(target_index) = config.phase_index(target) else {
            return Err(ConstraintViolation::phase_not_selected(
                target,
                &config.selected_phases,
            ));
        };
        match config.phase_index(current) {
            Some(current_index) if target_index > current_index + 1 => {
                Err(ConstraintViolation::phase_progression(
                    current,
                    target,
                    config.next_phase_after(current),
                ))
            }
            _ => Ok(()),
        }
    }

    /// Run every custom rule applicable in the phase, collecting all hits.
    pub fn validate_custom_constraints(
        &self,
        phase: Phase,
        request: &ActionRequest,
        metrics: &SessionMetrics,
    ) -> Vec<ConstraintViolation> {
        self.rules
            .iter()
            .filter_map(|rule| rule.check(phase, request, metrics))
            .collect()
    }
}
