//! Session state: one record of everything an agent has done since
//! `start_session`.
//!
//! ## Types
//!
//! - [`Session`]: the live record (phase position, file history, metrics,
//!   validation states, iteration counts)
//! - [`FileActivity`]: per-file read/modify flags with timestamps
//! - [`SessionMetrics`]: running counters consumed by rules and summaries
//! - [`SessionSnapshot`] / [`SessionSummary`]: read-only views handed to
//!   callers
//!
//! Mutation goes through narrow methods so the invariants hold: a phase
//! enters `completed_phases` only through a forward transition or an explicit
//! output recording, never by direct mutation, and the list stays ordered and
//! duplicate-free.

pub mod store;

pub use store::SessionStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::config::WorkflowConfiguration;
use crate::iteration::IterationTracker;
use crate::phase::Phase;

/// Opaque session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the session knows about one file path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileActivity {
    pub has_been_read: bool,
    pub has_been_modified: bool,
    pub first_read_at: Option<DateTime<Utc>>,
    pub last_modified_at: Option<DateTime<Utc>>,
}

/// Running counters over the whole session.
///
/// File counters count distinct paths, not individual operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMetrics {
    pub files_analyzed: u64,
    pub files_modified: u64,
    pub lint_issues_found: u64,
    pub lint_issues_fixed: u64,
    pub phases_completed: u64,
}

/// Recorded output of a completed phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseRecord {
    pub completed_at: DateTime<Utc>,
    /// Seconds between entering the phase and recording its output
    pub duration_secs: i64,
    pub output: serde_json::Value,
}

/// Validation history for one phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationState {
    pub is_complete: bool,
    pub passed: Vec<String>,
    pub failed: Vec<String>,
    pub attempts: u32,
    pub last_validated_at: Option<DateTime<Utc>>,
}

/// The live session record. At most one exists per store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    task: String,
    started_at: DateTime<Utc>,
    current_phase: Phase,
    completed_phases: Vec<Phase>,
    phase_entered_at: HashMap<Phase, DateTime<Utc>>,
    phase_outputs: HashMap<Phase, PhaseRecord>,
    file_history: HashMap<String, FileActivity>,
    metrics: SessionMetrics,
    iterations: IterationTracker,
    validation_states: HashMap<Phase, ValidationState>,
    critical_violations: HashMap<Phase, u32>,
    config: Option<WorkflowConfiguration>,
}

impl Session {
    /// Start a new session on the first phase of the configuration, or the
    /// first phase of the default preset when no configuration is given.
    pub(crate) fn new(task: impl Into<String>, config: Option<WorkflowConfiguration>) -> Self {
        let now = Utc::now();
        let current_phase = match &config {
            Some(cfg) => cfg.first_phase(),
            None => crate::phase::WorkflowKind::default().phases()[0],
        };
        let mut phase_entered_at = HashMap::new();
        phase_entered_at.insert(current_phase, now);
        Self {
            id: SessionId::new(),
            task: task.into(),
            started_at: now,
            current_phase,
            completed_phases: Vec::new(),
            phase_entered_at,
            phase_outputs: HashMap::new(),
            file_history: HashMap::new(),
            metrics: SessionMetrics::default(),
            iterations: IterationTracker::new(),
            validation_states: HashMap::new(),
            critical_violations: HashMap::new(),
            config,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn current_phase(&self) -> Phase {
        self.current_phase
    }

    pub fn completed_phases(&self) -> &[Phase] {
        &self.completed_phases
    }

    pub fn metrics(&self) -> &SessionMetrics {
        &self.metrics
    }

    pub fn iterations(&self) -> &IterationTracker {
        &self.iterations
    }

    pub fn config(&self) -> Option<&WorkflowConfiguration> {
        self.config.as_ref()
    }

    /// A session with a configuration gets directive guidance; one without
    /// gets suggestive guidance and no enforcement of progression or limits.
    pub fn is_directive(&self) -> bool {
        self.config.is_some()
    }

    pub fn validation_state(&self, phase: Phase) -> Option<&ValidationState> {
        self.validation_states.get(&phase)
    }

    pub fn phase_output(&self, phase: Phase) -> Option<&PhaseRecord> {
        self.phase_outputs.get(&phase)
    }

    pub fn file_activity(&self, path: &str) -> Option<&FileActivity> {
        self.file_history.get(path)
    }

    pub fn file_has_been_read(&self, path: &str) -> bool {
        self.file_history
            .get(path)
            .map(|a| a.has_been_read)
            .unwrap_or(false)
    }

    pub fn critical_violation_count(&self, phase: Phase) -> u32 {
        self.critical_violations.get(&phase).copied().unwrap_or(0)
    }

    /// Record a successful read of `path`.
    pub(crate) fn record_file_read(&mut self, path: &str) {
        let entry = self.file_history.entry(path.to_string()).or_default();
        if !entry.has_been_read {
            self.metrics.files_analyzed += 1;
        }
        entry.has_been_read = true;
        if entry.first_read_at.is_none() {
            entry.first_read_at = Some(Utc::now());
        }
    }

    /// Record a successful modification of `path`.
    pub(crate) fn record_file_modified(&mut self, path: &str) {
        let entry = self.file_history.entry(path.to_string()).or_default();
        if !entry.has_been_modified {
            self.metrics.files_modified += 1;
        }
        entry.has_been_modified = true;
        entry.last_modified_at = Some(Utc::now());
    }

    /// Record the structured output of a phase and mark it complete.
    ///
    /// Recognized output arrays feed the session counters: AUDIT_INVENTORY's
    /// `files` adds to files analyzed, WRITE_OR_REFACTOR's `modified` to
    /// files modified, and LINT's `errors`/`fixed` to the lint counters.
    pub(crate) fn record_phase_output(&mut self, phase: Phase, output: serde_json::Value) {
        let now = Utc::now();
        let entered = self
            .phase_entered_at
            .get(&phase)
            .copied()
            .unwrap_or(self.started_at);
        let count_of = |key: &str| {
            output
                .get(key)
                .and_then(|v| v.as_array())
                .map(|a| a.len() as u64)
        };
        match phase {
            Phase::AuditInventory => {
                if let Some(n) = count_of("files") {
                    self.metrics.files_analyzed += n;
                }
            }
            Phase::WriteOrRefactor => {
                if let Some(n) = count_of("modified") {
                    self.metrics.files_modified += n;
                }
            }
            Phase::Lint => {
                if let Some(n) = count_of("errors") {
                    self.metrics.lint_issues_found += n;
                }
                if let Some(n) = count_of("fixed") {
                    self.metrics.lint_issues_fixed += n;
                }
            }
            _ => {}
        }
        self.phase_outputs.insert(
            phase,
            PhaseRecord {
                completed_at: now,
                duration_secs: (now - entered).num_seconds(),
                output,
            },
        );
        self.mark_phase_complete(phase);
    }

    /// Move the session to `target`.
    ///
    /// A forward move marks the departed phase complete; backward moves and
    /// escalation moves do not. Without a configuration the catalog order
    /// decides what counts as forward.
    pub(crate) fn set_phase(&mut self, target: Phase) {
        let departed = self.current_phase;
        if target != departed && !target.is_terminal() && self.is_forward_move(departed, target) {
            self.mark_phase_complete(departed);
        }
        self.current_phase = target;
        self.phase_entered_at.insert(target, Utc::now());
    }

    fn is_forward_move(&self, from: Phase, to: Phase) -> bool {
        let index_of = |phase: Phase| match &self.config {
            Some(cfg) => cfg.phase_index(phase),
            None => Phase::ALL.iter().position(|p| *p == phase),
        };
        match (index_of(from), index_of(to)) {
            (Some(f), Some(t)) => t > f,
            _ => false,
        }
    }

    fn mark_phase_complete(&mut self, phase: Phase) {
        if !self.completed_phases.contains(&phase) {
            self.completed_phases.push(phase);
            self.metrics.phases_completed = self.completed_phases.len() as u64;
        }
    }

    /// Count one more validation attempt for a phase.
    pub(crate) fn increment_iteration(&mut self, phase: Phase) -> u32 {
        self.iterations.increment(phase)
    }

    /// Record the outcome of a completion check. Attempts count regardless of
    /// the result.
    pub(crate) fn record_validation(
        &mut self,
        phase: Phase,
        is_complete: bool,
        passed: &[String],
        failed: &[String],
    ) {
        let state = self.validation_states.entry(phase).or_default();
        state.attempts += 1;
        state.is_complete = is_complete;
        state.passed = passed.to_vec();
        state.failed = failed.to_vec();
        state.last_validated_at = Some(Utc::now());
    }

    /// Count a blocking constraint violation against the current phase.
    pub(crate) fn record_critical_violation(&mut self, phase: Phase) -> u32 {
        let count = self.critical_violations.entry(phase).or_insert(0);
        *count += 1;
        *count
    }

    /// Read-only view for callers.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.clone(),
            task: self.task.clone(),
            started_at: self.started_at,
            current_phase: self.current_phase,
            completed_phases: self.completed_phases.clone(),
            metrics: self.metrics,
            directive: self.is_directive(),
        }
    }

    /// Closing summary, produced when the session ends.
    pub(crate) fn summary(&self, ended_at: DateTime<Utc>) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            task: self.task.clone(),
            started_at: self.started_at,
            ended_at,
            duration_secs: (ended_at - self.started_at).num_seconds(),
            completed_phases: self.completed_phases.clone(),
            metrics: self.metrics,
        }
    }
}

/// Read-only view of a live session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub task: String,
    pub started_at: DateTime<Utc>,
    pub current_phase: Phase,
    pub completed_phases: Vec<Phase>,
    pub metrics: SessionMetrics,
    /// True when the session runs under a workflow configuration
    pub directive: bool,
}

/// Final accounting for an ended session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub task: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_secs: i64,
    pub completed_phases: Vec<Phase>,
    pub metrics: SessionMetrics,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::WorkflowKind;
    use serde_json::json;

    fn directive_session() -> Session {
        Session::new(
            "refactor auth module",
            Some(WorkflowConfiguration::for_preset(WorkflowKind::Refactor)),
        )
    }

    #[test]
    fn new_session_starts_on_first_selected_phase() {
        let session = directive_session();
        assert_eq!(session.current_phase(), Phase::AuditInventory);
        assert!(session.completed_phases().is_empty());
        assert!(session.is_directive());
    }

    #[test]
    fn session_without_config_is_suggestive() {
        let session = Session::new("explore", None);
        assert!(!session.is_directive());
        assert_eq!(session.current_phase(), Phase::AuditInventory);
    }

    #[test]
    fn file_reads_count_distinct_paths() {
        let mut session = directive_session();
        session.record_file_read("src/auth.rs");
        session.record_file_read("src/auth.rs");
        session.record_file_read("src/lib.rs");
        assert_eq!(session.metrics().files_analyzed, 2);
        assert!(session.file_has_been_read("src/auth.rs"));
        assert!(!session.file_has_been_read("src/db.rs"));
    }

    #[test]
    fn file_modification_sets_activity_flags() {
        let mut session = directive_session();
        session.record_file_read("src/auth.rs");
        session.record_file_modified("src/auth.rs");
        let activity = session.file_activity("src/auth.rs").unwrap();
        assert!(activity.has_been_read);
        assert!(activity.has_been_modified);
        assert!(activity.first_read_at.is_some());
        assert!(activity.last_modified_at.is_some());
        assert_eq!(session.metrics().files_modified, 1);
    }

    #[test]
    fn phase_output_marks_phase_complete_once() {
        let mut session = directive_session();
        session.record_phase_output(Phase::AuditInventory, json!({"files": ["a.rs"]}));
        session.record_phase_output(Phase::AuditInventory, json!({"files": ["a.rs", "b.rs"]}));
        assert_eq!(session.completed_phases(), &[Phase::AuditInventory]);
        assert_eq!(session.metrics().phases_completed, 1);
        // The record itself is replaced
        let record = session.phase_output(Phase::AuditInventory).unwrap();
        assert_eq!(record.output["files"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn lint_output_updates_lint_counters() {
        let mut session = directive_session();
        session.record_phase_output(
            Phase::Lint,
            json!({"errors": ["unused import"], "fixed": []}),
        );
        assert_eq!(session.metrics().lint_issues_found, 1);
        assert_eq!(session.metrics().lint_issues_fixed, 0);
    }

    #[test]
    fn audit_and_write_outputs_update_file_counters() {
        let mut session = directive_session();
        session.record_phase_output(
            Phase::AuditInventory,
            json!({"files": ["a.rs", "b.rs", "c.rs"]}),
        );
        session.record_phase_output(Phase::WriteOrRefactor, json!({"modified": ["a.rs"]}));
        assert_eq!(session.metrics().files_analyzed, 3);
        assert_eq!(session.metrics().files_modified, 1);
    }

    #[test]
    fn forward_transition_completes_departed_phase() {
        let mut session = directive_session();
        session.set_phase(Phase::CompareAnalyze);
        assert_eq!(session.current_phase(), Phase::CompareAnalyze);
        assert_eq!(session.completed_phases(), &[Phase::AuditInventory]);
    }

    #[test]
    fn backward_transition_does_not_complete_departed_phase() {
        let mut session = directive_session();
        session.set_phase(Phase::CompareAnalyze);
        session.set_phase(Phase::AuditInventory);
        assert_eq!(session.completed_phases(), &[Phase::AuditInventory]);
        assert_eq!(session.current_phase(), Phase::AuditInventory);
    }

    #[test]
    fn escalation_transition_does_not_complete_departed_phase() {
        let mut session = directive_session();
        session.set_phase(Phase::UserInputRequired);
        assert!(session.completed_phases().is_empty());
        assert_eq!(session.current_phase(), Phase::UserInputRequired);
    }

    #[test]
    fn completed_phases_stay_ordered_and_unique() {
        let mut session = directive_session();
        session.set_phase(Phase::CompareAnalyze);
        session.set_phase(Phase::QuestionDetermine);
        session.set_phase(Phase::CompareAnalyze);
        session.set_phase(Phase::QuestionDetermine);
        assert_eq!(
            session.completed_phases(),
            &[Phase::AuditInventory, Phase::CompareAnalyze]
        );
    }

    #[test]
    fn validation_attempts_count_regardless_of_result() {
        let mut session = directive_session();
        session.record_validation(Phase::Test, false, &[], &["tests_run".into()]);
        session.record_validation(Phase::Test, true, &["tests_run".into()], &[]);
        let state = session.validation_state(Phase::Test).unwrap();
        assert_eq!(state.attempts, 2);
        assert!(state.is_complete);
        assert_eq!(state.passed, vec!["tests_run".to_string()]);
        assert!(state.failed.is_empty());
    }

    #[test]
    fn critical_violations_accumulate_per_phase() {
        let mut session = directive_session();
        assert_eq!(session.record_critical_violation(Phase::WriteOrRefactor), 1);
        assert_eq!(session.record_critical_violation(Phase::WriteOrRefactor), 2);
        assert_eq!(session.critical_violation_count(Phase::WriteOrRefactor), 2);
        assert_eq!(session.critical_violation_count(Phase::Test), 0);
    }

    #[test]
    fn snapshot_reflects_live_state() {
        let mut session = directive_session();
        session.record_file_read("src/a.rs");
        session.set_phase(Phase::CompareAnalyze);
        let snapshot = session.snapshot();
        assert_eq!(snapshot.current_phase, Phase::CompareAnalyze);
        assert_eq!(snapshot.completed_phases, vec![Phase::AuditInventory]);
        assert_eq!(snapshot.metrics.files_analyzed, 1);
        assert!(snapshot.directive);
    }

    #[test]
    fn summary_carries_duration_and_metrics() {
        let mut session = directive_session();
        session.record_file_read("src/a.rs");
        let ended = session.started_at() + chrono::Duration::seconds(90);
        let summary = session.summary(ended);
        assert_eq!(summary.duration_secs, 90);
        assert_eq!(summary.metrics.files_analyzed, 1);
        assert_eq!(summary.task, "refactor auth module");
    }
}
