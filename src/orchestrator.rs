//! The orchestrator: single entry point tying sessions, constraints,
//! validation, and escalation together.
//!
//! Every operation locks the session store for its whole duration, so
//! session-mutating calls are serialized even when the caller is not. All
//! results are payload values the agent can act on; the only Rust errors
//! out of this module are operational ones (no active session, poisoned
//! lock).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::config::WorkflowConfiguration;
use crate::constraint::{ActionRequest, ConstraintEngine, ConstraintViolation, FileOp, Severity};
use crate::errors::WaymarkError;
use crate::escalation::{EscalationContext, EscalationResolver};
use crate::guidance::{PhaseGuidance, guidance_for};
use crate::naming::{artifact_path, numbered_file_name, sanitize_task_name};
use crate::phase::{Phase, WorkflowKind};
use crate::quality::{DEFAULT_QUALITY_FLOOR, ExecutionContext, QualityAdvisor};
use crate::session::{Session, SessionSnapshot, SessionStore, SessionSummary};
use crate::validation::{Artifact, ArtifactError, ArtifactValidator, ValidationEngine};

/// Verdict on a proposed action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionVerdict {
    pub allowed: bool,
    /// The violation that denied the action
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub violation: Option<ConstraintViolation>,
    /// Non-blocking violations worth surfacing even when allowed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub advisories: Vec<ConstraintViolation>,
}

/// Result of recording a phase output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseOutputResponse {
    pub recorded: bool,
    pub artifacts_validated: bool,
    /// Suggested canonical paths for the submitted artifacts
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ArtifactError>,
}

/// Verdict on a phase completion claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionVerdict {
    pub phase: Phase,
    /// Criteria met and quality at or above the floor
    pub is_valid: bool,
    /// Valid and no escalation pending; escalation wins over a pass
    pub can_proceed: bool,
    pub escalation_required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_requirements: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocking_messages: Vec<String>,
    pub next_steps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<ConstraintViolation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalation: Option<EscalationContext>,
}

/// Result of a phase transition attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub allowed: bool,
    pub from: Phase,
    pub to: Phase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub violation: Option<ConstraintViolation>,
    /// A configured checkpoint asks for user confirmation at the target
    pub requires_checkpoint: bool,
}

/// Drives one agent workflow session.
pub struct Orchestrator {
    store: Mutex<SessionStore>,
    constraints: ConstraintEngine,
    validation: ValidationEngine,
    artifacts: ArtifactValidator,
    advisor: Option<Box<dyn QualityAdvisor>>,
    quality_floor: u8,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Orchestrator {
    pub fn new() -> Self {
        Self {
            store: Mutex::new(SessionStore::new()),
            constraints: ConstraintEngine::new(),
            validation: ValidationEngine::new(),
            artifacts: ArtifactValidator::new(),
            advisor: None,
            quality_floor: DEFAULT_QUALITY_FLOOR,
        }
    }

    pub fn with_constraint_engine(mut self, engine: ConstraintEngine) -> Self {
        self.constraints = engine;
        self
    }

    /// Enable quality scoring on completion checks.
    pub fn with_advisor(mut self, advisor: impl QualityAdvisor + 'static) -> Self {
        self.advisor = Some(Box::new(advisor));
        self
    }

    pub fn with_quality_floor(mut self, floor: u8) -> Self {
        self.quality_floor = floor;
        self
    }

    fn lock_store(&self) -> Result<MutexGuard<'_, SessionStore>, WaymarkError> {
        self.store.lock().map_err(|_| WaymarkError::LockPoisoned)
    }

    /// Start a session, replacing any live one.
    ///
    /// An explicit configuration wins over a preset name; with neither the
    /// session runs without enforcement and guidance stays suggestive.
    /// A configuration that selects no phases is rejected, so configurations
    /// deserialized without the builder cannot start a session on nothing.
    pub fn start_session(
        &self,
        task: &str,
        config: Option<WorkflowConfiguration>,
        workflow: Option<WorkflowKind>,
    ) -> Result<SessionSnapshot, WaymarkError> {
        let config = config.or_else(|| workflow.map(WorkflowConfiguration::for_preset));
        if let Some(cfg) = &config {
            if cfg.selected_phases.is_empty() {
                return Err(WaymarkError::InvalidConfiguration(
                    "no phases selected; pick a preset or select phases explicitly".into(),
                ));
            }
        }
        let mut store = self.lock_store()?;
        let session = store.start(task, config);
        Ok(session.snapshot())
    }

    /// Guidance for a phase, directive when the live session has a
    /// configuration. Works without a session.
    pub fn phase_guidance(&self, phase: Phase) -> Result<PhaseGuidance, WaymarkError> {
        let store = self.lock_store()?;
        let config = store.active().and_then(|session| session.config());
        Ok(guidance_for(phase, config))
    }

    /// Record a phase's output after validating its artifacts.
    ///
    /// On artifact problems nothing is recorded; the response lists every
    /// problem so the agent can resubmit once.
    pub fn phase_output(
        &self,
        phase: Phase,
        output: Value,
        artifacts: &[Artifact],
    ) -> Result<PhaseOutputResponse, WaymarkError> {
        let mut store = self.lock_store()?;
        let session = store.get_mut()?;

        let errors = self.artifacts.validate(phase, artifacts);
        if !errors.is_empty() {
            debug!(phase = %phase, problems = errors.len(), "phase output rejected");
            return Ok(PhaseOutputResponse {
                recorded: false,
                artifacts_validated: false,
                artifacts: Vec::new(),
                message: format!("Artifacts for {phase} failed validation; nothing was recorded"),
                errors,
            });
        }

        let prefs = session
            .config()
            .map(|config| config.output_preferences.clone())
            .unwrap_or_default();
        let date = prefs
            .include_date_in_filenames
            .then(|| chrono::Utc::now().date_naive());
        let task_segment = prefs
            .subdirectory_per_task
            .then(|| sanitize_task_name(session.task()));
        let suggested: Vec<String> = artifacts
            .iter()
            .map(|artifact| {
                artifact_path(
                    &prefs.directory,
                    task_segment.as_deref(),
                    &numbered_file_name(phase, artifact.format, date),
                )
            })
            .collect();

        session.record_phase_output(phase, output);
        info!(phase = %phase, artifacts = artifacts.len(), "phase output recorded");
        Ok(PhaseOutputResponse {
            recorded: true,
            artifacts_validated: true,
            artifacts: suggested,
            message: format!("{phase} output recorded"),
            errors: Vec::new(),
        })
    }

    /// Validate a proposed action against file rules and custom constraints.
    ///
    /// Allowed file actions are recorded in the session's file history;
    /// denied ones leave no trace beyond the critical-violation counter.
    pub fn validate_action(
        &self,
        action: &str,
        target: Option<&str>,
    ) -> Result<ActionVerdict, WaymarkError> {
        let mut store = self.lock_store()?;
        let session = store.get_mut()?;
        let phase = session.current_phase();

        let mut request = ActionRequest::new(action);
        if let Some(target) = target {
            request = request.with_target(target);
        }

        let file_op = target.and_then(|_| FileOp::from_action(action));
        if let (Some(path), Some(op)) = (target, file_op) {
            if let Err(violation) = self.constraints.validate_file_operation(session, path, op) {
                return Ok(self.deny(session, phase, violation));
            }
        }

        let mut advisories = Vec::new();
        for violation in
            self.constraints
                .validate_custom_constraints(phase, &request, session.metrics())
        {
            if violation.is_blocking() {
                return Ok(self.deny(session, phase, violation));
            }
            advisories.push(violation);
        }

        if let (Some(path), Some(op)) = (target, file_op) {
            match op {
                FileOp::Read => session.record_file_read(path),
                FileOp::Write => session.record_file_modified(path),
                FileOp::Delete => {}
            }
        }

        Ok(ActionVerdict {
            allowed: true,
            violation: None,
            advisories,
        })
    }

    fn deny(
        &self,
        session: &mut Session,
        phase: Phase,
        violation: ConstraintViolation,
    ) -> ActionVerdict {
        debug!(
            phase = %phase,
            constraint = violation.constraint_id(),
            "action denied"
        );
        if violation.severity() == Severity::Critical {
            session.record_critical_violation(phase);
        }
        ActionVerdict {
            allowed: false,
            violation: Some(violation),
            advisories: Vec::new(),
        }
    }

    /// Check a completion claim, record the attempt, and decide whether the
    /// agent may proceed.
    ///
    /// The attempt counter moves on every call. A failed check also counts
    /// as an iteration of the phase. Escalation takes priority: a phase that
    /// validates clean but has tripped an escalation trigger still cannot
    /// proceed.
    pub fn validate_phase_completion(
        &self,
        phase: Phase,
        completed_work: &Map<String, Value>,
        created_files: &[String],
    ) -> Result<CompletionVerdict, WaymarkError> {
        let mut store = self.lock_store()?;
        let session = store.get_mut()?;

        let outcome = self
            .validation
            .validate_phase_completion(phase, completed_work, created_files);
        session.record_validation(phase, outcome.is_complete, &outcome.passed, &outcome.failed);
        if !outcome.is_complete {
            session.increment_iteration(phase);
        }

        let quality = if outcome.is_complete {
            self.assess_quality(session, phase)
        } else {
            None
        };

        let escalation = session.config().cloned().and_then(|config| {
            EscalationResolver::from_config(&config).should_escalate(
                phase,
                session,
                &config.iteration_limits,
                outcome.failed.first().map(String::as_str),
            )
        });
        if let Some(context) = &escalation {
            warn!(phase = %phase, trigger = ?context.trigger, "escalating to user input");
        }

        let is_valid = outcome.is_complete && quality.is_none();
        let escalation_required = escalation.is_some();
        Ok(CompletionVerdict {
            phase,
            is_valid,
            can_proceed: is_valid && !escalation_required,
            escalation_required,
            failed_requirements: outcome.failed,
            blocking_messages: outcome.blocking_messages,
            next_steps: outcome.next_steps,
            quality,
            escalation,
        })
    }

    fn assess_quality(&self, session: &Session, phase: Phase) -> Option<ConstraintViolation> {
        let advisor = self.advisor.as_ref()?;
        let context = ExecutionContext {
            phase,
            task: session.task().to_string(),
            iteration_count: session.iterations().count(phase),
            files_modified: session.metrics().files_modified,
            recent_failures: session
                .validation_state(phase)
                .map(|state| state.failed.clone())
                .unwrap_or_default(),
        };
        let assessment = advisor.assess(&context);
        if assessment.meets_floor(self.quality_floor) {
            None
        } else {
            Some(ConstraintViolation::quality_standards(
                assessment.score,
                self.quality_floor,
                &assessment.risks,
            ))
        }
    }

    /// Attempt a phase transition.
    ///
    /// Denied transitions leave the session where it was. Allowed ones may
    /// carry a checkpoint flag asking for user confirmation at the target.
    pub fn advance_phase(&self, target: Phase) -> Result<TransitionOutcome, WaymarkError> {
        let mut store = self.lock_store()?;
        let session = store.get_mut()?;
        let from = session.current_phase();
        let config = session.config().cloned();

        if let Some(config) = &config {
            if let Err(violation) = self
                .constraints
                .validate_phase_progression(config, from, target)
            {
                debug!(from = %from, to = %target, "transition denied");
                return Ok(TransitionOutcome {
                    allowed: false,
                    from,
                    to: target,
                    violation: Some(violation),
                    requires_checkpoint: false,
                });
            }
        }

        let requires_checkpoint = config
            .as_ref()
            .map(|config| {
                EscalationResolver::from_config(config).requires_user_checkpoint(target, session)
            })
            .unwrap_or(false);

        session.set_phase(target);
        info!(from = %from, to = %target, checkpoint = requires_checkpoint, "phase transition");
        Ok(TransitionOutcome {
            allowed: true,
            from,
            to: target,
            violation: None,
            requires_checkpoint,
        })
    }

    /// End the live session and return its closing summary.
    pub fn end_session(&self) -> Result<SessionSummary, WaymarkError> {
        let mut store = self.lock_store()?;
        store.end().ok_or(WaymarkError::NoActiveSession)
    }

    /// Read-only view of the live session, if any.
    pub fn session_snapshot(&self) -> Result<Option<SessionSnapshot>, WaymarkError> {
        let store = self.lock_store()?;
        Ok(store.active().map(Session::snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starting_with_a_preset_makes_the_session_directive() {
        let orchestrator = Orchestrator::new();
        let snapshot = orchestrator
            .start_session("refactor the parser", None, Some(WorkflowKind::Refactor))
            .unwrap();
        assert!(snapshot.directive);
        assert_eq!(snapshot.current_phase, Phase::AuditInventory);
    }

    #[test]
    fn starting_bare_leaves_guidance_suggestive() {
        let orchestrator = Orchestrator::new();
        let snapshot = orchestrator.start_session("poke around", None, None).unwrap();
        assert!(!snapshot.directive);

        let guidance = orchestrator.phase_guidance(Phase::Test).unwrap();
        assert_eq!(guidance.mode, crate::guidance::GuidanceMode::Suggestive);
    }

    #[test]
    fn explicit_config_wins_over_preset() {
        let orchestrator = Orchestrator::new();
        let config = WorkflowConfiguration::for_preset(WorkflowKind::QuickFix);
        let snapshot = orchestrator
            .start_session("hotfix", Some(config), Some(WorkflowKind::Full))
            .unwrap();
        assert_eq!(snapshot.current_phase, Phase::WriteOrRefactor);
    }

    #[test]
    fn operations_without_a_session_fail_cleanly() {
        let orchestrator = Orchestrator::new();
        assert!(matches!(
            orchestrator.validate_action("modify file", Some("src/lib.rs")),
            Err(WaymarkError::NoActiveSession)
        ));
        assert!(matches!(
            orchestrator.end_session(),
            Err(WaymarkError::NoActiveSession)
        ));
        assert!(orchestrator.session_snapshot().unwrap().is_none());
    }

    #[test]
    fn guidance_works_without_a_session() {
        let orchestrator = Orchestrator::new();
        let guidance = orchestrator.phase_guidance(Phase::Planning).unwrap();
        assert_eq!(guidance.phase, Phase::Planning);
    }

    #[test]
    fn empty_artifacts_reject_the_output() {
        let orchestrator = Orchestrator::new();
        orchestrator
            .start_session("task", None, Some(WorkflowKind::QuickFix))
            .unwrap();
        let response = orchestrator
            .phase_output(Phase::WriteOrRefactor, serde_json::json!({}), &[])
            .unwrap();
        assert!(!response.recorded);
        assert!(!response.artifacts_validated);
        assert_eq!(response.errors.len(), 1);
    }
}
