//! Escalation to human input.
//!
//! This module detects when a session should hand control to a person:
//! - A capped phase has used up its iteration limit
//! - Validation keeps failing in the same phase
//! - Critical constraint violations keep blocking progress
//!
//! Escalation is advisory. The resolver reports an [`EscalationContext`];
//! actually switching the session to `USER_INPUT_REQUIRED` is the caller's
//! move. Configured checkpoints are a separate, softer mechanism checked
//! through [`EscalationResolver::requires_user_checkpoint`].

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::config::{EscalationTriggers, IterationLimits, UserCheckpoints, WorkflowConfiguration};
use crate::phase::Phase;
use crate::session::Session;

/// Validation attempts in one phase before the repeated-failure trigger fires.
pub const REPEATED_FAILURE_THRESHOLD: u32 = 3;

/// Critical violations in one phase before the blocked-constraint trigger fires.
pub const BLOCKED_CONSTRAINT_THRESHOLD: u32 = 3;

/// Why a session is being handed to a human.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationTrigger {
    /// A capped phase reached its iteration limit.
    IterationLimit,
    /// The same phase failed validation repeatedly.
    RepeatedValidationFailure,
    /// Critical constraint violations keep blocking the phase.
    BlockedConstraint,
}

impl EscalationTrigger {
    /// Get a human-readable description of the trigger.
    pub fn description(&self) -> &'static str {
        match self {
            Self::IterationLimit => "Iteration limit reached without success",
            Self::RepeatedValidationFailure => "Phase validation failed repeatedly",
            Self::BlockedConstraint => "Critical constraint violations keep blocking this phase",
        }
    }
}

/// Everything a human needs to take over a stuck session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationContext {
    pub trigger: EscalationTrigger,
    pub failed_phase: Phase,
    pub attempt_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Choices to present to the user
    pub options: Vec<String>,
    /// Structured details about the stuck state
    pub context: Value,
}

impl EscalationContext {
    /// One-line summary for logs and CLI output.
    pub fn summary(&self) -> String {
        format!(
            "{} in {} after {} attempt(s)",
            self.trigger.description(),
            self.failed_phase,
            self.attempt_count
        )
    }
}

/// Detects escalation conditions and configured user checkpoints.
#[derive(Debug, Clone, Default)]
pub struct EscalationResolver {
    triggers: EscalationTriggers,
    checkpoints: UserCheckpoints,
}

impl EscalationResolver {
    pub fn new(triggers: EscalationTriggers, checkpoints: UserCheckpoints) -> Self {
        Self {
            triggers,
            checkpoints,
        }
    }

    pub fn from_config(config: &WorkflowConfiguration) -> Self {
        Self::new(config.escalation_triggers, config.user_checkpoints.clone())
    }

    /// Check whether the phase has exhausted its iteration limit.
    pub fn check_iteration_limit(
        &self,
        phase: Phase,
        session: &Session,
        limits: &IterationLimits,
    ) -> Option<EscalationContext> {
        if !self.triggers.on_iteration_limit {
            return None;
        }
        if !session.iterations().has_reached_limit(phase, limits) {
            return None;
        }
        let count = session.iterations().count(phase);
        Some(EscalationContext {
            trigger: EscalationTrigger::IterationLimit,
            failed_phase: phase,
            attempt_count: count,
            last_error: None,
            options: vec![
                "Review the failures and provide direction".to_string(),
                "Raise the iteration limit and continue".to_string(),
                "Accept the current state and move on".to_string(),
                "End the session".to_string(),
            ],
            context: json!({
                "iteration_count": count,
                "limit": limits.limit_for(phase),
            }),
        })
    }

    /// Check whether validation has failed often enough in this phase.
    pub fn check_validation_failures(
        &self,
        phase: Phase,
        session: &Session,
        last_error: Option<&str>,
    ) -> Option<EscalationContext> {
        if !self.triggers.on_repeated_validation_failure {
            return None;
        }
        let state = session.validation_state(phase)?;
        if state.is_complete || state.attempts < REPEATED_FAILURE_THRESHOLD {
            return None;
        }
        Some(EscalationContext {
            trigger: EscalationTrigger::RepeatedValidationFailure,
            failed_phase: phase,
            attempt_count: state.attempts,
            last_error: last_error.map(str::to_string),
            options: vec![
                "Clarify the completion requirements".to_string(),
                "Complete the remaining work manually".to_string(),
                "End the session".to_string(),
            ],
            context: json!({
                "attempts": state.attempts,
                "failed_requirements": state.failed,
            }),
        })
    }

    /// Check whether critical violations keep blocking this phase.
    pub fn check_blocked_constraint(
        &self,
        phase: Phase,
        session: &Session,
    ) -> Option<EscalationContext> {
        if !self.triggers.on_blocked_constraint {
            return None;
        }
        let count = session.critical_violation_count(phase);
        if count < BLOCKED_CONSTRAINT_THRESHOLD {
            return None;
        }
        Some(EscalationContext {
            trigger: EscalationTrigger::BlockedConstraint,
            failed_phase: phase,
            attempt_count: count,
            last_error: None,
            options: vec![
                "Adjust the constraint configuration".to_string(),
                "Choose a different approach for this phase".to_string(),
                "End the session".to_string(),
            ],
            context: json!({ "critical_violations": count }),
        })
    }

    /// Check all escalation conditions.
    ///
    /// Checks run in a fixed order: iteration limit, then repeated validation
    /// failure, then blocked constraint. The first hit wins.
    pub fn should_escalate(
        &self,
        phase: Phase,
        session: &Session,
        limits: &IterationLimits,
        last_error: Option<&str>,
    ) -> Option<EscalationContext> {
        if let Some(context) = self.check_iteration_limit(phase, session, limits) {
            return Some(context);
        }
        if let Some(context) = self.check_validation_failures(phase, session, last_error) {
            return Some(context);
        }
        self.check_blocked_constraint(phase, session)
    }

    /// Whether a configured checkpoint pauses the workflow at this phase.
    ///
    /// Independent of escalation: a checkpoint is a planned pause, not a
    /// stuck state.
    pub fn requires_user_checkpoint(&self, phase: Phase, session: &Session) -> bool {
        if self.checkpoints.before_major_changes && phase == Phase::WriteOrRefactor {
            return true;
        }
        if self.checkpoints.before_final_presentation && phase == Phase::Present {
            return true;
        }
        if self.checkpoints.after_failed_iterations {
            let failed_before = session
                .validation_state(phase)
                .is_some_and(|state| state.attempts > 0 && !state.is_complete);
            if failed_before {
                return true;
            }
        }
        self.checkpoints.custom.contains(&phase)
    }
}
