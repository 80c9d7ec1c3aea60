//! Phase definitions and the workflow preset catalog.
//!
//! This module provides:
//! - `Phase`: the fixed set of work phases an agent moves through
//! - `WorkflowKind`: named presets mapping to ordered phase sequences
//! - Numeric file prefixes, slugs, and guidance-tool names per phase
//!
//! The catalog is pure data: nothing here touches a session or the
//! filesystem.

use serde::{Deserialize, Serialize};

/// A single work phase in an agent workflow.
///
/// `UserInputRequired` is special: it is never part of a preset sequence and
/// is only entered through escalation. Once a session is in it, the workflow
/// is paused until a human intervenes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// Environment preparation before any analysis
    Setup,
    /// Up-front planning for feature work
    Planning,
    /// Catalog the code the task touches
    AuditInventory,
    /// Weigh approaches against each other
    CompareAnalyze,
    /// Resolve open questions into decisions
    QuestionDetermine,
    /// The actual code change
    WriteOrRefactor,
    /// Run and triage tests
    Test,
    /// Run and triage lint
    Lint,
    /// Address feedback from test/lint rounds
    Iterate,
    /// Summarize the finished work
    Present,
    /// Terminal escalation state, human intervention needed
    UserInputRequired,
}

impl Phase {
    /// Every phase, in catalog order.
    pub const ALL: [Phase; 11] = [
        Phase::Setup,
        Phase::Planning,
        Phase::AuditInventory,
        Phase::CompareAnalyze,
        Phase::QuestionDetermine,
        Phase::WriteOrRefactor,
        Phase::Test,
        Phase::Lint,
        Phase::Iterate,
        Phase::Present,
        Phase::UserInputRequired,
    ];

    /// Wire name as it appears in configs and agent-facing payloads.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Phase::Setup => "SETUP",
            Phase::Planning => "PLANNING",
            Phase::AuditInventory => "AUDIT_INVENTORY",
            Phase::CompareAnalyze => "COMPARE_ANALYZE",
            Phase::QuestionDetermine => "QUESTION_DETERMINE",
            Phase::WriteOrRefactor => "WRITE_OR_REFACTOR",
            Phase::Test => "TEST",
            Phase::Lint => "LINT",
            Phase::Iterate => "ITERATE",
            Phase::Present => "PRESENT",
            Phase::UserInputRequired => "USER_INPUT_REQUIRED",
        }
    }

    /// Lowercase hyphenated form used in generated file names.
    pub fn slug(&self) -> &'static str {
        match self {
            Phase::Setup => "setup",
            Phase::Planning => "planning",
            Phase::AuditInventory => "audit-inventory",
            Phase::CompareAnalyze => "compare-analyze",
            Phase::QuestionDetermine => "question-determine",
            Phase::WriteOrRefactor => "write-or-refactor",
            Phase::Test => "test",
            Phase::Lint => "lint",
            Phase::Iterate => "iterate",
            Phase::Present => "present",
            Phase::UserInputRequired => "user-input-required",
        }
    }

    /// Two-digit file prefix for generated artifacts.
    ///
    /// `Setup` and `Planning` share prefix 0 (both are pre-work);
    /// `UserInputRequired` gets the sentinel 99 so escalation artifacts sort
    /// last.
    pub fn file_number(&self) -> u8 {
        match self {
            Phase::Setup | Phase::Planning => 0,
            Phase::AuditInventory => 1,
            Phase::CompareAnalyze => 2,
            Phase::QuestionDetermine => 3,
            Phase::WriteOrRefactor => 4,
            Phase::Test => 5,
            Phase::Lint => 6,
            Phase::Iterate => 7,
            Phase::Present => 8,
            Phase::UserInputRequired => 99,
        }
    }

    /// Name of the guidance tool an agent calls to get instructions for this
    /// phase.
    pub fn guidance_tool(&self) -> &'static str {
        match self {
            Phase::Setup => "setup_guide",
            Phase::Planning => "planning_guide",
            Phase::AuditInventory => "audit_inventory_guide",
            Phase::CompareAnalyze => "compare_analyze_guide",
            Phase::QuestionDetermine => "question_determine_guide",
            Phase::WriteOrRefactor => "write_or_refactor_guide",
            Phase::Test => "test_guide",
            Phase::Lint => "lint_guide",
            Phase::Iterate => "iterate_guide",
            Phase::Present => "present_guide",
            Phase::UserInputRequired => "user_input_guide",
        }
    }

    /// Whether attempts in this phase count against a configured iteration
    /// limit. Only the correction loops (test, lint, iterate) are capped.
    pub fn has_iteration_limit(&self) -> bool {
        matches!(self, Phase::Test | Phase::Lint | Phase::Iterate)
    }

    /// Whether this phase ends automatic progression.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::UserInputRequired)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.wire_name())
    }
}

impl std::str::FromStr for Phase {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace('-', "_");
        for phase in Phase::ALL {
            if phase.wire_name() == normalized {
                return Ok(phase);
            }
        }
        anyhow::bail!(
            "Unknown phase '{}'. Valid phases: {}",
            s,
            Phase::ALL
                .iter()
                .map(|p| p.wire_name())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

/// A named workflow preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkflowKind {
    /// Full analysis loop for reworking existing code (the default)
    Refactor,
    /// Plan-first loop for net-new functionality
    Feature,
    /// Minimal loop for small, low-risk corrections
    QuickFix,
    /// Everything, including environment setup
    Full,
}

impl WorkflowKind {
    /// Every preset, in catalog order.
    pub const ALL: [WorkflowKind; 4] = [
        WorkflowKind::Refactor,
        WorkflowKind::Feature,
        WorkflowKind::QuickFix,
        WorkflowKind::Full,
    ];

    /// Ordered phase sequence for this preset.
    pub fn phases(&self) -> Vec<Phase> {
        match self {
            WorkflowKind::Refactor => vec![
                Phase::AuditInventory,
                Phase::CompareAnalyze,
                Phase::QuestionDetermine,
                Phase::WriteOrRefactor,
                Phase::Test,
                Phase::Lint,
                Phase::Iterate,
                Phase::Present,
            ],
            WorkflowKind::Feature => vec![
                Phase::Planning,
                Phase::WriteOrRefactor,
                Phase::Test,
                Phase::Lint,
                Phase::Iterate,
                Phase::Present,
            ],
            WorkflowKind::QuickFix => vec![Phase::WriteOrRefactor, Phase::Test, Phase::Present],
            WorkflowKind::Full => vec![
                Phase::Setup,
                Phase::Planning,
                Phase::AuditInventory,
                Phase::CompareAnalyze,
                Phase::QuestionDetermine,
                Phase::WriteOrRefactor,
                Phase::Test,
                Phase::Lint,
                Phase::Iterate,
                Phase::Present,
            ],
        }
    }

    /// One-line description for catalog listings.
    pub fn description(&self) -> &'static str {
        match self {
            WorkflowKind::Refactor => "Analyze existing code before changing it",
            WorkflowKind::Feature => "Plan and build net-new functionality",
            WorkflowKind::QuickFix => "Small correction with a test pass",
            WorkflowKind::Full => "Complete workflow including environment setup",
        }
    }
}

impl Default for WorkflowKind {
    fn default() -> Self {
        WorkflowKind::Refactor
    }
}

impl std::fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkflowKind::Refactor => write!(f, "refactor"),
            WorkflowKind::Feature => write!(f, "feature"),
            WorkflowKind::QuickFix => write!(f, "quick-fix"),
            WorkflowKind::Full => write!(f, "full"),
        }
    }
}

impl std::str::FromStr for WorkflowKind {
    type Err = crate::errors::WaymarkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "refactor" => Ok(WorkflowKind::Refactor),
            "feature" => Ok(WorkflowKind::Feature),
            "quick-fix" | "quickfix" => Ok(WorkflowKind::QuickFix),
            "full" => Ok(WorkflowKind::Full),
            _ => Err(crate::errors::WaymarkError::UnknownWorkflow(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn wire_names_round_trip_through_from_str() {
        for phase in Phase::ALL {
            let parsed = Phase::from_str(phase.wire_name()).unwrap();
            assert_eq!(parsed, phase);
        }
    }

    #[test]
    fn slugs_parse_back_to_the_same_phase() {
        for phase in Phase::ALL {
            let parsed = Phase::from_str(phase.slug()).unwrap();
            assert_eq!(parsed, phase, "slug {} did not round trip", phase.slug());
        }
    }

    #[test]
    fn from_str_rejects_unknown_phase() {
        let err = Phase::from_str("DEPLOY").unwrap_err();
        assert!(err.to_string().contains("DEPLOY"));
    }

    #[test]
    fn file_numbers_match_catalog() {
        assert_eq!(Phase::Setup.file_number(), 0);
        assert_eq!(Phase::Planning.file_number(), 0);
        assert_eq!(Phase::AuditInventory.file_number(), 1);
        assert_eq!(Phase::CompareAnalyze.file_number(), 2);
        assert_eq!(Phase::QuestionDetermine.file_number(), 3);
        assert_eq!(Phase::WriteOrRefactor.file_number(), 4);
        assert_eq!(Phase::Test.file_number(), 5);
        assert_eq!(Phase::Lint.file_number(), 6);
        assert_eq!(Phase::Iterate.file_number(), 7);
        assert_eq!(Phase::Present.file_number(), 8);
        assert_eq!(Phase::UserInputRequired.file_number(), 99);
    }

    #[test]
    fn only_correction_loops_have_iteration_limits() {
        let capped: Vec<Phase> = Phase::ALL
            .into_iter()
            .filter(|p| p.has_iteration_limit())
            .collect();
        assert_eq!(capped, vec![Phase::Test, Phase::Lint, Phase::Iterate]);
    }

    #[test]
    fn user_input_required_is_the_only_terminal_phase() {
        for phase in Phase::ALL {
            assert_eq!(phase.is_terminal(), phase == Phase::UserInputRequired);
        }
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&Phase::AuditInventory).unwrap();
        assert_eq!(json, "\"AUDIT_INVENTORY\"");
        let back: Phase = serde_json::from_str("\"WRITE_OR_REFACTOR\"").unwrap();
        assert_eq!(back, Phase::WriteOrRefactor);
    }

    #[test]
    fn refactor_preset_starts_with_audit_and_ends_with_present() {
        let phases = WorkflowKind::Refactor.phases();
        assert_eq!(phases.first(), Some(&Phase::AuditInventory));
        assert_eq!(phases.last(), Some(&Phase::Present));
        assert_eq!(phases.len(), 8);
    }

    #[test]
    fn no_preset_includes_user_input_required() {
        for kind in WorkflowKind::ALL {
            assert!(
                !kind.phases().contains(&Phase::UserInputRequired),
                "{kind} preset must not include the escalation phase"
            );
        }
    }

    #[test]
    fn full_preset_is_refactor_with_pre_work() {
        let full = WorkflowKind::Full.phases();
        let refactor = WorkflowKind::Refactor.phases();
        assert_eq!(full[0], Phase::Setup);
        assert_eq!(full[1], Phase::Planning);
        assert_eq!(&full[2..], refactor.as_slice());
    }

    #[test]
    fn workflow_kind_parses_aliases() {
        assert_eq!(
            WorkflowKind::from_str("quick-fix").unwrap(),
            WorkflowKind::QuickFix
        );
        assert_eq!(
            WorkflowKind::from_str("QUICK_FIX").unwrap(),
            WorkflowKind::QuickFix
        );
        assert!(WorkflowKind::from_str("sprint").is_err());
    }

    #[test]
    fn workflow_kind_serde_is_kebab_case() {
        let json = serde_json::to_string(&WorkflowKind::QuickFix).unwrap();
        assert_eq!(json, "\"quick-fix\"");
    }
}
