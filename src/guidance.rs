//! Per-phase guidance for the agent.
//!
//! Guidance comes in two shapes. Suggestive guidance describes the phase and
//! a sensible way to work it. Directive guidance, produced once a workflow
//! configuration exists, adds the enforcement surface: required output
//! files, the validation criteria the completion check will apply, and the
//! messages that block premature progression.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::WorkflowConfiguration;
use crate::naming::{artifact_path, numbered_file_name};
use crate::phase::{Phase, WorkflowKind};
use crate::validation::{Requirement, criteria_for};

/// How strongly the guidance binds the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuidanceMode {
    /// Enforced: required files and validation criteria included.
    Directive,
    /// Advisory: the shape of the work without enforcement details.
    Suggestive,
}

impl std::fmt::Display for GuidanceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Directive => "directive",
            Self::Suggestive => "suggestive",
        };
        write!(f, "{}", s)
    }
}

/// Guidance payload for one phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseGuidance {
    pub phase: Phase,
    pub objective: String,
    pub instructions: Vec<String>,
    pub expected_output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_output_files: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_criteria: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocking_messages: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_phase: Option<Phase>,
    pub mode: GuidanceMode,
}

/// Build guidance for a phase.
///
/// With a configuration the guidance is directive and reflects its phase
/// order and output preferences; without one it is suggestive and the next
/// phase follows the default preset.
pub fn guidance_for(phase: Phase, config: Option<&WorkflowConfiguration>) -> PhaseGuidance {
    let (objective, instructions, expected_output) = catalog_entry(phase);
    let next_phase = match config {
        Some(config) => config.next_phase_after(phase),
        None => default_next_phase(phase),
    };

    let mut guidance = PhaseGuidance {
        phase,
        objective: objective.to_string(),
        instructions: instructions.iter().map(|i| (*i).to_string()).collect(),
        expected_output: expected_output.to_string(),
        required_output_files: None,
        validation_criteria: None,
        blocking_messages: Vec::new(),
        next_phase,
        mode: GuidanceMode::Suggestive,
    };

    let Some(config) = config else {
        return guidance;
    };
    guidance.mode = GuidanceMode::Directive;

    if let Some(criteria) = criteria_for(phase) {
        guidance.blocking_messages = criteria
            .blocking_messages
            .iter()
            .map(|m| (*m).to_string())
            .collect();
        let mut lines: Vec<String> = criteria
            .minimum_requirements
            .iter()
            .map(|(name, requirement)| describe_requirement(name, *requirement))
            .collect();
        lines.extend(
            criteria
                .self_check_questions
                .iter()
                .map(|q| format!("Self-check: {q}")),
        );
        guidance.validation_criteria = Some(lines);
    }

    let prefs = &config.output_preferences;
    let date = prefs
        .include_date_in_filenames
        .then(|| Utc::now().date_naive());
    let files: Vec<String> = prefs
        .formats
        .iter()
        .map(|format| {
            artifact_path(
                &prefs.directory,
                None,
                &numbered_file_name(phase, *format, date),
            )
        })
        .collect();
    if !files.is_empty() {
        guidance.required_output_files = Some(files);
    }

    guidance
}

fn describe_requirement(name: &str, requirement: Requirement) -> String {
    match requirement {
        Requirement::Flag(expected) => format!("'{name}' must be {expected}"),
        Requirement::AtLeast(min) => format!("'{name}' must be at least {min}"),
    }
}

/// Successor in the default preset, used when no configuration exists.
fn default_next_phase(phase: Phase) -> Option<Phase> {
    let sequence = WorkflowKind::default().phases();
    let index = sequence.iter().position(|p| *p == phase)?;
    sequence.get(index + 1).copied()
}

fn catalog_entry(phase: Phase) -> (&'static str, &'static [&'static str], &'static str) {
    match phase {
        Phase::Setup => (
            "Verify the environment builds and every required tool is available",
            &[
                "Check out the project and run its build",
                "Install missing dependencies and note their versions",
                "Record anything surprising about the environment",
            ],
            "A working environment and a note on how it was verified",
        ),
        Phase::Planning => (
            "Break the task into ordered steps with clear outcomes",
            &[
                "Restate the task in your own words",
                "List the steps in the order you will take them",
                "Mark the steps that carry risk or need user input",
            ],
            "A written plan covering every step to completion",
        ),
        Phase::AuditInventory => (
            "Understand the current state before changing anything",
            &[
                "Read every file in scope; modify nothing yet",
                "Inventory the modules, their dependencies, and their roles",
                "Document current behavior you must preserve",
            ],
            "An inventory document listing files, dependencies, and behaviors",
        ),
        Phase::CompareAnalyze => (
            "Compare candidate approaches and their trade-offs",
            &[
                "Write down at least two viable approaches",
                "Compare them on effort, risk, and fit with the existing code",
                "Note which existing code each approach would touch",
            ],
            "A comparison document with trade-offs for each option",
        ),
        Phase::QuestionDetermine => (
            "Resolve open questions and commit to an approach",
            &[
                "List every question the comparison left open",
                "Answer each one or mark it as needing user input",
                "Record the chosen approach and why",
            ],
            "A decision document: questions, answers, chosen approach",
        ),
        Phase::WriteOrRefactor => (
            "Make the planned changes, reading before writing",
            &[
                "Read each file before modifying it",
                "Keep changes traceable to the plan and decisions",
                "Note every modified file and what changed",
            ],
            "Modified code plus a change log of touched files",
        ),
        Phase::Test => (
            "Prove the changes work and nothing else broke",
            &[
                "Run the full test suite, not only new tests",
                "Add tests for behavior the changes introduced",
                "Record failures verbatim before fixing them",
            ],
            "A test report: what ran, what passed, what was fixed",
        ),
        Phase::Lint => (
            "Bring the code to the project's style and quality bar",
            &[
                "Run the project's linter and formatter",
                "Fix critical issues; record the ones deliberately left",
                "Rerun to confirm the fixes hold",
            ],
            "A lint report with issues found and fixed",
        ),
        Phase::Iterate => (
            "Work remaining failures and feedback to closure",
            &[
                "Take the oldest unresolved failure or feedback item first",
                "Fix it, rerun the relevant checks, record the result",
                "Stop and escalate if the same item fails repeatedly",
            ],
            "An iteration log: item, fix, verification",
        ),
        Phase::Present => (
            "Summarize the work for review",
            &[
                "Summarize what changed and why",
                "Call out anything a reviewer would find surprising",
                "Link the artifacts produced along the way",
            ],
            "A presentation document ready for a human reviewer",
        ),
        Phase::UserInputRequired => (
            "Wait for a human decision before continuing",
            &[
                "Present the situation and the available options",
                "Make no further changes until input arrives",
            ],
            "A clear question for the user with the options laid out",
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputPreferences;

    #[test]
    fn suggestive_guidance_carries_no_enforcement() {
        let guidance = guidance_for(Phase::AuditInventory, None);
        assert_eq!(guidance.mode, GuidanceMode::Suggestive);
        assert!(guidance.required_output_files.is_none());
        assert!(guidance.validation_criteria.is_none());
        assert!(guidance.blocking_messages.is_empty());
        assert!(!guidance.instructions.is_empty());
    }

    #[test]
    fn directive_guidance_adds_files_and_criteria() {
        let config = WorkflowConfiguration::for_preset(WorkflowKind::Refactor);
        let guidance = guidance_for(Phase::AuditInventory, Some(&config));
        assert_eq!(guidance.mode, GuidanceMode::Directive);
        let files = guidance.required_output_files.unwrap();
        assert!(files[0].contains("01-audit-inventory"));
        assert!(files[0].starts_with("workflow-output/"));
        let criteria = guidance.validation_criteria.unwrap();
        assert!(criteria.iter().any(|c| c.contains("files_analyzed")));
        assert!(!guidance.blocking_messages.is_empty());
    }

    #[test]
    fn next_phase_follows_the_configured_sequence() {
        let config = WorkflowConfiguration::for_preset(WorkflowKind::QuickFix);
        let guidance = guidance_for(Phase::WriteOrRefactor, Some(&config));
        assert_eq!(guidance.next_phase, Some(Phase::Test));

        let last = guidance_for(Phase::Present, Some(&config));
        assert_eq!(last.next_phase, None);
    }

    #[test]
    fn suggestive_next_phase_uses_the_default_preset() {
        let guidance = guidance_for(Phase::Test, None);
        assert_eq!(guidance.next_phase, Some(Phase::Lint));
        assert_eq!(guidance_for(Phase::UserInputRequired, None).next_phase, None);
    }

    #[test]
    fn dated_filenames_follow_the_output_preferences() {
        let mut config = WorkflowConfiguration::for_preset(WorkflowKind::Refactor);
        config.output_preferences = OutputPreferences {
            include_date_in_filenames: true,
            ..Default::default()
        };
        let guidance = guidance_for(Phase::Test, Some(&config));
        let files = guidance.required_output_files.unwrap();
        let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();
        assert!(files[0].contains(&today));
    }

    #[test]
    fn every_phase_has_catalog_content() {
        for phase in Phase::ALL {
            let guidance = guidance_for(phase, None);
            assert!(!guidance.objective.is_empty(), "{phase}");
            assert!(!guidance.expected_output.is_empty(), "{phase}");
        }
    }

    #[test]
    fn user_input_phase_has_no_criteria_even_in_directive_mode() {
        let config = WorkflowConfiguration::for_preset(WorkflowKind::Refactor);
        let guidance = guidance_for(Phase::UserInputRequired, Some(&config));
        assert_eq!(guidance.mode, GuidanceMode::Directive);
        assert!(guidance.validation_criteria.is_none());
    }
}
