//! Phase completion validation.
//!
//! Each phase has a static criteria table: minimum requirements the agent
//! must report in its completed-work payload, artifacts it must have
//! created, and the messages that block premature progression. The engine
//! evaluates a payload against the table and reports every miss at once so
//! the agent can fix them in one pass.

pub mod artifact;

pub use artifact::{Artifact, ArtifactError, ArtifactErrorCode, ArtifactValidator};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::phase::Phase;

/// A single completion requirement looked up in the completed-work payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Payload value must be a boolean equal to this.
    Flag(bool),
    /// Payload value must be a number at or above this.
    AtLeast(u64),
}

/// Static completion criteria for one phase.
#[derive(Debug, Clone)]
pub struct PhaseCriteria {
    /// Requirement name to expected value, checked against completed work
    pub minimum_requirements: Vec<(&'static str, Requirement)>,
    /// File-name stems that must appear among the created files
    pub expected_files: Vec<&'static str>,
    /// Messages surfaced while the phase is incomplete
    pub blocking_messages: Vec<&'static str>,
    /// Questions the agent should answer before claiming completion
    pub self_check_questions: Vec<&'static str>,
}

/// The criteria table for a phase.
///
/// `USER_INPUT_REQUIRED` has none: a human decides when it ends.
pub fn criteria_for(phase: Phase) -> Option<PhaseCriteria> {
    let criteria = match phase {
        Phase::Setup => PhaseCriteria {
            minimum_requirements: vec![
                ("environment_verified", Requirement::Flag(true)),
                ("dependencies_installed", Requirement::Flag(true)),
            ],
            expected_files: vec![],
            blocking_messages: vec!["Do not start planning until the project builds cleanly"],
            self_check_questions: vec![
                "Does the project build from a clean checkout?",
                "Are all required tools available?",
            ],
        },
        Phase::Planning => PhaseCriteria {
            minimum_requirements: vec![
                ("plan_documented", Requirement::Flag(true)),
                ("steps_planned", Requirement::AtLeast(2)),
            ],
            expected_files: vec!["00-planning"],
            blocking_messages: vec!["Do not write code before the plan is documented"],
            self_check_questions: vec![
                "Does every planned step have a clear outcome?",
                "Is the scope small enough to finish?",
            ],
        },
        Phase::AuditInventory => PhaseCriteria {
            minimum_requirements: vec![
                ("files_analyzed", Requirement::AtLeast(3)),
                ("inventory_documented", Requirement::Flag(true)),
            ],
            expected_files: vec!["01-audit-inventory"],
            blocking_messages: vec!["Do not modify any files during the audit"],
            self_check_questions: vec![
                "Have all modules in scope been inventoried?",
                "Are current behaviors documented before changing them?",
            ],
        },
        Phase::CompareAnalyze => PhaseCriteria {
            minimum_requirements: vec![
                ("comparison_documented", Requirement::Flag(true)),
                ("options_considered", Requirement::AtLeast(2)),
            ],
            expected_files: vec!["02-compare-analyze"],
            blocking_messages: vec!["Do not decide on an approach with only one option on the table"],
            self_check_questions: vec![
                "Were at least two approaches compared?",
                "Are the trade-offs written down?",
            ],
        },
        Phase::QuestionDetermine => PhaseCriteria {
            minimum_requirements: vec![
                ("decisions_documented", Requirement::Flag(true)),
                ("open_questions_resolved", Requirement::Flag(true)),
            ],
            expected_files: vec!["03-question-determine"],
            blocking_messages: vec!["Do not start changes while questions remain open"],
            self_check_questions: vec![
                "Is every open question answered or explicitly deferred?",
                "Is the chosen approach recorded with its rationale?",
            ],
        },
        Phase::WriteOrRefactor => PhaseCriteria {
            minimum_requirements: vec![
                ("files_modified", Requirement::AtLeast(1)),
                ("changes_documented", Requirement::Flag(true)),
            ],
            expected_files: vec!["04-write-or-refactor"],
            blocking_messages: vec!["Read every file before modifying it"],
            self_check_questions: vec![
                "Does each change trace back to the plan?",
                "Were any files modified without being read first?",
            ],
        },
        Phase::Test => PhaseCriteria {
            minimum_requirements: vec![
                ("tests_run", Requirement::Flag(true)),
                ("tests_passing", Requirement::Flag(true)),
            ],
            expected_files: vec!["05-test"],
            blocking_messages: vec!["Do not proceed to LINT with failing tests"],
            self_check_questions: vec![
                "Do all tests pass, including pre-existing ones?",
                "Were new behaviors covered by new tests?",
            ],
        },
        Phase::Lint => PhaseCriteria {
            minimum_requirements: vec![
                ("lint_run", Requirement::Flag(true)),
                ("critical_issues_fixed", Requirement::Flag(true)),
            ],
            expected_files: vec!["06-lint"],
            blocking_messages: vec!["Do not present work with unresolved critical lint issues"],
            self_check_questions: vec![
                "Is the linter output clean or explained?",
                "Were fixes verified by rerunning the linter?",
            ],
        },
        Phase::Iterate => PhaseCriteria {
            minimum_requirements: vec![("feedback_addressed", Requirement::Flag(true))],
            expected_files: vec!["07-iterate"],
            blocking_messages: vec!["Address every piece of feedback before presenting"],
            self_check_questions: vec!["Is each round of feedback resolved or answered?"],
        },
        Phase::Present => PhaseCriteria {
            minimum_requirements: vec![("summary_prepared", Requirement::Flag(true))],
            expected_files: vec!["08-present"],
            blocking_messages: vec!["Present only work that passed TEST and LINT"],
            self_check_questions: vec![
                "Does the summary cover what changed and why?",
                "Would a reviewer find anything surprising?",
            ],
        },
        Phase::UserInputRequired => return None,
    };
    Some(criteria)
}

/// Result of a completion check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub phase: Phase,
    pub is_complete: bool,
    pub passed: Vec<String>,
    pub failed: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocking_messages: Vec<String>,
    pub next_steps: Vec<String>,
}

/// Evaluates completed-work payloads against the per-phase criteria table.
///
/// Pure: attempt counting lives in the session, not here.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationEngine;

impl ValidationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Check a phase's completion claim.
    ///
    /// Boolean requirements pass only on an exact match, numeric ones at or
    /// above the threshold. A missing or wrong-typed value fails. Expected
    /// file stems must appear as a substring of some created file path. All
    /// misses are collected, never fail-fast.
    pub fn validate_phase_completion(
        &self,
        phase: Phase,
        completed_work: &Map<String, Value>,
        created_files: &[String],
    ) -> ValidationOutcome {
        let Some(criteria) = criteria_for(phase) else {
            return ValidationOutcome {
                phase,
                is_complete: true,
                passed: Vec::new(),
                failed: Vec::new(),
                blocking_messages: Vec::new(),
                next_steps: vec!["Wait for user input".to_string()],
            };
        };

        let mut passed = Vec::new();
        let mut failed = Vec::new();
        let mut next_steps = Vec::new();

        for (name, requirement) in &criteria.minimum_requirements {
            if requirement_met(completed_work.get(*name), *requirement) {
                passed.push((*name).to_string());
            } else {
                failed.push((*name).to_string());
                next_steps.push(describe_miss(name, *requirement, completed_work.get(*name)));
            }
        }

        for stem in &criteria.expected_files {
            let found = created_files.iter().any(|f| f.contains(stem));
            if found {
                passed.push(format!("file:{stem}"));
            } else {
                failed.push(format!("file:{stem}"));
                next_steps.push(format!("Create the {stem} artifact"));
            }
        }

        let is_complete = failed.is_empty();
        let blocking_messages = if is_complete {
            Vec::new()
        } else {
            criteria
                .blocking_messages
                .iter()
                .map(|m| (*m).to_string())
                .collect()
        };
        if is_complete {
            next_steps.push("Record the phase output and advance".to_string());
        }

        ValidationOutcome {
            phase,
            is_complete,
            passed,
            failed,
            blocking_messages,
            next_steps,
        }
    }
}

fn requirement_met(value: Option<&Value>, requirement: Requirement) -> bool {
    match (requirement, value) {
        (Requirement::Flag(expected), Some(Value::Bool(actual))) => *actual == expected,
        (Requirement::AtLeast(min), Some(value)) => value.as_u64().is_some_and(|n| n >= min),
        _ => false,
    }
}

fn describe_miss(name: &str, requirement: Requirement, value: Option<&Value>) -> String {
    match requirement {
        Requirement::Flag(expected) => {
            format!("Report '{name}' as {expected} once it is true of the work")
        }
        Requirement::AtLeast(min) => match value.and_then(Value::as_u64) {
            Some(actual) => format!("'{name}' is {actual}, needs at least {min}"),
            None => format!("Report a count for '{name}' (at least {min})"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn work(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn every_working_phase_has_criteria() {
        for phase in Phase::ALL {
            if phase == Phase::UserInputRequired {
                assert!(criteria_for(phase).is_none());
            } else {
                let criteria = criteria_for(phase).unwrap();
                assert!(!criteria.minimum_requirements.is_empty(), "{phase}");
            }
        }
    }

    #[test]
    fn complete_audit_passes() {
        let engine = ValidationEngine::new();
        let outcome = engine.validate_phase_completion(
            Phase::AuditInventory,
            &work(&[
                ("files_analyzed", json!(5)),
                ("inventory_documented", json!(true)),
            ]),
            &["workflow-output/01-audit-inventory.md".to_string()],
        );
        assert!(outcome.is_complete);
        assert!(outcome.failed.is_empty());
        assert_eq!(outcome.passed.len(), 3);
        assert!(outcome.blocking_messages.is_empty());
    }

    #[test]
    fn numeric_requirement_below_threshold_fails() {
        let engine = ValidationEngine::new();
        let outcome = engine.validate_phase_completion(
            Phase::AuditInventory,
            &work(&[
                ("files_analyzed", json!(2)),
                ("inventory_documented", json!(true)),
            ]),
            &["01-audit-inventory.md".to_string()],
        );
        assert!(!outcome.is_complete);
        assert_eq!(outcome.failed, ["files_analyzed"]);
        assert!(outcome.next_steps[0].contains("at least 3"));
        assert!(!outcome.blocking_messages.is_empty());
    }

    #[test]
    fn missing_and_wrong_typed_values_fail() {
        let engine = ValidationEngine::new();
        let outcome = engine.validate_phase_completion(
            Phase::Test,
            &work(&[("tests_run", json!("yes"))]),
            &["05-test.md".to_string()],
        );
        assert!(outcome.failed.contains(&"tests_run".to_string()));
        assert!(outcome.failed.contains(&"tests_passing".to_string()));
    }

    #[test]
    fn boolean_false_does_not_satisfy_a_true_flag() {
        let engine = ValidationEngine::new();
        let outcome = engine.validate_phase_completion(
            Phase::Test,
            &work(&[("tests_run", json!(true)), ("tests_passing", json!(false))]),
            &["05-test.md".to_string()],
        );
        assert_eq!(outcome.failed, ["tests_passing"]);
    }

    #[test]
    fn expected_file_matches_dated_and_nested_paths() {
        let engine = ValidationEngine::new();
        let outcome = engine.validate_phase_completion(
            Phase::Test,
            &work(&[("tests_run", json!(true)), ("tests_passing", json!(true))]),
            &["out/my-task/05-test-2026-08-25.md".to_string()],
        );
        assert!(outcome.is_complete);
    }

    #[test]
    fn missing_artifact_is_reported_with_its_stem() {
        let engine = ValidationEngine::new();
        let outcome = engine.validate_phase_completion(
            Phase::Present,
            &work(&[("summary_prepared", json!(true))]),
            &[],
        );
        assert_eq!(outcome.failed, ["file:08-present"]);
        assert!(outcome.next_steps[0].contains("08-present"));
    }

    #[test]
    fn all_misses_are_collected_in_one_pass() {
        let engine = ValidationEngine::new();
        let outcome = engine.validate_phase_completion(Phase::AuditInventory, &Map::new(), &[]);
        assert_eq!(outcome.failed.len(), 3);
    }

    #[test]
    fn user_input_phase_is_always_complete() {
        let engine = ValidationEngine::new();
        let outcome =
            engine.validate_phase_completion(Phase::UserInputRequired, &Map::new(), &[]);
        assert!(outcome.is_complete);
        assert!(outcome.passed.is_empty());
    }
}
