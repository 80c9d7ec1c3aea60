//! Artifact sanity checks.
//!
//! Before a phase output is recorded, the artifacts the agent claims to have
//! produced get a cheap plausibility pass: non-empty, long enough to mean
//! something, parseable when declared as JSON, and on-topic for the phase.
//! Every problem is collected and returned together.

use serde::{Deserialize, Serialize};

use crate::naming::OutputFormat;
use crate::phase::Phase;

/// Minimum content length after trimming.
pub const MIN_CONTENT_LEN: usize = 10;

/// One artifact submitted with a phase output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub path: String,
    pub format: OutputFormat,
    #[serde(default)]
    pub description: String,
    pub content: String,
}

impl Artifact {
    pub fn new(path: impl Into<String>, format: OutputFormat, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            format,
            description: String::new(),
            content: content.into(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// What exactly is wrong with a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactErrorCode {
    EmptyArtifactList,
    ContentTooShort,
    MalformedJson,
    ContentPhaseMismatch,
}

/// A single artifact problem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactError {
    pub code: ArtifactErrorCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub message: String,
}

impl ArtifactError {
    fn for_artifact(code: ArtifactErrorCode, path: &str, message: String) -> Self {
        Self {
            code,
            path: Some(path.to_string()),
            message,
        }
    }
}

/// Validates artifact submissions for a phase.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArtifactValidator;

impl ArtifactValidator {
    pub fn new() -> Self {
        Self
    }

    /// Check a phase's artifacts, collecting every problem.
    ///
    /// An empty result means the submission is acceptable. An empty artifact
    /// list is itself a problem: each working phase must leave a record.
    pub fn validate(&self, phase: Phase, artifacts: &[Artifact]) -> Vec<ArtifactError> {
        if artifacts.is_empty() {
            return vec![ArtifactError {
                code: ArtifactErrorCode::EmptyArtifactList,
                path: None,
                message: format!("No artifacts submitted for {phase}; every phase must produce at least one"),
            }];
        }

        let mut errors = Vec::new();
        for artifact in artifacts {
            self.check_artifact(phase, artifact, &mut errors);
        }
        errors
    }

    fn check_artifact(&self, phase: Phase, artifact: &Artifact, errors: &mut Vec<ArtifactError>) {
        let trimmed = artifact.content.trim();
        if trimmed.len() < MIN_CONTENT_LEN {
            errors.push(ArtifactError::for_artifact(
                ArtifactErrorCode::ContentTooShort,
                &artifact.path,
                format!(
                    "Content is {} characters after trimming; at least {MIN_CONTENT_LEN} required",
                    trimmed.len()
                ),
            ));
            // too short to say anything about format or topic
            return;
        }

        if artifact.format == OutputFormat::Json {
            if let Err(parse_err) = serde_json::from_str::<serde_json::Value>(trimmed) {
                errors.push(ArtifactError::for_artifact(
                    ArtifactErrorCode::MalformedJson,
                    &artifact.path,
                    format!("Declared as JSON but does not parse: {parse_err}"),
                ));
            }
        }

        let keywords = expected_keywords(phase);
        if !keywords.is_empty() {
            let lowered = artifact.content.to_lowercase();
            if !keywords.iter().any(|k| lowered.contains(k)) {
                errors.push(ArtifactError::for_artifact(
                    ArtifactErrorCode::ContentPhaseMismatch,
                    &artifact.path,
                    format!(
                        "Content does not look like {phase} output; expected it to mention one of: {}",
                        keywords.join(", ")
                    ),
                ));
            }
        }
    }
}

/// Keywords an on-topic artifact for a phase is expected to mention.
///
/// Empty for phases without a recognizable vocabulary.
fn expected_keywords(phase: Phase) -> &'static [&'static str] {
    match phase {
        Phase::AuditInventory => &[
            "audit",
            "analysis",
            "dependencies",
            "inventory",
            "changes",
            "modifications",
        ],
        Phase::CompareAnalyze => &["compare", "comparison", "analysis", "option", "trade-off", "tradeoff"],
        Phase::QuestionDetermine => &["question", "decision", "determine", "chosen", "rationale"],
        Phase::WriteOrRefactor => &["refactor", "implement", "change", "modified", "wrote", "code"],
        Phase::Test => &["test", "passing", "failed", "coverage", "assert"],
        Phase::Lint => &["lint", "warning", "style", "issue", "clean"],
        Phase::Iterate => &["iterate", "iteration", "feedback", "fix", "improve"],
        Phase::Present => &["summary", "present", "overview", "complete", "result"],
        Phase::Setup | Phase::Planning | Phase::UserInputRequired => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markdown(path: &str, content: &str) -> Artifact {
        Artifact::new(path, OutputFormat::Markdown, content)
    }

    #[test]
    fn empty_list_is_rejected_outright() {
        let validator = ArtifactValidator::new();
        let errors = validator.validate(Phase::Test, &[]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, ArtifactErrorCode::EmptyArtifactList);
        assert!(errors[0].path.is_none());
    }

    #[test]
    fn short_content_is_rejected() {
        let validator = ArtifactValidator::new();
        let errors = validator.validate(Phase::Test, &[markdown("05-test.md", "   ok   ")]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, ArtifactErrorCode::ContentTooShort);
        assert_eq!(errors[0].path.as_deref(), Some("05-test.md"));
    }

    #[test]
    fn malformed_json_is_rejected() {
        let validator = ArtifactValidator::new();
        let artifact = Artifact::new(
            "05-test.json",
            OutputFormat::Json,
            "{\"tests\": passing}",
        );
        let errors = validator.validate(Phase::Test, &[artifact]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, ArtifactErrorCode::MalformedJson);
    }

    #[test]
    fn well_formed_json_on_topic_passes() {
        let validator = ArtifactValidator::new();
        let artifact = Artifact::new(
            "05-test.json",
            OutputFormat::Json,
            "{\"tests\": \"all passing\", \"count\": 42}",
        );
        assert!(validator.validate(Phase::Test, &[artifact]).is_empty());
    }

    #[test]
    fn off_topic_content_is_flagged() {
        let validator = ArtifactValidator::new();
        let artifact = markdown("01-audit-inventory.md", "Lorem ipsum dolor sit amet, consectetur.");
        let errors = validator.validate(Phase::AuditInventory, &[artifact]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, ArtifactErrorCode::ContentPhaseMismatch);
        assert!(errors[0].message.contains("audit"));
    }

    #[test]
    fn keyword_match_is_case_insensitive() {
        let validator = ArtifactValidator::new();
        let artifact = markdown("01-audit-inventory.md", "# AUDIT\n\nDependency INVENTORY follows.");
        assert!(validator.validate(Phase::AuditInventory, &[artifact]).is_empty());
    }

    #[test]
    fn setup_and_planning_have_no_vocabulary_check() {
        let validator = ArtifactValidator::new();
        let artifact = markdown("00-planning.md", "whatever text of sufficient length");
        assert!(validator.validate(Phase::Planning, &[artifact.clone()]).is_empty());
        assert!(validator.validate(Phase::Setup, &[artifact]).is_empty());
    }

    #[test]
    fn problems_across_artifacts_are_all_reported() {
        let validator = ArtifactValidator::new();
        let artifacts = vec![
            markdown("a.md", "tiny"),
            Artifact::new("b.json", OutputFormat::Json, "not json at all here"),
            markdown("c.md", "completely unrelated prose with enough length"),
        ];
        let errors = validator.validate(Phase::Lint, &artifacts);
        let codes: Vec<_> = errors.iter().map(|e| e.code).collect();
        assert!(codes.contains(&ArtifactErrorCode::ContentTooShort));
        assert!(codes.contains(&ArtifactErrorCode::MalformedJson));
        assert!(codes.contains(&ArtifactErrorCode::ContentPhaseMismatch));
    }
}
