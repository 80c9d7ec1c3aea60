//! File-name conventions for phase artifacts.
//!
//! Generated names follow `{NN}-{phase-slug}[-{YYYY-MM-DD}].{ext}` where `NN`
//! is the phase's two-digit prefix. Task names are sanitized into safe path
//! segments before they appear anywhere in a suggested path.

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::phase::Phase;

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

static DISALLOWED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9\-_]").unwrap());

static HYPHEN_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-{2,}").unwrap());

/// Output format of a generated artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Markdown,
    Json,
    Text,
}

impl OutputFormat {
    /// File extension without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Json => "json",
            OutputFormat::Text => "txt",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Markdown => write!(f, "markdown"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Text => write!(f, "text"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "json" => Ok(OutputFormat::Json),
            "text" | "txt" => Ok(OutputFormat::Text),
            _ => anyhow::bail!(
                "Invalid output format '{}'. Valid values: markdown, json, text",
                s
            ),
        }
    }
}

/// Reduce an arbitrary task name to a safe path segment.
///
/// Lowercases, turns whitespace runs into single hyphens, drops everything
/// outside `[a-z0-9-_]`, collapses hyphen runs, and trims hyphens from both
/// ends. The result may be empty if nothing survives. Applying the function
/// to its own output returns it unchanged.
pub fn sanitize_task_name(task: &str) -> String {
    let lowered = task.to_lowercase();
    let hyphenated = WHITESPACE_RUN.replace_all(&lowered, "-");
    let stripped = DISALLOWED.replace_all(&hyphenated, "");
    let collapsed = HYPHEN_RUN.replace_all(&stripped, "-");
    collapsed.trim_matches('-').to_string()
}

/// Build the numbered file name for an artifact of `phase` in `format`.
///
/// Passing a date appends it between the slug and the extension, e.g.
/// `05-test-2026-08-25.md`.
pub fn numbered_file_name(phase: Phase, format: OutputFormat, date: Option<NaiveDate>) -> String {
    match date {
        Some(d) => format!(
            "{:02}-{}-{}.{}",
            phase.file_number(),
            phase.slug(),
            d.format("%Y-%m-%d"),
            format.extension()
        ),
        None => format!(
            "{:02}-{}.{}",
            phase.file_number(),
            phase.slug(),
            format.extension()
        ),
    }
}

/// Join an output directory, optional task segment, and file name into a
/// suggested path. Paths are advisory strings; nothing is created on disk.
pub fn artifact_path(directory: &str, task_segment: Option<&str>, file_name: &str) -> String {
    let dir = directory.trim_end_matches('/');
    match task_segment.filter(|s| !s.is_empty()) {
        Some(segment) => format!("{dir}/{segment}/{file_name}"),
        None => format!("{dir}/{file_name}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_spaces_with_hyphens() {
        assert_eq!(sanitize_task_name("Refactor Auth Module"), "refactor-auth-module");
    }

    #[test]
    fn sanitize_strips_special_characters() {
        assert_eq!(sanitize_task_name("Task@#$%^&*"), "task");
    }

    #[test]
    fn sanitize_collapses_hyphen_runs() {
        assert_eq!(sanitize_task_name("fix -- the   bug"), "fix-the-bug");
    }

    #[test]
    fn sanitize_trims_leading_and_trailing_hyphens() {
        assert_eq!(sanitize_task_name("  --wrap up--  "), "wrap-up");
    }

    #[test]
    fn sanitize_keeps_underscores_and_digits() {
        assert_eq!(sanitize_task_name("port_v2 to 2024"), "port_v2-to-2024");
    }

    #[test]
    fn sanitize_can_produce_empty_string() {
        assert_eq!(sanitize_task_name("@#$%"), "");
    }

    #[test]
    fn sanitize_is_idempotent() {
        let inputs = [
            "Refactor Auth Module",
            "Task@#$%^&*",
            "  weird -- Input_42  ",
            "ünïcode näme",
        ];
        for input in inputs {
            let once = sanitize_task_name(input);
            let twice = sanitize_task_name(&once);
            assert_eq!(once, twice, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn numbered_name_for_test_phase() {
        let name = numbered_file_name(Phase::Test, OutputFormat::Markdown, None);
        assert_eq!(name, "05-test.md");
    }

    #[test]
    fn numbered_name_includes_date_before_extension() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 25).unwrap();
        let name = numbered_file_name(Phase::Test, OutputFormat::Markdown, Some(date));
        assert_eq!(name, "05-test-2026-08-25.md");
    }

    #[test]
    fn numbered_name_uses_sentinel_prefix_for_escalation() {
        let name = numbered_file_name(Phase::UserInputRequired, OutputFormat::Json, None);
        assert_eq!(name, "99-user-input-required.json");
    }

    #[test]
    fn numbered_names_match_convention_for_every_phase_and_format() {
        let pattern = Regex::new(r"^\d{2}-[a-z-]+(-\d{4}-\d{2}-\d{2})?\.\w+$").unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        for phase in Phase::ALL {
            for format in [OutputFormat::Markdown, OutputFormat::Json, OutputFormat::Text] {
                for date in [None, Some(date)] {
                    let name = numbered_file_name(phase, format, date);
                    assert!(pattern.is_match(&name), "{name} breaks the convention");
                }
            }
        }
    }

    #[test]
    fn artifact_path_joins_segments() {
        assert_eq!(
            artifact_path("workflow-output", None, "01-audit-inventory.md"),
            "workflow-output/01-audit-inventory.md"
        );
        assert_eq!(
            artifact_path("workflow-output/", Some("refactor-auth-module"), "05-test.md"),
            "workflow-output/refactor-auth-module/05-test.md"
        );
    }

    #[test]
    fn output_format_parses_aliases() {
        use std::str::FromStr;
        assert_eq!(OutputFormat::from_str("md").unwrap(), OutputFormat::Markdown);
        assert_eq!(OutputFormat::from_str("TXT").unwrap(), OutputFormat::Text);
        assert!(OutputFormat::from_str("pdf").is_err());
    }
}
