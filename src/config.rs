//! Workflow configuration: selected phases, iteration limits, output
//! preferences, checkpoints, and escalation triggers.
//!
//! Configuration comes from three places: a preset (`WorkflowKind`), an
//! explicit builder, or a `waymark.toml` file. All three converge on
//! `WorkflowConfiguration`, validated at build time.
//!
//! # Configuration File Format
//!
//! ```toml
//! [workflow]
//! preset = "refactor"
//! # or an explicit list:
//! # phases = ["AUDIT_INVENTORY", "WRITE_OR_REFACTOR", "TEST", "PRESENT"]
//!
//! [limits]
//! test = 3
//! lint = 3
//! iterate = 5
//!
//! [output]
//! formats = ["markdown"]
//! directory = "workflow-output"
//! include_date_in_filenames = false
//! subdirectory_per_task = false
//!
//! [checkpoints]
//! before_major_changes = true
//! after_failed_iterations = false
//! before_final_presentation = true
//! custom = ["LINT"]
//!
//! [escalation]
//! on_iteration_limit = true
//! on_repeated_validation_failure = true
//! on_blocked_constraint = false
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::WaymarkError;
use crate::naming::OutputFormat;
use crate::phase::{Phase, WorkflowKind};

/// Per-phase iteration caps. Only the correction loops are capped; every
/// other phase may be attempted without limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationLimits {
    /// Maximum attempts in the TEST phase
    #[serde(default = "default_test_limit")]
    pub test: u32,
    /// Maximum attempts in the LINT phase
    #[serde(default = "default_lint_limit")]
    pub lint: u32,
    /// Maximum attempts in the ITERATE phase
    #[serde(default = "default_iterate_limit")]
    pub iterate: u32,
}

fn default_test_limit() -> u32 {
    3
}

fn default_lint_limit() -> u32 {
    3
}

fn default_iterate_limit() -> u32 {
    5
}

impl Default for IterationLimits {
    fn default() -> Self {
        Self {
            test: default_test_limit(),
            lint: default_lint_limit(),
            iterate: default_iterate_limit(),
        }
    }
}

impl IterationLimits {
    /// The configured cap for a phase, or `None` for uncapped phases.
    pub fn limit_for(&self, phase: Phase) -> Option<u32> {
        match phase {
            Phase::Test => Some(self.test),
            Phase::Lint => Some(self.lint),
            Phase::Iterate => Some(self.iterate),
            _ => None,
        }
    }
}

/// How generated artifacts should be named and where they should go.
/// Paths are suggestions; the core never writes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputPreferences {
    /// Accepted artifact formats, first entry is the preferred one
    #[serde(default = "default_formats")]
    pub formats: Vec<OutputFormat>,
    /// Directory prefix for suggested artifact paths
    #[serde(default = "default_output_directory")]
    pub directory: String,
    /// Append the current date to generated file names
    #[serde(default)]
    pub include_date_in_filenames: bool,
    /// Nest suggested paths under the sanitized task name
    #[serde(default)]
    pub subdirectory_per_task: bool,
}

fn default_formats() -> Vec<OutputFormat> {
    vec![OutputFormat::Markdown]
}

fn default_output_directory() -> String {
    "workflow-output".to_string()
}

impl Default for OutputPreferences {
    fn default() -> Self {
        Self {
            formats: default_formats(),
            directory: default_output_directory(),
            include_date_in_filenames: false,
            subdirectory_per_task: false,
        }
    }
}

impl OutputPreferences {
    /// The format suggested when the caller does not name one.
    pub fn preferred_format(&self) -> OutputFormat {
        self.formats.first().copied().unwrap_or(OutputFormat::Markdown)
    }
}

/// Phases where a human should confirm before the agent continues.
/// Checkpoints are advisory flags in transition results, not hard stops.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserCheckpoints {
    /// Pause before entering WRITE_OR_REFACTOR
    #[serde(default)]
    pub before_major_changes: bool,
    /// Pause before re-entering any phase with a failed validation attempt
    #[serde(default)]
    pub after_failed_iterations: bool,
    /// Pause before entering PRESENT
    #[serde(default)]
    pub before_final_presentation: bool,
    /// Additional explicit checkpoint phases
    #[serde(default)]
    pub custom: Vec<Phase>,
}

/// Which conditions route the workflow to USER_INPUT_REQUIRED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationTriggers {
    /// Escalate when a capped phase reaches its iteration limit
    #[serde(default = "default_true")]
    pub on_iteration_limit: bool,
    /// Escalate after repeated failed validation attempts in one phase
    #[serde(default = "default_true")]
    pub on_repeated_validation_failure: bool,
    /// Escalate when critical constraint violations keep blocking a phase
    #[serde(default)]
    pub on_blocked_constraint: bool,
}

fn default_true() -> bool {
    true
}

impl Default for EscalationTriggers {
    fn default() -> Self {
        Self {
            on_iteration_limit: true,
            on_repeated_validation_failure: true,
            on_blocked_constraint: false,
        }
    }
}

/// A validated workflow configuration.
///
/// `selected_phases` is ordered, deduplicated, non-empty, and never contains
/// `USER_INPUT_REQUIRED`. Build one through `for_preset`, the builder, or
/// `WaymarkToml::to_configuration`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConfiguration {
    pub selected_phases: Vec<Phase>,
    pub iteration_limits: IterationLimits,
    pub output_preferences: OutputPreferences,
    pub user_checkpoints: UserCheckpoints,
    pub escalation_triggers: EscalationTriggers,
}

impl WorkflowConfiguration {
    /// Configuration for a preset with default limits and preferences.
    pub fn for_preset(kind: WorkflowKind) -> Self {
        Self {
            selected_phases: kind.phases(),
            iteration_limits: IterationLimits::default(),
            output_preferences: OutputPreferences::default(),
            user_checkpoints: UserCheckpoints::default(),
            escalation_triggers: EscalationTriggers::default(),
        }
    }

    /// Position of a phase in the selected sequence.
    pub fn phase_index(&self, phase: Phase) -> Option<usize> {
        self.selected_phases.iter().position(|p| *p == phase)
    }

    /// Whether a phase is part of the selected sequence.
    pub fn contains(&self, phase: Phase) -> bool {
        self.selected_phases.contains(&phase)
    }

    /// First phase of the workflow.
    ///
    /// Panics on an empty selection; the builder and `start_session` both
    /// refuse to produce one.
    pub fn first_phase(&self) -> Phase {
        self.selected_phases[0]
    }

    /// The phase directly after `phase`, if any.
    pub fn next_phase_after(&self, phase: Phase) -> Option<Phase> {
        let idx = self.phase_index(phase)?;
        self.selected_phases.get(idx + 1).copied()
    }
}

/// Builder for `WorkflowConfiguration`. Collects settings, validates on
/// `build()`.
#[derive(Debug, Clone, Default)]
pub struct WorkflowConfigurationBuilder {
    selected_phases: Vec<Phase>,
    iteration_limits: IterationLimits,
    output_preferences: OutputPreferences,
    user_checkpoints: UserCheckpoints,
    escalation_triggers: EscalationTriggers,
    uncapped_limit_phases: Vec<Phase>,
}

impl WorkflowConfigurationBuilder {
    /// Start with an empty selection and default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a preset's phase sequence.
    pub fn from_preset(kind: WorkflowKind) -> Self {
        Self {
            selected_phases: kind.phases(),
            ..Self::default()
        }
    }

    /// Replace the phase selection.
    pub fn select_phases(mut self, phases: impl IntoIterator<Item = Phase>) -> Self {
        self.selected_phases = phases.into_iter().collect();
        self
    }

    /// Append one phase to the selection.
    pub fn add_phase(mut self, phase: Phase) -> Self {
        self.selected_phases.push(phase);
        self
    }

    /// Set the iteration cap for one of the correction loops. Setting a cap
    /// for any other phase makes `build()` fail.
    pub fn iteration_limit(mut self, phase: Phase, limit: u32) -> Self {
        match phase {
            Phase::Test => self.iteration_limits.test = limit,
            Phase::Lint => self.iteration_limits.lint = limit,
            Phase::Iterate => self.iteration_limits.iterate = limit,
            other => self.uncapped_limit_phases.push(other),
        }
        self
    }

    /// Replace all iteration limits.
    pub fn iteration_limits(mut self, limits: IterationLimits) -> Self {
        self.iteration_limits = limits;
        self
    }

    /// Replace all output preferences.
    pub fn output_preferences(mut self, prefs: OutputPreferences) -> Self {
        self.output_preferences = prefs;
        self
    }

    /// Set the suggested output directory.
    pub fn output_directory(mut self, dir: impl Into<String>) -> Self {
        self.output_preferences.directory = dir.into();
        self
    }

    /// Toggle date suffixes in generated file names.
    pub fn include_date_in_filenames(mut self, yes: bool) -> Self {
        self.output_preferences.include_date_in_filenames = yes;
        self
    }

    /// Replace all checkpoint settings.
    pub fn user_checkpoints(mut self, checkpoints: UserCheckpoints) -> Self {
        self.user_checkpoints = checkpoints;
        self
    }

    /// Add an explicit checkpoint phase.
    pub fn checkpoint_at(mut self, phase: Phase) -> Self {
        if !self.user_checkpoints.custom.contains(&phase) {
            self.user_checkpoints.custom.push(phase);
        }
        self
    }

    /// Replace all escalation triggers.
    pub fn escalation_triggers(mut self, triggers: EscalationTriggers) -> Self {
        self.escalation_triggers = triggers;
        self
    }

    /// Validate and produce the configuration.
    ///
    /// Duplicate phases are dropped, keeping the first occurrence. Errors:
    /// empty selection, `USER_INPUT_REQUIRED` in the selection, a zero
    /// iteration limit, or a limit set for an uncapped phase.
    pub fn build(self) -> Result<WorkflowConfiguration, WaymarkError> {
        if self.selected_phases.is_empty() {
            return Err(WaymarkError::InvalidConfiguration(
                "no phases selected; pick a preset or select phases explicitly".into(),
            ));
        }
        if self.selected_phases.contains(&Phase::UserInputRequired) {
            return Err(WaymarkError::InvalidConfiguration(
                "USER_INPUT_REQUIRED cannot be selected; it is entered only through escalation"
                    .into(),
            ));
        }
        if let Some(phase) = self.uncapped_limit_phases.first() {
            return Err(WaymarkError::InvalidConfiguration(format!(
                "iteration limit set for {phase}, which has no iteration cap"
            )));
        }
        let limits = self.iteration_limits;
        if limits.test == 0 || limits.lint == 0 || limits.iterate == 0 {
            return Err(WaymarkError::InvalidConfiguration(
                "iteration limits must be at least 1".into(),
            ));
        }

        let mut selected = Vec::with_capacity(self.selected_phases.len());
        for phase in self.selected_phases {
            if !selected.contains(&phase) {
                selected.push(phase);
            }
        }

        Ok(WorkflowConfiguration {
            selected_phases: selected,
            iteration_limits: limits,
            output_preferences: self.output_preferences,
            user_checkpoints: self.user_checkpoints,
            escalation_triggers: self.escalation_triggers,
        })
    }
}

/// Phase selection section of `waymark.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowSection {
    /// Named preset to start from
    #[serde(default)]
    pub preset: Option<WorkflowKind>,
    /// Explicit phase list; takes precedence over the preset
    #[serde(default)]
    pub phases: Vec<Phase>,
}

/// The complete `waymark.toml` structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WaymarkToml {
    /// Phase selection
    #[serde(default)]
    pub workflow: WorkflowSection,
    /// Iteration caps for the correction loops
    #[serde(default)]
    pub limits: IterationLimits,
    /// Artifact naming and placement
    #[serde(default)]
    pub output: OutputPreferences,
    /// Human confirmation points
    #[serde(default)]
    pub checkpoints: UserCheckpoints,
    /// Escalation triggers
    #[serde(default)]
    pub escalation: EscalationTriggers,
}

impl WaymarkToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, WaymarkError> {
        let content = std::fs::read_to_string(path).map_err(|source| WaymarkError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| WaymarkError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse waymark.toml")
    }

    /// Load from `waymark.toml` in the project directory, or fall back to
    /// defaults if the file doesn't exist.
    pub fn load_or_default(project_dir: &Path) -> Result<Self, WaymarkError> {
        let config_path = default_config_path(project_dir);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.workflow.preset.is_some() && !self.workflow.phases.is_empty() {
            warnings.push(
                "both workflow.preset and workflow.phases are set; the explicit phase list wins"
                    .to_string(),
            );
        }
        if self.workflow.phases.contains(&Phase::UserInputRequired) {
            warnings.push(
                "USER_INPUT_REQUIRED cannot be selected; it is entered only through escalation"
                    .to_string(),
            );
        }
        for (name, limit) in [
            ("limits.test", self.limits.test),
            ("limits.lint", self.limits.lint),
            ("limits.iterate", self.limits.iterate),
        ] {
            if limit == 0 {
                warnings.push(format!("{name} is 0; iteration limits must be at least 1"));
            }
        }
        if self.output.formats.is_empty() {
            warnings.push("output.formats is empty; markdown will be used".to_string());
        }

        let selection = if self.workflow.phases.is_empty() {
            self.workflow.preset.unwrap_or_default().phases()
        } else {
            self.workflow.phases.clone()
        };
        for phase in &self.checkpoints.custom {
            if !selection.contains(phase) {
                warnings.push(format!(
                    "checkpoint phase {phase} is not part of the selected workflow"
                ));
            }
        }

        warnings
    }

    /// Convert into a validated `WorkflowConfiguration`.
    pub fn to_configuration(&self) -> Result<WorkflowConfiguration, WaymarkError> {
        let builder = if self.workflow.phases.is_empty() {
            WorkflowConfigurationBuilder::from_preset(self.workflow.preset.unwrap_or_default())
        } else {
            WorkflowConfigurationBuilder::new().select_phases(self.workflow.phases.clone())
        };
        builder
            .iteration_limits(self.limits)
            .output_preferences(self.output.clone())
            .user_checkpoints(self.checkpoints.clone())
            .escalation_triggers(self.escalation)
            .build()
    }
}

/// Path of the project-level config file.
pub fn default_config_path(project_dir: &Path) -> PathBuf {
    project_dir.join("waymark.toml")
}

/// Path of the per-user config file, if a config directory exists on this
/// platform.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("waymark").join("waymark.toml"))
}
