//! Configuration view and validation commands backing `waymark config`.

use anyhow::Result;

use super::super::ConfigCommands;

pub fn cmd_config(project_dir: &std::path::Path, command: Option<ConfigCommands>) -> Result<()> {
    use waymark::config::{WaymarkToml, default_config_path, user_config_path};

    let config_path = default_config_path(project_dir);

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Waymark Configuration");
            println!("=====================");
            println!();

            let toml = if config_path.exists() {
                println!("Config file: {}", config_path.display());
                println!();
                WaymarkToml::load(&config_path)?
            } else {
                println!("No waymark.toml found at {}", config_path.display());
                if let Some(user_path) = user_config_path() {
                    println!("(user-level config would be read from {})", user_path.display());
                }
                println!();
                println!("Using default configuration:");
                WaymarkToml::default()
            };

            println!("[workflow]");
            match (&toml.workflow.preset, toml.workflow.phases.is_empty()) {
                (_, false) => {
                    let names: Vec<&str> =
                        toml.workflow.phases.iter().map(|p| p.wire_name()).collect();
                    println!("  phases = [{}]", names.join(", "));
                }
                (Some(preset), true) => println!("  preset = \"{}\"", preset),
                (None, true) => println!("  preset = \"{}\" (default)", waymark::WorkflowKind::default()),
            }
            println!();

            println!("[limits]");
            println!("  test = {}", toml.limits.test);
            println!("  lint = {}", toml.limits.lint);
            println!("  iterate = {}", toml.limits.iterate);
            println!();

            println!("[output]");
            let formats: Vec<String> =
                toml.output.formats.iter().map(|f| f.to_string()).collect();
            println!("  formats = [{}]", formats.join(", "));
            println!("  directory = \"{}\"", toml.output.directory);
            println!(
                "  include_date_in_filenames = {}",
                toml.output.include_date_in_filenames
            );
            println!("  subdirectory_per_task = {}", toml.output.subdirectory_per_task);
            println!();

            println!("[checkpoints]");
            println!("  before_major_changes = {}", toml.checkpoints.before_major_changes);
            println!(
                "  after_failed_iterations = {}",
                toml.checkpoints.after_failed_iterations
            );
            println!(
                "  before_final_presentation = {}",
                toml.checkpoints.before_final_presentation
            );
            if !toml.checkpoints.custom.is_empty() {
                let names: Vec<&str> =
                    toml.checkpoints.custom.iter().map(|p| p.wire_name()).collect();
                println!("  custom = [{}]", names.join(", "));
            }
            println!();

            println!("[escalation]");
            println!("  on_iteration_limit = {}", toml.escalation.on_iteration_limit);
            println!(
                "  on_repeated_validation_failure = {}",
                toml.escalation.on_repeated_validation_failure
            );
            println!("  on_blocked_constraint = {}", toml.escalation.on_blocked_constraint);
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No waymark.toml found. Using defaults (valid).");
                return Ok(());
            }

            let toml = WaymarkToml::load(&config_path)?;
            let warnings = toml.validate();

            if warnings.is_empty() {
                println!("Configuration is valid.");
                let config = toml.to_configuration()?;
                let names: Vec<&str> =
                    config.selected_phases.iter().map(|p| p.wire_name()).collect();
                println!("Selected phases: {}", names.join(" -> "));
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
    }

    Ok(())
}
