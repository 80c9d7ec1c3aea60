//! Workflow and phase catalog commands.

use anyhow::Result;
use std::str::FromStr;

use waymark::config::WorkflowConfiguration;
use waymark::guidance::guidance_for;
use waymark::phase::{Phase, WorkflowKind};

pub fn cmd_workflows() -> Result<()> {
    println!();
    println!("Workflow presets");
    println!();
    println!("{:<12} {:<8} Description", "Name", "Phases");
    println!("{:<12} {:<8} -----------", "------------", "------");

    for kind in WorkflowKind::ALL {
        println!(
            "{:<12} {:<8} {}",
            kind.to_string(),
            kind.phases().len(),
            kind.description()
        );
    }
    println!();
    println!("Default preset: {}", WorkflowKind::default());
    println!();
    Ok(())
}

pub fn cmd_phases(workflow: Option<&str>) -> Result<()> {
    let kind = match workflow {
        Some(name) => WorkflowKind::from_str(name)?,
        None => WorkflowKind::default(),
    };

    println!();
    println!("Phases for the {} workflow", console::style(kind).bold());
    println!();
    println!(
        "{:<6} {:<22} {:<24} {:<28} Capped",
        "File", "Phase", "Slug", "Guidance tool"
    );
    println!(
        "{:<6} {:<22} {:<24} {:<28} ------",
        "----", "-----", "----", "-------------"
    );

    for phase in kind.phases() {
        println!(
            "{:<6} {:<22} {:<24} {:<28} {}",
            format!("{:02}", phase.file_number()),
            phase.wire_name(),
            phase.slug(),
            phase.guidance_tool(),
            if phase.has_iteration_limit() { "yes" } else { "" }
        );
    }
    println!();
    println!(
        "Escalation phase: {} (file {:02}, reachable from any phase)",
        Phase::UserInputRequired.wire_name(),
        Phase::UserInputRequired.file_number()
    );
    println!();
    Ok(())
}

pub fn cmd_guidance(phase: &str, directive: bool) -> Result<()> {
    let phase = Phase::from_str(phase)?;
    let config = directive.then(|| WorkflowConfiguration::for_preset(WorkflowKind::default()));
    let guidance = guidance_for(phase, config.as_ref());

    println!();
    println!(
        "{} ({} mode)",
        console::style(guidance.phase.wire_name()).bold(),
        guidance.mode
    );
    println!();
    println!("Objective: {}", guidance.objective);
    println!();
    println!("Instructions:");
    for (i, instruction) in guidance.instructions.iter().enumerate() {
        println!("  {}. {}", i + 1, instruction);
    }
    println!();
    println!("Expected output: {}", guidance.expected_output);

    if let Some(files) = &guidance.required_output_files {
        println!();
        println!("Required output files:");
        for file in files {
            println!("  - {}", file);
        }
    }
    if let Some(criteria) = &guidance.validation_criteria {
        println!();
        println!("Validation criteria:");
        for criterion in criteria {
            println!("  - {}", criterion);
        }
    }
    for message in &guidance.blocking_messages {
        println!();
        println!("{} {}", console::style("Blocking:").red(), message);
    }
    if let Some(next) = guidance.next_phase {
        println!();
        println!("Next phase: {}", next.wire_name());
    }
    println!();
    Ok(())
}
