use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "waymark")]
#[command(version, about = "Workflow governor for LLM coding agents")]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the built-in workflow presets
    Workflows,
    /// List the phases of a workflow with their file numbers
    Phases {
        /// Preset to list (defaults to refactor)
        #[arg(short, long)]
        workflow: Option<String>,
    },
    /// Print the guidance an agent receives for a phase
    Guidance {
        phase: String,

        /// Render the enforced shape with required files and criteria
        #[arg(long)]
        directive: bool,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(cli.verbose >= 2)
        .with_writer(std::io::stderr)
        .init();

    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    match &cli.command {
        Commands::Workflows => cmd::cmd_workflows()?,
        Commands::Phases { workflow } => cmd::cmd_phases(workflow.as_deref())?,
        Commands::Guidance { phase, directive } => cmd::cmd_guidance(phase, *directive)?,
        Commands::Config { command } => cmd::cmd_config(&project_dir, command.clone())?,
    }

    Ok(())
}
