pub mod config;
pub mod constraint;
pub mod errors;
pub mod escalation;
pub mod guidance;
pub mod iteration;
pub mod naming;
pub mod orchestrator;
pub mod phase;
pub mod quality;
pub mod session;
pub mod validation;

pub use config::{WaymarkToml, WorkflowConfiguration, WorkflowConfigurationBuilder};
pub use errors::WaymarkError;
pub use orchestrator::Orchestrator;
pub use phase::{Phase, WorkflowKind};
