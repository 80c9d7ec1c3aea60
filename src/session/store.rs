//! Holder for the single live session.

use chrono::Utc;
use tracing::{debug, info};

use super::{Session, SessionSummary};
use crate::config::WorkflowConfiguration;
use crate::errors::WaymarkError;

/// Owns at most one live session.
///
/// Starting a new session while one is live replaces it.
#[derive(Debug, Default)]
pub struct SessionStore {
    active: Option<Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn active(&self) -> Option<&Session> {
        self.active.as_ref()
    }

    pub fn active_mut(&mut self) -> Option<&mut Session> {
        self.active.as_mut()
    }

    /// The live session, or `NoActiveSession`.
    pub fn get(&self) -> Result<&Session, WaymarkError> {
        self.active.as_ref().ok_or(WaymarkError::NoActiveSession)
    }

    /// Mutable access to the live session, or `NoActiveSession`.
    pub fn get_mut(&mut self) -> Result<&mut Session, WaymarkError> {
        self.active.as_mut().ok_or(WaymarkError::NoActiveSession)
    }

    /// Start a session, replacing any live one.
    pub fn start(&mut self, task: &str, config: Option<WorkflowConfiguration>) -> &Session {
        if let Some(previous) = &self.active {
            info!(
                replaced = %previous.id(),
                "starting a new session over a live one"
            );
        }
        let session = Session::new(task, config);
        debug!(id = %session.id(), task, "session started");
        self.active.insert(session)
    }

    /// End the live session and return its summary, if one was live.
    pub fn end(&mut self) -> Option<SessionSummary> {
        let session = self.active.take()?;
        let summary = session.summary(Utc::now());
        debug!(id = %summary.id, phases = summary.completed_phases.len(), "session ended");
        Some(summary)
    }
}
