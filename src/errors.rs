//! Typed error hierarchy for the waymark core.
//!
//! `WaymarkError` covers operational faults: missing sessions, bad
//! configuration, config-file I/O. Constraint and artifact failures are NOT
//! errors: they are structured payloads (`ConstraintViolation`,
//! `ArtifactError`) returned to the caller so the agent can correct course.

use thiserror::Error;

/// Operational errors from the workflow core.
#[derive(Debug, Error)]
pub enum WaymarkError {
    #[error("No active session; call start_session first")]
    NoActiveSession,

    #[error("Unknown workflow preset '{0}' (expected refactor, feature, quick-fix, or full)")]
    UnknownWorkflow(String),

    #[error("Invalid workflow configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Failed to read config file at {path}: {source}")]
    ConfigRead {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    ConfigParse {
        path: std::path::PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Session store lock poisoned")]
    LockPoisoned,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_active_session_is_matchable() {
        let err = WaymarkError::NoActiveSession;
        assert!(matches!(err, WaymarkError::NoActiveSession));
        assert!(err.to_string().contains("start_session"));
    }

    #[test]
    fn unknown_workflow_carries_name() {
        let err = WaymarkError::UnknownWorkflow("sprint".to_string());
        match &err {
            WaymarkError::UnknownWorkflow(name) => assert_eq!(name, "sprint"),
            _ => panic!("Expected UnknownWorkflow variant"),
        }
        assert!(err.to_string().contains("sprint"));
    }

    #[test]
    fn config_read_carries_path() {
        use std::path::PathBuf;
        let path = PathBuf::from("/project/waymark.toml");
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = WaymarkError::ConfigRead {
            path: path.clone(),
            source: io_err,
        };
        match &err {
            WaymarkError::ConfigRead { path: p, source: s } => {
                assert_eq!(p, &path);
                assert_eq!(s.kind(), std::io::ErrorKind::PermissionDenied);
            }
            _ => panic!("Expected ConfigRead"),
        }
    }

    #[test]
    fn invalid_configuration_message_surfaces() {
        let err = WaymarkError::InvalidConfiguration("selected phases must not be empty".into());
        assert!(err.to_string().contains("selected phases must not be empty"));
    }

    #[test]
    fn converts_from_anyhow() {
        let inner = anyhow::anyhow!("unexpected condition");
        let err: WaymarkError = inner.into();
        assert!(matches!(err, WaymarkError::Other(_)));
    }

    #[test]
    fn implements_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&WaymarkError::NoActiveSession);
        assert_std_error(&WaymarkError::LockPoisoned);
    }
}
