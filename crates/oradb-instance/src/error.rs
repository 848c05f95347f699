//! Instance controller errors

use oradb_agent::AgentError;

/// Errors from reconciling an Instance
#[derive(Debug, thiserror::Error)]
pub enum InstanceError {
    #[error("{0}")]
    Common(#[from] oradb_common::Error),

    #[error("agent: {0}")]
    Agent(#[from] AgentError),

    #[error("missing namespace on Instance")]
    MissingNamespace,

    #[error("restore preflight failed: {message}")]
    Preflight { message: String },
}

impl InstanceError {
    /// Preflight rejection
    pub fn preflight(message: impl Into<String>) -> Self {
        Self::Preflight {
            message: message.into(),
        }
    }

    /// True if retrying without a spec change may succeed
    ///
    /// Preflight failures retry: the backup they wait on may still be
    /// finishing.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Common(e) => e.is_retryable(),
            Self::Agent(e) => e.is_retryable(),
            Self::MissingNamespace => false,
            Self::Preflight { .. } => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryability_follows_the_source() {
        assert!(InstanceError::from(AgentError::Unavailable("down".into())).is_retryable());
        assert!(!InstanceError::from(AgentError::InvalidEndpoint("x".into())).is_retryable());
        assert!(!InstanceError::MissingNamespace.is_retryable());
        assert!(InstanceError::preflight("backup not ready").is_retryable());
        assert!(!InstanceError::from(oradb_common::Error::validation("bad")).is_retryable());
    }

    #[test]
    fn preflight_message_is_displayed() {
        let err = InstanceError::preflight("force must be set");
        assert_eq!(err.to_string(), "restore preflight failed: force must be set");
    }
}
