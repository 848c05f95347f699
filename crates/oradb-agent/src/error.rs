//! Agent errors

use thiserror::Error;
use tonic::Code;

/// Errors from talking to a database agent
#[derive(Debug, Error)]
pub enum AgentError {
    /// Agent unreachable or timed out
    #[error("agent unavailable: {0}")]
    Unavailable(String),

    /// The named object does not exist on the agent
    #[error("not found: {0}")]
    NotFound(String),

    /// Agent answered with a gRPC error
    #[error("agent rpc failed ({code:?}): {message}")]
    Rpc {
        /// gRPC status code
        code: Code,
        /// Status message
        message: String,
    },

    /// Agent address is not a valid URI
    #[error("invalid agent endpoint: {0}")]
    InvalidEndpoint(String),

    /// The database runtime reported a failure
    #[error("database runtime error: {0}")]
    Runtime(String),
}

impl AgentError {
    /// True if the same call may succeed later without a spec change
    pub fn is_retryable(&self) -> bool {
        match self {
            AgentError::Unavailable(_) => true,
            AgentError::Rpc { code, .. } => matches!(
                code,
                Code::Unavailable | Code::DeadlineExceeded | Code::Aborted | Code::ResourceExhausted
            ),
            AgentError::Runtime(_) => true,
            AgentError::NotFound(_) | AgentError::InvalidEndpoint(_) => false,
        }
    }

    /// Convert into the operator-wide error, naming the instance served
    pub fn into_common(self, resource: &str) -> oradb_common::Error {
        if self.is_retryable() {
            oradb_common::Error::agent(resource, self.to_string())
        } else {
            oradb_common::Error::agent_permanent(resource, self.to_string())
        }
    }
}

impl From<tonic::Status> for AgentError {
    fn from(status: tonic::Status) -> Self {
        match status.code() {
            Code::NotFound => AgentError::NotFound(status.message().to_string()),
            Code::Unavailable | Code::DeadlineExceeded => {
                AgentError::Unavailable(status.message().to_string())
            }
            code => AgentError::Rpc {
                code,
                message: status.message().to_string(),
            },
        }
    }
}
