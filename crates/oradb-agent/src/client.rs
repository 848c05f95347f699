//! The database agent capability
//!
//! Controllers only see [`DatabaseAgent`]. Production code talks gRPC
//! through [`crate::GrpcAgentClient`]; the agent sidecar itself hosts
//! [`crate::LocalAgent`]; tests use the mock or the scripted runtime.

use async_trait::async_trait;
#[cfg(any(test, feature = "test-support"))]
use mockall::automock;
use oradb_lro::Operation;

use crate::types::{PhysicalRestoreRequest, RecoverableRange};
use crate::AgentError;

/// Operations a database agent exposes to the operator
#[cfg_attr(any(test, feature = "test-support"), automock)]
#[async_trait]
pub trait DatabaseAgent: Send + Sync {
    /// Start a physical restore under `request.operation_id`
    ///
    /// Returns the operation as registered. An agent that restores
    /// synchronously returns an already-terminal operation that it does not
    /// keep; polling that ID afterwards reports `NotFound`.
    async fn physical_restore_async(
        &self,
        request: PhysicalRestoreRequest,
    ) -> Result<Operation, AgentError>;

    /// Poll an operation; unknown IDs come back with state `NotFound`
    async fn get_operation(&self, id: &str) -> Result<Operation, AgentError>;

    /// Forget an operation; `AgentError::NotFound` if there is none
    async fn delete_operation(&self, id: &str) -> Result<(), AgentError>;

    /// Ranges the database can currently be recovered into, in agent order
    async fn available_recovery_windows(&self) -> Result<Vec<RecoverableRange>, AgentError>;

    /// Current database incarnation
    async fn database_incarnation(&self) -> Result<String, AgentError>;
}
