//! Database agent access for the oradb operator
//!
//! Each Instance is served by an agent sidecar next to the database. This
//! crate defines the capability the controllers use ([`DatabaseAgent`]), its
//! gRPC transport, the in-process implementation the sidecar hosts, and the
//! SID holder that sidecar handlers share.

#![deny(missing_docs)]

// Generated mocks carry no docs
#[cfg_attr(any(test, feature = "test-support"), allow(missing_docs))]
mod client;
mod error;
mod grpc;
mod local;
#[allow(missing_docs)]
pub mod proto;
#[cfg_attr(any(test, feature = "test-support"), allow(missing_docs))]
mod resolver;
mod sid;
mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

#[cfg(any(test, feature = "test-support"))]
pub use client::MockDatabaseAgent;
pub use client::DatabaseAgent;
pub use error::AgentError;
pub use grpc::{AgentClientConfig, GrpcAgentClient, DEFAULT_AGENT_PORT};
pub use local::{DatabaseRuntime, LocalAgent};
#[cfg(any(test, feature = "test-support"))]
pub use resolver::MockAgentResolver;
pub use resolver::{AgentResolver, GrpcAgentResolver};
pub use sid::{Sid, SidHolder};
pub use types::{PhysicalRestoreRequest, RecoverableRange, RecoveryPoint};

pub use oradb_lro::{Operation, OperationState};
