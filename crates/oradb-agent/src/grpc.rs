//! gRPC transport to a remote database agent

use std::time::Duration;

use async_trait::async_trait;
use oradb_lro::Operation;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};
use tracing::{debug, instrument};

use crate::client::DatabaseAgent;
use crate::proto::{self, paths};
use crate::types::{PhysicalRestoreRequest, RecoverableRange};
use crate::AgentError;

/// Default agent gRPC port
pub const DEFAULT_AGENT_PORT: u16 = 3202;

/// Connection settings for agent clients
#[derive(Clone, Debug)]
pub struct AgentClientConfig {
    /// Port the agent service listens on
    pub port: u16,
    /// Bound on establishing a connection
    pub connect_timeout: Duration,
    /// Bound on each RPC
    pub rpc_timeout: Duration,
}

impl Default for AgentClientConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_AGENT_PORT,
            connect_timeout: Duration::from_secs(10),
            rpc_timeout: Duration::from_secs(30),
        }
    }
}

/// [`DatabaseAgent`] over a lazily connected tonic channel
#[derive(Clone)]
pub struct GrpcAgentClient {
    grpc: tonic::client::Grpc<Channel>,
    endpoint: String,
}

impl GrpcAgentClient {
    /// Build a client for `endpoint`; the connection is made on first use
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect_lazy(endpoint: &str, config: &AgentClientConfig) -> Result<Self, AgentError> {
        let channel = Endpoint::from_shared(endpoint.to_string())
            .map_err(|e| AgentError::InvalidEndpoint(format!("{endpoint}: {e}")))?
            .connect_timeout(config.connect_timeout)
            .timeout(config.rpc_timeout)
            .connect_lazy();
        Ok(Self {
            grpc: tonic::client::Grpc::new(channel),
            endpoint: endpoint.to_string(),
        })
    }

    /// Address this client talks to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn unary<Req, Resp>(&self, path: &'static str, request: Req) -> Result<Resp, AgentError>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        let mut grpc = self.grpc.clone();
        grpc.ready().await.map_err(|e| {
            AgentError::Unavailable(format!("{} not ready: {}", self.endpoint, e))
        })?;
        let response = grpc
            .unary(
                tonic::Request::new(request),
                PathAndQuery::from_static(path),
                ProstCodec::<Req, Resp>::default(),
            )
            .await?;
        Ok(response.into_inner())
    }
}

#[async_trait]
impl DatabaseAgent for GrpcAgentClient {
    #[instrument(skip(self, request), fields(endpoint = %self.endpoint, operation = %request.operation_id))]
    async fn physical_restore_async(
        &self,
        request: PhysicalRestoreRequest,
    ) -> Result<Operation, AgentError> {
        let wire = proto::PhysicalRestoreRequestProto::from(&request);
        let op: proto::OperationProto = self.unary(paths::PHYSICAL_RESTORE_ASYNC, wire).await?;
        debug!(state = op.state, "restore submitted");
        Ok(op.into())
    }

    async fn get_operation(&self, id: &str) -> Result<Operation, AgentError> {
        let req = proto::OperationNameRequest {
            name: id.to_string(),
        };
        match self
            .unary::<_, proto::OperationProto>(paths::GET_OPERATION, req)
            .await
        {
            Ok(op) => Ok(op.into()),
            // Agents that expire records answer NOT_FOUND instead of a state
            Err(AgentError::NotFound(_)) => Ok(Operation::not_found(id)),
            Err(e) => Err(e),
        }
    }

    async fn delete_operation(&self, id: &str) -> Result<(), AgentError> {
        let req = proto::OperationNameRequest {
            name: id.to_string(),
        };
        let _: proto::Empty = self.unary(paths::DELETE_OPERATION, req).await?;
        Ok(())
    }

    async fn available_recovery_windows(&self) -> Result<Vec<RecoverableRange>, AgentError> {
        let resp: proto::AvailableRecoveryWindowsResponse = self
            .unary(paths::AVAILABLE_RECOVERY_WINDOWS, proto::Empty {})
            .await?;
        resp.windows.into_iter().map(TryInto::try_into).collect()
    }

    async fn database_incarnation(&self) -> Result<String, AgentError> {
        let resp: proto::DatabaseIncarnationResponse = self
            .unary(paths::DATABASE_INCARNATION, proto::Empty {})
            .await?;
        Ok(resp.incarnation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_agent_port() {
        let config = AgentClientConfig::default();
        assert_eq!(config.port, 3202);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.rpc_timeout, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn malformed_endpoint_is_rejected() {
        let err = GrpcAgentClient::connect_lazy("not a uri", &AgentClientConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, AgentError::InvalidEndpoint(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn valid_endpoint_builds_without_connecting() {
        let client = GrpcAgentClient::connect_lazy(
            "http://mydb-agent.db:3202",
            &AgentClientConfig::default(),
        )
        .unwrap();
        assert_eq!(client.endpoint(), "http://mydb-agent.db:3202");
    }
}
