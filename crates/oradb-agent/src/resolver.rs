//! Mapping Instances to the agent that serves them

use std::sync::Arc;

use dashmap::DashMap;
#[cfg(any(test, feature = "test-support"))]
use mockall::automock;
use oradb_common::crd::Instance;
use tracing::debug;

use crate::client::DatabaseAgent;
use crate::grpc::{AgentClientConfig, GrpcAgentClient};
use crate::AgentError;

/// Finds the agent for an Instance
#[cfg_attr(any(test, feature = "test-support"), automock)]
pub trait AgentResolver: Send + Sync {
    /// Agent serving `instance`
    fn resolve(&self, instance: &Instance) -> Result<Arc<dyn DatabaseAgent>, AgentError>;
}

/// Resolver that keeps one gRPC client per agent endpoint
pub struct GrpcAgentResolver {
    config: AgentClientConfig,
    clients: DashMap<String, Arc<GrpcAgentClient>>,
}

impl GrpcAgentResolver {
    /// Resolver dialing agents with `config`
    pub fn new(config: AgentClientConfig) -> Self {
        Self {
            config,
            clients: DashMap::new(),
        }
    }

    /// Number of cached clients
    pub fn cached(&self) -> usize {
        self.clients.len()
    }
}

impl AgentResolver for GrpcAgentResolver {
    fn resolve(&self, instance: &Instance) -> Result<Arc<dyn DatabaseAgent>, AgentError> {
        let endpoint = instance.agent_endpoint(self.config.port);
        if let Some(client) = self.clients.get(&endpoint) {
            return Ok(Arc::clone(client.value()) as Arc<dyn DatabaseAgent>);
        }
        let client = Arc::new(GrpcAgentClient::connect_lazy(&endpoint, &self.config)?);
        debug!(%endpoint, "created agent client");
        let client = self.clients.entry(endpoint).or_insert(client).value().clone();
        Ok(client as Arc<dyn DatabaseAgent>)
    }
}
