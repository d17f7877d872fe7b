// src/wes/pool.rs

//! Client selection and per-service connection reuse.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::ServiceEndpoint;
use crate::errors::Result;
use crate::types::ClientKind;
use crate::wes::{ContractClient, HttpWesLibrary, LibraryAdapter, WorkflowService};

/// Builds a live client for an execution-service endpoint.
///
/// Production code uses [`EndpointConnector`]; tests hand out fakes.
#[async_trait]
pub trait ServiceConnector: Send + Sync {
    async fn connect(
        &self,
        wes_id: &str,
        endpoint: &ServiceEndpoint,
    ) -> Result<Arc<dyn WorkflowService>>;
}

/// Chooses the client strategy from the endpoint's `client` setting.
#[derive(Debug, Clone, Copy, Default)]
pub struct EndpointConnector;

#[async_trait]
impl ServiceConnector for EndpointConnector {
    async fn connect(
        &self,
        wes_id: &str,
        endpoint: &ServiceEndpoint,
    ) -> Result<Arc<dyn WorkflowService>> {
        info!(wes = %wes_id, host = %endpoint.host, client = ?endpoint.client, "connecting to workflow service");
        let client: Arc<dyn WorkflowService> = match endpoint.client {
            ClientKind::Contract => Arc::new(ContractClient::connect(endpoint).await?),
            ClientKind::Library => Arc::new(LibraryAdapter::new(HttpWesLibrary::from_endpoint(endpoint)?)),
        };
        Ok(client)
    }
}

/// One live client per execution-service id, kept for the pool's lifetime.
pub struct ServicePool {
    connector: Box<dyn ServiceConnector>,
    clients: HashMap<String, Arc<dyn WorkflowService>>,
}

impl fmt::Debug for ServicePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServicePool")
            .field("connected", &self.clients.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl ServicePool {
    pub fn new(connector: impl ServiceConnector + 'static) -> Self {
        Self {
            connector: Box::new(connector),
            clients: HashMap::new(),
        }
    }

    /// Cached client for `wes_id`, connecting on first use.
    ///
    /// A failed connect is not cached, so the next call tries again.
    pub async fn get(
        &mut self,
        wes_id: &str,
        endpoint: &ServiceEndpoint,
    ) -> Result<Arc<dyn WorkflowService>> {
        if let Some(client) = self.clients.get(wes_id) {
            return Ok(Arc::clone(client));
        }

        let client = self.connector.connect(wes_id, endpoint).await?;
        debug!(wes = %wes_id, "caching workflow service client");
        self.clients.insert(wes_id.to_string(), Arc::clone(&client));
        Ok(client)
    }

    pub fn connected(&self) -> usize {
        self.clients.len()
    }
}
