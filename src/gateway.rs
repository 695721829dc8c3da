use std::path::Path;
use std::sync::Arc;
use std::{fs, io};

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::GatewayError;
use crate::query_executor::QueryExecutor;
use crate::rest_client::BackingStore;
use crate::schema_registry::SchemaRegistry;
use crate::{GraphQLRequest, RequestContext};

#[derive(Debug, Deserialize)]
pub struct GatewayConfig {
    pub listen: ListenConfig,
    pub backing_store: BackingStoreConfig,
}

#[derive(Debug, Deserialize)]
pub struct ListenConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct BackingStoreConfig {
    pub base_url: String,
}

impl GatewayConfig {
    pub fn load(path: &Path) -> Result<Self, GatewayError> {
        let contents = fs::read_to_string(path).map_err(|err| config_error(path, &err))?;
        serde_yaml::from_str(&contents).map_err(|err| GatewayError::Config {
            path: path.display().to_string(),
            reason: err.to_string(),
        })
    }
}

fn config_error(path: &Path, err: &io::Error) -> GatewayError {
    GatewayError::Config {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}

/// Request orchestration. Every incoming request gets its own
/// `RequestContext`, and with it its own batch loader, so nothing memoized
/// survives past the request.
pub struct Gateway {
    registry: SchemaRegistry,
    executor: QueryExecutor,
    store: Arc<dyn BackingStore>,
}

impl Gateway {
    pub fn new(registry: SchemaRegistry, store: Arc<dyn BackingStore>) -> Self {
        Gateway {
            registry,
            executor: QueryExecutor::new(),
            store,
        }
    }

    pub async fn process_request(&self, request: GraphQLRequest) -> Result<Value, GatewayError> {
        debug!(
            operation = request.operation_name.as_deref().unwrap_or("<anonymous>"),
            "processing graphql request"
        );
        let ctx = RequestContext::new(Arc::clone(&self.store));
        self.executor.execute(&request, &self.registry, &ctx).await
    }
}
