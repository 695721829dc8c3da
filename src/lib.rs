pub mod batch_loader;
pub mod error;
pub mod field_resolver;
pub mod gateway;
pub mod query_executor;
pub mod rest_client;
pub mod schema_registry;

pub use batch_loader::LaunchpadLoader;
pub use gateway::{Gateway, GatewayConfig};
pub use query_executor::QueryExecutor;
pub use rest_client::{BackingStore, HttpBackingStore};
pub use schema_registry::SchemaRegistry;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// The SDL this gateway serves.
pub const SCHEMA_SDL: &str = include_str!("../schemas/gantry.graphql");

#[derive(Serialize, Deserialize, Debug)]
pub struct GraphQLRequest {
    pub query: String,
    #[serde(default)]
    pub variables: Option<Value>,
    #[serde(default, alias = "operationName")]
    pub operation_name: Option<String>,
}

/// A launch record as the backing store returns it. Immutable once fetched
/// within a request; `launchpad` is an identifier reference, resolved to a
/// full record only when a query selects it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Launch {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub launchpad: Option<String>,
}

/// A launchpad record. The batched query endpoint is Mongo-shaped and some
/// payloads carry `_id` instead of `id`; both are accepted.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Launchpad {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Per-request dependencies handed into every field resolution: the store
/// handle and the launchpad loader. Built fresh for each incoming request so
/// the loader's memoized results never leak across requests.
pub struct RequestContext {
    pub store: Arc<dyn BackingStore>,
    pub launchpads: LaunchpadLoader,
}

impl RequestContext {
    pub fn new(store: Arc<dyn BackingStore>) -> Self {
        let launchpads = LaunchpadLoader::new(Arc::clone(&store));
        RequestContext { store, launchpads }
    }
}
