use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::warn;

use crate::error::StoreError;
use crate::{Launch, Launchpad};

/// The three read shapes the backing store offers. Get-all and get-by-id are
/// plain REST reads; the id-set query exists solely for the batch loader.
/// No batching logic lives here.
#[async_trait]
pub trait BackingStore: Send + Sync {
    async fn fetch_all_launches(&self) -> Result<Vec<Launch>, StoreError>;

    /// Direct single-identifier read. Launches have no batched path, so this
    /// is how a single launch is always fetched. 404 is `Ok(None)`.
    async fn fetch_one_launch(&self, id: &str) -> Result<Option<Launch>, StoreError>;

    async fn fetch_all_launchpads(&self) -> Result<Vec<Launchpad>, StoreError>;

    /// Query-by-id-set, used exclusively by the batch loader. The result may
    /// contain fewer records than ids; absent ids simply have no match.
    async fn query_launchpads(&self, ids: &[String]) -> Result<Vec<Launchpad>, StoreError>;
}

pub struct HttpBackingStore {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct QueryPage {
    docs: Vec<Value>,
}

impl HttpBackingStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        HttpBackingStore {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, StoreError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| StoreError::Unreachable(err.to_string()))?;

        if !response.status().is_success() {
            return Err(StoreError::Status {
                status: response.status().as_u16(),
                path: path.to_string(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|err| StoreError::MalformedPayload(err.to_string()))
    }
}

#[async_trait]
impl BackingStore for HttpBackingStore {
    async fn fetch_all_launches(&self) -> Result<Vec<Launch>, StoreError> {
        self.get_json("/launches").await
    }

    async fn fetch_one_launch(&self, id: &str) -> Result<Option<Launch>, StoreError> {
        let path = format!("/launches/{id}");
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| StoreError::Unreachable(err.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(StoreError::Status {
                status: response.status().as_u16(),
                path,
            });
        }

        response
            .json::<Launch>()
            .await
            .map(Some)
            .map_err(|err| StoreError::MalformedPayload(err.to_string()))
    }

    async fn fetch_all_launchpads(&self) -> Result<Vec<Launchpad>, StoreError> {
        self.get_json("/launchpads").await
    }

    async fn query_launchpads(&self, ids: &[String]) -> Result<Vec<Launchpad>, StoreError> {
        let path = "/launchpads/query";
        let url = format!("{}{}", self.base_url, path);
        // The store speaks a Mongo-style query dialect on this endpoint; the
        // body shape is fixed by it.
        let body = json!({ "query": { "_id": { "$in": ids } } });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|err| StoreError::Unreachable(err.to_string()))?;

        if !response.status().is_success() {
            return Err(StoreError::Status {
                status: response.status().as_u16(),
                path: path.to_string(),
            });
        }

        let page: QueryPage = response
            .json()
            .await
            .map_err(|err| StoreError::MalformedPayload(err.to_string()))?;

        // A doc that doesn't decode (no usable identifier, wrong shape) is
        // dropped here, so its requesters see not-found rather than the
        // whole window failing.
        let mut pads = Vec::with_capacity(page.docs.len());
        for doc in page.docs {
            match serde_json::from_value::<Launchpad>(doc) {
                Ok(pad) => pads.push(pad),
                Err(err) => warn!(error = %err, "skipping undecodable launchpad doc in batched query response"),
            }
        }
        Ok(pads)
    }
}
