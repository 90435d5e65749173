use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::{FaceSearchResult, SearchError};
use crate::types::Candidate;

const SERVICE_NAME: &str = "vector store";

/// Configuration for the vector store client (Weaviate-style GraphQL API)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    pub base_url: String,
    /// Bearer token for managed deployments; local instances omit it
    pub api_key: Option<String>,
    /// Collection holding the face embeddings
    pub collection: String,
    pub timeout_ms: u64,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            api_key: None,
            collection: "FaceEmbedding".to_string(),
            timeout_ms: 10_000,
        }
    }
}

/// Client for the external vector store
///
/// Issues `nearVector` queries and paged object listings against the store's
/// GraphQL endpoint. Returns unranked raw candidates; ranking, deduplication
/// and thresholding happen in `MatchAggregator`.
#[derive(Debug, Clone)]
pub struct VectorStoreClient {
    config: VectorStoreConfig,
    client: Client,
}

impl Default for VectorStoreClient {
    fn default() -> Self {
        Self::new()
    }
}

impl VectorStoreClient {
    /// Create a client with default configuration
    pub fn new() -> Self {
        Self::with_config(VectorStoreConfig::default())
    }

    /// Create a client with custom configuration
    pub fn with_config(config: VectorStoreConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { config, client }
    }

    /// Get configuration
    pub fn config(&self) -> &VectorStoreConfig {
        &self.config
    }

    /// Fetch up to `limit_hint` unranked nearest-neighbor candidates
    ///
    /// Callers typically pass `top_k * 10` to leave headroom for the
    /// per-identity deduplication that follows.
    pub async fn nearest(
        &self,
        vector: &[f32],
        limit_hint: usize,
    ) -> FaceSearchResult<Vec<Candidate>> {
        let vector_json = serde_json::to_string(vector)
            .map_err(|e| SearchError::upstream(SERVICE_NAME, e.to_string()))?;
        let query = format!(
            "{{ Get {{ {collection}(nearVector: {{vector: {vector}}}, limit: {limit}) \
             {{ personName _additional {{ distance }} }} }} }}",
            collection = self.config.collection,
            vector = vector_json,
            limit = limit_hint,
        );

        let body = self.execute_graphql(&query).await?;
        let candidates = parse_candidates(&body, &self.config.collection)?;
        log::debug!(
            "vector store returned {} raw candidates (limit hint {})",
            candidates.len(),
            limit_hint
        );
        Ok(candidates)
    }

    /// Fetch one page of raw identity values from the whole corpus
    ///
    /// Used by `StatsAggregator` to page through every stored embedding with
    /// no threshold and no deduplication.
    pub async fn identities_page(
        &self,
        limit: usize,
        offset: usize,
    ) -> FaceSearchResult<Vec<String>> {
        let query = format!(
            "{{ Get {{ {collection}(limit: {limit}, offset: {offset}) {{ personName }} }} }}",
            collection = self.config.collection,
            limit = limit,
            offset = offset,
        );

        let body = self.execute_graphql(&query).await?;
        parse_identity_page(&body, &self.config.collection)
    }

    /// POST a GraphQL query and return the parsed JSON body
    async fn execute_graphql(&self, query: &str) -> FaceSearchResult<Value> {
        let url = format!("{}/v1/graphql", self.config.base_url);

        let mut request = self.client.post(&url).json(&json!({ "query": query }));
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            log::warn!("vector store transport failure: {}", e);
            SearchError::upstream(SERVICE_NAME, format!("request failed: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            log::warn!("vector store returned HTTP {}", status.as_u16());
            return Err(SearchError::upstream(
                SERVICE_NAME,
                format!("HTTP {}", status.as_u16()),
            ));
        }

        let body: Value = response.json().await.map_err(|e| {
            SearchError::upstream(SERVICE_NAME, format!("malformed response: {}", e))
        })?;

        // GraphQL transports errors inside a 200 body
        if let Some(errors) = body.get("errors").and_then(|e| e.as_array()) {
            if !errors.is_empty() {
                let message = errors[0]
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("unknown GraphQL error");
                return Err(SearchError::upstream(
                    SERVICE_NAME,
                    format!("query rejected: {}", message),
                ));
            }
        }

        Ok(body)
    }
}

/// Extract raw candidates from a `nearVector` response body
///
/// Records missing a `personName` or `_additional.distance` make the payload
/// malformed; the whole response is rejected rather than silently truncated.
fn parse_candidates(body: &Value, collection: &str) -> FaceSearchResult<Vec<Candidate>> {
    let objects = body
        .get("data")
        .and_then(|d| d.get("Get"))
        .and_then(|g| g.get(collection))
        .and_then(|c| c.as_array())
        .ok_or_else(|| {
            SearchError::upstream(SERVICE_NAME, "malformed response: missing result array")
        })?;

    let mut candidates = Vec::with_capacity(objects.len());
    for object in objects {
        let identity = object
            .get("personName")
            .and_then(|n| n.as_str())
            .ok_or_else(|| {
                SearchError::upstream(SERVICE_NAME, "malformed response: missing personName")
            })?;
        let distance = object
            .get("_additional")
            .and_then(|a| a.get("distance"))
            .and_then(|d| d.as_f64())
            .ok_or_else(|| {
                SearchError::upstream(SERVICE_NAME, "malformed response: missing distance")
            })?;

        candidates.push(Candidate::new(identity, distance as f32));
    }

    Ok(candidates)
}

/// Extract one page of identity values from a listing response body
fn parse_identity_page(body: &Value, collection: &str) -> FaceSearchResult<Vec<String>> {
    let objects = body
        .get("data")
        .and_then(|d| d.get("Get"))
        .and_then(|g| g.get(collection))
        .and_then(|c| c.as_array())
        .ok_or_else(|| {
            SearchError::upstream(SERVICE_NAME, "malformed response: missing result array")
        })?;

    objects
        .iter()
        .map(|object| {
            object
                .get("personName")
                .and_then(|n| n.as_str())
                .map(|s| s.to_string())
                .ok_or_else(|| {
                    SearchError::upstream(
                        SERVICE_NAME,
                        "malformed response: missing personName",
                    )
                })
        })
        .collect()
}
