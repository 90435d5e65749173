use serde::{Deserialize, Serialize};

use crate::embedding_client::{EmbeddingClient, EmbeddingConfig};
use crate::stats_aggregator::StatsAggregator;
use crate::vector_store_client::{VectorStoreClient, VectorStoreConfig};

/// Configuration for the whole search layer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchServicesConfig {
    pub embedding: EmbeddingConfig,
    pub vector_store: VectorStoreConfig,
}

/// Capability object bundling the search layer's external boundaries
///
/// Constructed once at process start and passed by reference into handlers;
/// there are no ambient globals behind it. The document-store
/// `ConnectionCache` is a sibling capability object (generic over its
/// driver) built alongside this one by hosts that need the document store.
#[derive(Debug, Clone)]
pub struct SearchServices {
    embedding: EmbeddingClient,
    vector_store: VectorStoreClient,
    stats: StatsAggregator,
}

impl SearchServices {
    /// Build all clients from one configuration
    pub fn new(config: SearchServicesConfig) -> Self {
        let embedding = EmbeddingClient::with_config(config.embedding);
        let vector_store = VectorStoreClient::with_config(config.vector_store);
        let stats = StatsAggregator::new(vector_store.clone());

        Self {
            embedding,
            vector_store,
            stats,
        }
    }

    /// Build from already-constructed clients (tests, custom wiring)
    pub fn from_parts(embedding: EmbeddingClient, vector_store: VectorStoreClient) -> Self {
        let stats = StatsAggregator::new(vector_store.clone());
        Self {
            embedding,
            vector_store,
            stats,
        }
    }

    pub fn embedding(&self) -> &EmbeddingClient {
        &self.embedding
    }

    pub fn vector_store(&self) -> &VectorStoreClient {
        &self.vector_store
    }

    pub fn stats(&self) -> &StatsAggregator {
        &self.stats
    }
}
