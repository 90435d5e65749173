//! # faceseek
//!
//! Face-identity search layer sitting between an external embedding
//! extractor, an external vector store, and a set of stateless request
//! handlers. Raw nearest-neighbor candidates come in; a deduplicated,
//! thresholded, ranked set of identity matches comes out. A process-wide
//! `ConnectionCache` shares one validated document-store handle across
//! short-lived invocations whose transport may die silently between calls.
//!
//! Image capture, the embedding model, the ANN index, HTTP routing and all
//! non-search document CRUD are external collaborators and live elsewhere.

// Module declarations
pub mod connection_cache;
pub mod embedding_client;
pub mod errors;
pub mod match_aggregator;
pub mod search_commands;
pub mod services;
pub mod stats_aggregator;
pub mod types;
pub mod vector_store_client;

// Re-exports for commonly used types
pub use connection_cache::{
    ConnectionCache, ConnectionCacheConfig, ConnectionHandle, DocumentStoreConnector,
};
pub use embedding_client::{EmbeddingClient, EmbeddingConfig};
pub use errors::{FaceSearchResult, SearchError};
pub use match_aggregator::MatchAggregator;
pub use search_commands::{get_stats, list_people, search_faces};
pub use services::{SearchServices, SearchServicesConfig};
pub use stats_aggregator::StatsAggregator;
pub use types::{
    Candidate, CorpusStats, Embedding, FaceMatch, PersonCount, SearchRequest, SearchResult,
};
pub use vector_store_client::{VectorStoreClient, VectorStoreConfig};
