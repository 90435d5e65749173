//! Handler Layer for Face-Identity Search
//!
//! Plain async functions consumed by the enclosing HTTP/serverless layer:
//! `search_faces` (`POST /search`), `list_people` (`GET /people`) and
//! `get_stats` (`GET /stats`). Each handler orchestrates the external
//! boundaries and delegates the actual ranking work to the pure
//! `MatchAggregator`.

use std::time::Instant;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{FaceSearchResult, SearchError};
use crate::match_aggregator::MatchAggregator;
use crate::services::SearchServices;
use crate::types::{
    CorpusStats, PersonCount, SearchRequest, SearchResult, DEFAULT_THRESHOLD, DEFAULT_TOP_K,
};

/// Candidates requested per returned match, leaving headroom for the
/// per-identity deduplication that shrinks the raw list
const CANDIDATE_POOL_FACTOR: usize = 10;

/// Default cap on the `/people` listing
const DEFAULT_PEOPLE_LIMIT: usize = 100;

/// Matches a leading `data:<mime>;base64,` prefix on the image payload
static DATA_URI_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^data:[\w/+.-]+;base64,").expect("valid data-URI regex"));

/// Run a face-identity search over the supplied image
///
/// Decodes the image, extracts an embedding, fetches `top_k * 10` raw
/// candidates from the vector store and aggregates them into the final
/// ranked result. The upstream "no detectable face" signal is not a
/// failure: it becomes a normal result with `faces_detected = 0`.
pub async fn search_faces(
    services: &SearchServices,
    request: SearchRequest,
) -> FaceSearchResult<SearchResult> {
    let start = Instant::now();

    let image_bytes = decode_image(&request.image)?;
    let top_k = request.top_k.unwrap_or(DEFAULT_TOP_K).max(1);
    let threshold = request.threshold.unwrap_or(DEFAULT_THRESHOLD);

    let embedding = match services.embedding().extract(image_bytes).await {
        Ok(embedding) => embedding,
        Err(SearchError::NoFaceDetected) => {
            let mut result = SearchResult::no_face();
            result.search_time_ms = start.elapsed().as_millis() as u64;
            log::info!(
                "search completed with no detectable face in {}ms",
                result.search_time_ms
            );
            return Ok(result);
        }
        Err(e) => return Err(e),
    };

    let candidates = services
        .vector_store()
        .nearest(&embedding, top_k * CANDIDATE_POOL_FACTOR)
        .await?;

    let mut result = MatchAggregator::aggregate(&candidates, top_k, Some(threshold));
    result.search_time_ms = start.elapsed().as_millis() as u64;

    log::info!(
        "search completed in {}ms: found={} matches={} raw_candidates={}",
        result.search_time_ms,
        result.found,
        result.matches.len(),
        candidates.len()
    );
    Ok(result)
}

/// List identities with their embedding counts (`GET /people`)
pub async fn list_people(
    services: &SearchServices,
    limit: Option<usize>,
) -> FaceSearchResult<Vec<PersonCount>> {
    services
        .stats()
        .list_identities(limit.unwrap_or(DEFAULT_PEOPLE_LIMIT))
        .await
}

/// Corpus-wide totals (`GET /stats`)
pub async fn get_stats(services: &SearchServices) -> FaceSearchResult<CorpusStats> {
    services.stats().count_all().await
}

/// Strip any data-URI prefix and base64-decode the image payload
fn decode_image(image: &str) -> FaceSearchResult<Vec<u8>> {
    if image.trim().is_empty() {
        return Err(SearchError::input("missing image payload"));
    }

    let stripped = DATA_URI_PREFIX.replace(image, "");
    BASE64
        .decode(stripped.as_bytes())
        .map_err(|e| SearchError::input(format!("image is not valid base64: {}", e)))
}
