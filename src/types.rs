use serde::{Deserialize, Serialize};

/// Default number of distinct identities returned by a search
pub const DEFAULT_TOP_K: usize = 3;

/// Default distance threshold applied when the request does not supply one
pub const DEFAULT_THRESHOLD: f32 = 0.4;

/// A face embedding: fixed-dimension float vector produced by the external
/// extractor. The dimension is set by the deployment (512 for Facenet512)
/// and enforced by the vector store, not validated locally.
pub type Embedding = Vec<f32>;

/// Raw, unranked nearest-neighbor record returned by the vector store.
///
/// `distance` is a dissimilarity metric: 0 means identical, larger means
/// less similar. It is not guaranteed to stay within [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Deduplication key grouping embeddings of the same person
    pub identity: String,
    /// Dissimilarity between the query embedding and this record
    pub distance: f32,
}

impl Candidate {
    pub fn new(identity: impl Into<String>, distance: f32) -> Self {
        Self {
            identity: identity.into(),
            distance,
        }
    }
}

/// A ranked identity match derived from the best candidate per identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceMatch {
    /// Matched identity (person name/ID)
    pub identity: String,
    /// Lowest distance seen for this identity
    pub distance: f32,
    /// Derived score: `(1 - distance) * 100`, deliberately not clamped
    pub confidence: f32,
}

impl FaceMatch {
    /// Build a match from a surviving per-identity best candidate
    pub fn from_candidate(candidate: Candidate) -> Self {
        let confidence = (1.0 - candidate.distance) * 100.0;
        Self {
            identity: candidate.identity,
            distance: candidate.distance,
            confidence,
        }
    }
}

/// Final result of one search request. Created fresh per request; its
/// lifetime is the HTTP response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// Whether any identity survived thresholding and deduplication
    pub found: bool,
    /// Exactly `matches[0]` when non-empty, otherwise `null`
    pub top_match: Option<FaceMatch>,
    /// Deduplicated matches, sorted by distance ascending, at most `top_k`
    pub matches: Vec<FaceMatch>,
    /// Wall-clock time spent serving the search, in milliseconds
    pub search_time_ms: u64,
    /// 1 when a face was processed (even if nothing matched), 0 when the
    /// extractor found no face
    pub faces_detected: u8,
}

impl SearchResult {
    /// Result for the upstream "no detectable face" signal. Not an error:
    /// the request succeeded, there was just nothing to search for.
    pub fn no_face() -> Self {
        Self {
            found: false,
            top_match: None,
            matches: Vec::new(),
            search_time_ms: 0,
            faces_detected: 0,
        }
    }
}

/// Incoming search request body (`POST /search` at the enclosing HTTP layer)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    /// Base64-encoded image, optionally carrying a `data:` URI prefix
    pub image: String,
    /// Maximum number of distinct identities to return (default 3)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,
    /// Distance cutoff; candidates above it are discarded (default 0.4)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f32>,
}

/// One identity with its embedding count (`GET /people`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonCount {
    pub identity: String,
    pub count: usize,
}

/// Corpus-wide totals (`GET /stats`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorpusStats {
    /// Total number of stored embeddings across all identities
    pub total_embeddings: usize,
    /// Number of distinct identities in the corpus
    pub total_identities: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_match_from_candidate() {
        let m = FaceMatch::from_candidate(Candidate::new("Derrick Lim", 0.05));
        assert_eq!(m.identity, "Derrick Lim");
        assert_eq!(m.distance, 0.05);
        assert!((m.confidence - 95.0).abs() < 1e-4);
    }

    #[test]
    fn test_confidence_not_clamped() {
        // The unclamped derivation is kept as observed; distances outside
        // [0, 1] produce confidences outside [0, 100].
        let above = FaceMatch::from_candidate(Candidate::new("a", 1.5));
        assert!((above.confidence - (-50.0)).abs() < 1e-4);

        let below = FaceMatch::from_candidate(Candidate::new("b", -0.2));
        assert!((below.confidence - 120.0).abs() < 1e-4);
    }

    #[test]
    fn test_search_result_wire_field_names() {
        let result = SearchResult {
            found: true,
            top_match: Some(FaceMatch::from_candidate(Candidate::new("A", 0.1))),
            matches: vec![FaceMatch::from_candidate(Candidate::new("A", 0.1))],
            search_time_ms: 42,
            faces_detected: 1,
        };

        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"topMatch\""));
        assert!(json.contains("\"searchTimeMs\""));
        assert!(json.contains("\"facesDetected\""));
        assert!(json.contains("\"matches\""));

        let roundtrip: SearchResult = serde_json::from_str(&json).unwrap();
        assert_eq!(roundtrip, result);
    }

    #[test]
    fn test_no_face_result_shape() {
        let result = SearchResult::no_face();
        assert!(!result.found);
        assert!(result.top_match.is_none());
        assert!(result.matches.is_empty());
        assert_eq!(result.faces_detected, 0);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["topMatch"], serde_json::Value::Null);
        assert_eq!(json["facesDetected"], 0);
    }

    #[test]
    fn test_search_request_optional_fields() {
        // Both knobs optional; missing means "use the boundary defaults"
        let request: SearchRequest =
            serde_json::from_str(r#"{"image": "aGVsbG8="}"#).unwrap();
        assert_eq!(request.image, "aGVsbG8=");
        assert_eq!(request.top_k, None);
        assert_eq!(request.threshold, None);

        let request: SearchRequest =
            serde_json::from_str(r#"{"image": "aGVsbG8=", "topK": 5, "threshold": 0.3}"#)
                .unwrap();
        assert_eq!(request.top_k, Some(5));
        assert_eq!(request.threshold, Some(0.3));
    }

    #[test]
    fn test_corpus_stats_serialization() {
        let stats = CorpusStats {
            total_embeddings: 150,
            total_identities: 3,
        };

        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"totalEmbeddings\":150"));
        assert!(json.contains("\"totalIdentities\":3"));

        let roundtrip: CorpusStats = serde_json::from_str(&json).unwrap();
        assert_eq!(roundtrip, stats);
    }

    #[test]
    fn test_person_count_serialization() {
        let person = PersonCount {
            identity: "Ewan Wormald".to_string(),
            count: 48,
        };

        let json = serde_json::to_string(&person).unwrap();
        let roundtrip: PersonCount = serde_json::from_str(&json).unwrap();
        assert_eq!(roundtrip, person);
    }
}
