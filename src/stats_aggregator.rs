use std::collections::HashMap;

use crate::errors::FaceSearchResult;
use crate::types::{CorpusStats, PersonCount};
use crate::vector_store_client::VectorStoreClient;

/// How many raw records to pull per page when walking the corpus
const DEFAULT_PAGE_SIZE: usize = 100;

/// Corpus-wide counting over the raw embedding store
///
/// Pages through every stored embedding (no threshold, no per-identity
/// best-of) and groups by identity. Read-only; carries no ranking semantics.
#[derive(Debug, Clone)]
pub struct StatsAggregator {
    store: VectorStoreClient,
    page_size: usize,
}

impl StatsAggregator {
    pub fn new(store: VectorStoreClient) -> Self {
        Self {
            store,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Override the corpus page size (mainly for tests and small stores)
    pub fn with_page_size(store: VectorStoreClient, page_size: usize) -> Self {
        Self { store, page_size }
    }

    /// Total embeddings and distinct identities across the whole corpus
    pub async fn count_all(&self) -> FaceSearchResult<CorpusStats> {
        let counts = self.collect_counts().await?;
        let total_embeddings = counts.values().sum();
        let stats = CorpusStats {
            total_embeddings,
            total_identities: counts.len(),
        };
        log::debug!(
            "corpus stats: {} embeddings across {} identities",
            stats.total_embeddings,
            stats.total_identities
        );
        Ok(stats)
    }

    /// Per-identity embedding counts, highest first, truncated to `limit`
    pub async fn list_identities(&self, limit: usize) -> FaceSearchResult<Vec<PersonCount>> {
        let counts = self.collect_counts().await?;
        let mut people = sorted_counts(counts);
        people.truncate(limit);
        Ok(people)
    }

    /// Walk the corpus page by page and group identities
    async fn collect_counts(&self) -> FaceSearchResult<HashMap<String, usize>> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        let mut offset = 0;

        loop {
            let page = self.store.identities_page(self.page_size, offset).await?;
            let page_len = page.len();
            group_counts(&mut counts, page);

            // A short page means the corpus is exhausted
            if page_len < self.page_size {
                break;
            }
            offset += page_len;
        }

        Ok(counts)
    }
}

/// Fold one page of raw identity values into the running counts
fn group_counts(counts: &mut HashMap<String, usize>, identities: Vec<String>) {
    for identity in identities {
        *counts.entry(identity).or_insert(0) += 1;
    }
}

/// Deterministic ordering: count descending, identity ascending on ties
fn sorted_counts(counts: HashMap<String, usize>) -> Vec<PersonCount> {
    let mut people: Vec<PersonCount> = counts
        .into_iter()
        .map(|(identity, count)| PersonCount { identity, count })
        .collect();

    people.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.identity.cmp(&b.identity))
    });
    people
}
