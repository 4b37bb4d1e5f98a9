//! Hybrid retrieval index for Gjenlyd.
//!
//! One [`HybridIndex`] covers one document: a dense vector side fed by the
//! embedding collaborator (memoized through the cache) and a sparse lexical
//! side rebuilt in-process. Queries run both rankings over the full chunk
//! set and fuse them into a single deterministic ordering.

pub mod lexical;
mod scoring;

pub use scoring::{cosine_similarity, fuse, min_max_normalize};

use crate::cache::{CacheManager, CacheNamespace};
use crate::chunking::Chunk;
use crate::config::Settings;
use crate::embedding::Embedder;
use crate::error::{GjenlydError, Result};
use crate::transcript::content_hash;
use lexical::{tokenize, Posting};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

/// One chunk paired with its dense and sparse representations.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
    pub posting: Posting,
}

/// A ranked chunk with its fused score and optional neighbor context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    /// Fused score in [0, 1]; higher is better.
    pub score: f32,
    /// Text of the preceding chunk, present only with context expansion.
    pub context_before: Option<String>,
    /// Text of the following chunk, present only with context expansion.
    pub context_after: Option<String>,
}

/// Ordered result of one hybrid query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub document_id: String,
    pub chunks: Vec<ScoredChunk>,
}

/// Hybrid dense + lexical index over one document's chunks.
///
/// Construction is atomic: either every chunk gets an entry or the build
/// fails and nothing queryable remains.
pub struct HybridIndex {
    document_id: String,
    entries: Vec<IndexEntry>,
    embedder: Arc<dyn Embedder>,
    cache: Arc<CacheManager>,
    fusion_weight: f32,
    context_expansion: bool,
    ttl_query: Duration,
}

impl std::fmt::Debug for HybridIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridIndex")
            .field("document_id", &self.document_id)
            .field("entries", &self.entries.len())
            .field("fusion_weight", &self.fusion_weight)
            .field("context_expansion", &self.context_expansion)
            .field("ttl_query", &self.ttl_query)
            .finish_non_exhaustive()
    }
}

impl HybridIndex {
    /// Build an index over the chunk sequence of one document.
    ///
    /// Embeddings are memoized through the cache keyed by model id plus the
    /// content hash of the chunk text, so one distinct text embeds at most
    /// once per TTL window, across documents and concurrent builds.
    #[instrument(skip_all, fields(document_id = %document_id, chunks = chunks.len()))]
    pub async fn build(
        document_id: &str,
        chunks: Vec<Chunk>,
        embedder: Arc<dyn Embedder>,
        cache: Arc<CacheManager>,
        settings: &Settings,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        if chunks.is_empty() {
            return Err(GjenlydError::IndexBuild(format!(
                "document {} produced no chunks",
                document_id
            )));
        }

        let ttl_embedding = Duration::from_secs(settings.cache.ttl_embedding_seconds);
        let mut entries = Vec::with_capacity(chunks.len());

        for chunk in chunks {
            if cancel.is_cancelled() {
                return Err(GjenlydError::Cancelled);
            }

            let embedding =
                embed_cached(&*embedder, &cache, &chunk.text, ttl_embedding).await?;
            let posting = Posting::build(&chunk.text);

            entries.push(IndexEntry {
                chunk,
                embedding,
                posting,
            });
        }

        info!("Built hybrid index with {} entries", entries.len());

        Ok(Self {
            document_id: document_id.to_string(),
            entries,
            embedder,
            cache,
            fusion_weight: settings.retrieval.fusion_weight,
            context_expansion: settings.retrieval.context_expansion,
            ttl_query: Duration::from_secs(settings.cache.ttl_query_seconds),
        })
    }

    /// The document this index covers.
    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no chunks (never true for a built index).
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run a hybrid query and return the `top_k` best chunks.
    ///
    /// `weight` overrides the configured dense/lexical split for this query.
    /// Results are cached per (document, query, top_k, weight) with the
    /// query TTL; repeat queries against an unchanged index return the
    /// identical ordering.
    #[instrument(skip(self), fields(document_id = %self.document_id))]
    pub async fn query(
        &self,
        query_text: &str,
        top_k: usize,
        weight: Option<f32>,
    ) -> Result<QueryResult> {
        if query_text.trim().is_empty() {
            return Err(GjenlydError::InvalidQuery(
                "query text is empty".to_string(),
            ));
        }

        let weight = weight.unwrap_or(self.fusion_weight).clamp(0.0, 1.0);
        let result_key = format!(
            "{}:{}:{}:{}",
            self.document_id,
            content_hash(query_text),
            top_k,
            weight.to_bits()
        );

        if let Some(bytes) = self.cache.get(CacheNamespace::Query, &result_key).await? {
            match serde_json::from_slice::<QueryResult>(&bytes) {
                Ok(result) => {
                    debug!("Query served from cache");
                    return Ok(result);
                }
                Err(e) => debug!("Discarding undecodable cached query result: {}", e),
            }
        }

        let query_embedding =
            embed_cached(&*self.embedder, &self.cache, query_text, self.ttl_query).await?;
        let query_terms = tokenize(query_text);

        // full rankings over the chunk set, each on its own scale
        let dense: Vec<f32> = self
            .entries
            .iter()
            .map(|e| cosine_similarity(&query_embedding, &e.embedding))
            .collect();
        let lexical: Vec<f32> = self
            .entries
            .iter()
            .map(|e| e.posting.score(&query_terms))
            .collect();

        let dense_norm = min_max_normalize(&dense);
        let lexical_norm = min_max_normalize(&lexical);

        let mut ranked: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, _)| (i, fuse(dense_norm[i], lexical_norm[i], weight)))
            .collect();

        // ties go to the earlier chunk so repeat queries are reproducible
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        ranked.truncate(top_k.min(self.entries.len()));

        let chunks: Vec<ScoredChunk> = ranked
            .into_iter()
            .map(|(i, score)| self.scored_chunk(i, score))
            .collect();

        let result = QueryResult {
            document_id: self.document_id.clone(),
            chunks,
        };

        let bytes = serde_json::to_vec(&result)?;
        self.cache
            .put(CacheNamespace::Query, &result_key, bytes, self.ttl_query)
            .await?;

        Ok(result)
    }

    /// Attach neighbor text after ranking; expansion never moves scores.
    fn scored_chunk(&self, i: usize, score: f32) -> ScoredChunk {
        let (context_before, context_after) = if self.context_expansion {
            let before = i
                .checked_sub(1)
                .and_then(|p| self.entries.get(p))
                .map(|e| e.chunk.text.clone());
            let after = self.entries.get(i + 1).map(|e| e.chunk.text.clone());
            (before, after)
        } else {
            (None, None)
        };

        ScoredChunk {
            chunk: self.entries[i].chunk.clone(),
            score,
            context_before,
            context_after,
        }
    }
}

/// Fetch an embedding through the cache, computing it at most once per
/// distinct text while the record lives.
async fn embed_cached(
    embedder: &dyn Embedder,
    cache: &CacheManager,
    text: &str,
    ttl: Duration,
) -> Result<Vec<f32>> {
    let key = format!("{}:{}", embedder.model_id(), content_hash(text));

    let bytes = cache
        .get_or_compute(CacheNamespace::Embedding, &key, ttl, || async {
            let embedding = embedder.embed(text).await?;
            Ok(embedding_to_bytes(&embedding))
        })
        .await?;

    Ok(bytes_to_embedding(&bytes))
}

/// Serialize an embedding to little-endian bytes.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Deserialize an embedding from little-endian bytes.
fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| {
            let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
            f32::from_le_bytes(arr)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::testing::StubEmbedder;
    use async_trait::async_trait;

    fn make_chunk(sequence: usize, text: &str) -> Chunk {
        Chunk {
            id: content_hash(&format!("test-doc:{}:{}", sequence, text)),
            sequence,
            text: text.to_string(),
            start_char: 0,
            end_char: text.len(),
            start_seconds: sequence as f64 * 10.0,
            end_seconds: (sequence + 1) as f64 * 10.0,
            token_estimate: text.len() / 4,
            oversized: false,
        }
    }

    fn star_chunks() -> Vec<Chunk> {
        vec![
            make_chunk(0, "The sun is a star."),
            make_chunk(1, "It is very hot."),
            make_chunk(2, "Stars produce light through fusion."),
        ]
    }

    async fn build_index(
        chunks: Vec<Chunk>,
        embedder: Arc<StubEmbedder>,
        cache: Arc<CacheManager>,
        settings: &Settings,
    ) -> HybridIndex {
        HybridIndex::build(
            "test-doc",
            chunks,
            embedder,
            cache,
            settings,
            &CancellationToken::new(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_build_rejects_empty_chunk_sequence() {
        let err = HybridIndex::build(
            "empty-doc",
            Vec::new(),
            Arc::new(StubEmbedder::new()),
            Arc::new(CacheManager::in_memory().unwrap()),
            &Settings::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, GjenlydError::IndexBuild(_)));
    }

    #[tokio::test]
    async fn test_rebuild_reuses_cached_embeddings() {
        let embedder = Arc::new(StubEmbedder::new());
        let cache = Arc::new(CacheManager::in_memory().unwrap());
        let settings = Settings::default();

        build_index(star_chunks(), Arc::clone(&embedder), Arc::clone(&cache), &settings).await;
        assert_eq!(embedder.calls(), 3);

        // identical chunk texts: every embedding comes from the cache
        build_index(star_chunks(), Arc::clone(&embedder), Arc::clone(&cache), &settings).await;
        assert_eq!(embedder.calls(), 3);
    }

    #[tokio::test]
    async fn test_failed_build_leaves_no_index() {
        struct FailingEmbedder;

        #[async_trait]
        impl Embedder for FailingEmbedder {
            async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
                Err(GjenlydError::EmbeddingUnavailable("model offline".to_string()))
            }
            async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
                Err(GjenlydError::EmbeddingUnavailable("model offline".to_string()))
            }
            fn dimensions(&self) -> usize {
                32
            }
            fn model_id(&self) -> &str {
                "failing-embedder"
            }
        }

        let result = HybridIndex::build(
            "doomed-doc",
            star_chunks(),
            Arc::new(FailingEmbedder),
            Arc::new(CacheManager::in_memory().unwrap()),
            &Settings::default(),
            &CancellationToken::new(),
        )
        .await;

        assert!(matches!(result, Err(GjenlydError::EmbeddingUnavailable(_))));
    }

    #[tokio::test]
    async fn test_cancelled_build_fails_fast() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = HybridIndex::build(
            "cancelled-doc",
            star_chunks(),
            Arc::new(StubEmbedder::new()),
            Arc::new(CacheManager::in_memory().unwrap()),
            &Settings::default(),
            &cancel,
        )
        .await;

        assert!(matches!(result, Err(GjenlydError::Cancelled)));
    }

    #[tokio::test]
    async fn test_empty_query_is_invalid() {
        let index = build_index(
            star_chunks(),
            Arc::new(StubEmbedder::new()),
            Arc::new(CacheManager::in_memory().unwrap()),
            &Settings::default(),
        )
        .await;

        let err = index.query("   ", 5, None).await.unwrap_err();
        assert!(matches!(err, GjenlydError::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn test_fusion_question_ranks_fusion_chunk_first() {
        let index = build_index(
            star_chunks(),
            Arc::new(StubEmbedder::new()),
            Arc::new(CacheManager::in_memory().unwrap()),
            &Settings::default(),
        )
        .await;

        let result = index.query("why do stars shine", 3, None).await.unwrap();
        assert_eq!(result.chunks.len(), 3);
        assert!(result.chunks[0].chunk.text.contains("fusion"));
    }

    #[tokio::test]
    async fn test_top_k_capped_at_chunk_count() {
        let index = build_index(
            star_chunks(),
            Arc::new(StubEmbedder::new()),
            Arc::new(CacheManager::in_memory().unwrap()),
            &Settings::default(),
        )
        .await;

        let result = index.query("stars", 10, None).await.unwrap();
        assert_eq!(result.chunks.len(), 3);
    }

    #[tokio::test]
    async fn test_repeat_queries_are_identical() {
        let index = build_index(
            star_chunks(),
            Arc::new(StubEmbedder::new()),
            Arc::new(CacheManager::in_memory().unwrap()),
            &Settings::default(),
        )
        .await;

        let a = index.query("what is the sun", 3, None).await.unwrap();
        let b = index.query("what is the sun", 3, None).await.unwrap();

        assert_eq!(a.chunks.len(), b.chunks.len());
        for (x, y) in a.chunks.iter().zip(&b.chunks) {
            assert_eq!(x.chunk.id, y.chunk.id);
            assert_eq!(x.score, y.score);
        }
    }

    #[tokio::test]
    async fn test_repeat_query_skips_recompute() {
        let embedder = Arc::new(StubEmbedder::new());
        let index = build_index(
            star_chunks(),
            Arc::clone(&embedder),
            Arc::new(CacheManager::in_memory().unwrap()),
            &Settings::default(),
        )
        .await;

        index.query("what is the sun", 3, None).await.unwrap();
        let calls_after_first = embedder.calls();

        index.query("what is the sun", 3, None).await.unwrap();
        assert_eq!(embedder.calls(), calls_after_first);
    }

    #[tokio::test]
    async fn test_weight_extremes_select_each_signal() {
        let index = build_index(
            star_chunks(),
            Arc::new(StubEmbedder::new()),
            Arc::new(CacheManager::in_memory().unwrap()),
            &Settings::default(),
        )
        .await;

        // pure lexical: only the exact word "hot" appears in chunk 1
        let lexical_only = index.query("hot", 1, Some(0.0)).await.unwrap();
        assert!(lexical_only.chunks[0].chunk.text.contains("hot"));

        // pure dense still returns a full ranking
        let dense_only = index.query("hot", 3, Some(1.0)).await.unwrap();
        assert_eq!(dense_only.chunks.len(), 3);
    }

    #[tokio::test]
    async fn test_context_expansion_attaches_neighbors() {
        let mut settings = Settings::default();
        settings.retrieval.context_expansion = true;

        let index = build_index(
            star_chunks(),
            Arc::new(StubEmbedder::new()),
            Arc::new(CacheManager::in_memory().unwrap()),
            &settings,
        )
        .await;

        let result = index.query("why do stars shine", 1, None).await.unwrap();
        let top = &result.chunks[0];
        assert!(top.chunk.text.contains("fusion"));
        // the fusion chunk is last, so it has a predecessor and no successor
        assert_eq!(top.context_before.as_deref(), Some("It is very hot."));
        assert!(top.context_after.is_none());
    }

    #[test]
    fn test_embedding_byte_roundtrip() {
        let embedding = vec![0.25f32, -1.5, 3.75, 0.0];
        let bytes = embedding_to_bytes(&embedding);
        assert_eq!(bytes_to_embedding(&bytes), embedding);
    }
}
