//! Processing engine for Gjenlyd.
//!
//! Drives each document through an explicit state machine
//! (`Pending -> Chunking -> Indexing -> Ready`, with a terminal `Failed`)
//! and exposes the query entry point. Documents process independently and
//! concurrently; the cache is the only shared resource between them.

use crate::cache::{CacheManager, CacheNamespace};
use crate::chunking::chunk_transcript;
use crate::config::Settings;
use crate::embedding::Embedder;
use crate::error::{GjenlydError, Result};
use crate::index::{HybridIndex, QueryResult};
use crate::transcript::{content_hash, Transcript};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Processing state of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentState {
    Pending,
    Chunking,
    Indexing,
    Ready,
    Failed(String),
}

impl std::fmt::Display for DocumentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentState::Pending => write!(f, "pending"),
            DocumentState::Chunking => write!(f, "chunking"),
            DocumentState::Indexing => write!(f, "indexing"),
            DocumentState::Ready => write!(f, "ready"),
            DocumentState::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// One processed transcript, owned by the engine for its lifetime.
#[derive(Debug, Clone)]
pub struct Document {
    /// Stable identifier, derived from the source URL or content hash.
    pub id: String,
    /// Detected or declared language code.
    pub language: String,
    /// Content fingerprint taken when the document reached `Ready`.
    pub fingerprint: String,
    /// When processing completed.
    pub created_at: DateTime<Utc>,
}

/// Per-document pipeline state.
///
/// `process_lock` keeps one document's transitions strictly sequential;
/// `inner` stays readable so `query` can report the current state.
struct DocumentSlot {
    process_lock: Mutex<()>,
    inner: RwLock<SlotInner>,
}

struct SlotInner {
    state: DocumentState,
    document: Option<Document>,
    index: Option<Arc<HybridIndex>>,
}

impl DocumentSlot {
    fn new() -> Self {
        Self {
            process_lock: Mutex::new(()),
            inner: RwLock::new(SlotInner {
                state: DocumentState::Pending,
                document: None,
                index: None,
            }),
        }
    }

    fn state(&self) -> DocumentState {
        self.inner.read().unwrap().state.clone()
    }

    fn set_state(&self, state: DocumentState) {
        self.inner.write().unwrap().state = state;
    }
}

/// The engine coordinating chunking, indexing and retrieval per document.
pub struct Engine {
    settings: Settings,
    embedder: Arc<dyn Embedder>,
    cache: Arc<CacheManager>,
    documents: RwLock<HashMap<String, Arc<DocumentSlot>>>,
}

impl Engine {
    /// Create an engine with the given collaborators.
    pub fn new(settings: Settings, embedder: Arc<dyn Embedder>, cache: Arc<CacheManager>) -> Self {
        Self {
            settings,
            embedder,
            cache,
            documents: RwLock::new(HashMap::new()),
        }
    }

    /// The settings this engine runs with.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Current state of a document, if the engine has seen it.
    pub fn state(&self, document_id: &str) -> Option<DocumentState> {
        let docs = self.documents.read().unwrap();
        docs.get(document_id).map(|slot| slot.state())
    }

    /// The document record, available once processing reached `Ready`.
    pub fn document(&self, document_id: &str) -> Option<Document> {
        let docs = self.documents.read().unwrap();
        docs.get(document_id)
            .and_then(|slot| slot.inner.read().unwrap().document.clone())
    }

    /// Number of indexed chunks, available once processing reached `Ready`.
    pub fn chunk_count(&self, document_id: &str) -> Option<usize> {
        let docs = self.documents.read().unwrap();
        docs.get(document_id)
            .and_then(|slot| slot.inner.read().unwrap().index.as_ref().map(|i| i.len()))
    }

    /// Process raw transcript text for a document.
    pub async fn process(&self, document_id: &str, text: &str, language: &str) -> Result<DocumentState> {
        let transcript = Transcript::from_text(
            document_id.to_string(),
            language.to_string(),
            text.to_string(),
        );
        self.process_transcript(transcript).await
    }

    /// Process a transcript, with timing metadata when available.
    pub async fn process_transcript(&self, transcript: Transcript) -> Result<DocumentState> {
        self.process_with_cancel(transcript, &CancellationToken::new())
            .await
    }

    /// Process a transcript under a cancellation token.
    ///
    /// Cancellation is cooperative, checked between pipeline steps and
    /// between per-chunk embeddings; a cancelled run lands in
    /// `Failed(cancelled)`, never an indeterminate state.
    #[instrument(skip(self, transcript, cancel), fields(document_id = %transcript.document_id))]
    pub async fn process_with_cancel(
        &self,
        transcript: Transcript,
        cancel: &CancellationToken,
    ) -> Result<DocumentState> {
        let document_id = transcript.document_id.clone();
        let slot = self.slot(&document_id);

        // one build at a time per document; other documents are unaffected
        let _guard = slot.process_lock.lock().await;

        let fingerprint = content_hash(&transcript.full_text);

        {
            let inner = slot.inner.read().unwrap();
            if inner.state == DocumentState::Ready
                && inner.document.as_ref().map(|d| d.fingerprint.as_str())
                    == Some(fingerprint.as_str())
            {
                info!("Document {} already indexed with identical content", document_id);
                return Ok(DocumentState::Ready);
            }
        }

        // re-processing: drop this document's stale artifacts before rebuilding
        self.cache
            .invalidate(CacheNamespace::Transcript, &document_id)
            .await?;
        self.cache
            .invalidate_prefix(&format!("{}:", document_id))
            .await?;

        slot.set_state(DocumentState::Chunking);
        let chunks = match chunk_transcript(&transcript, &self.settings.chunking) {
            Ok(chunks) => chunks,
            Err(e) => {
                slot.set_state(DocumentState::Failed(e.to_string()));
                return Err(e);
            }
        };
        info!("Chunked {} into {} chunks", document_id, chunks.len());

        if cancel.is_cancelled() {
            slot.set_state(DocumentState::Failed("cancelled".to_string()));
            return Err(GjenlydError::Cancelled);
        }

        // keep the transcript around so the document can be rebuilt without
        // another source fetch
        let ttl = Duration::from_secs(self.settings.cache.ttl_embedding_seconds);
        if let Err(e) = self.store_transcript(&transcript, ttl).await {
            warn!("Failed to cache transcript for {}: {}", document_id, e);
        }

        slot.set_state(DocumentState::Indexing);
        let index = match HybridIndex::build(
            &document_id,
            chunks,
            Arc::clone(&self.embedder),
            Arc::clone(&self.cache),
            &self.settings,
            cancel,
        )
        .await
        {
            Ok(index) => index,
            Err(GjenlydError::Cancelled) => {
                slot.set_state(DocumentState::Failed("cancelled".to_string()));
                return Err(GjenlydError::Cancelled);
            }
            Err(e) => {
                slot.set_state(DocumentState::Failed(e.to_string()));
                return Err(e);
            }
        };

        {
            let mut inner = slot.inner.write().unwrap();
            inner.document = Some(Document {
                id: document_id.clone(),
                language: transcript.language.clone(),
                fingerprint,
                created_at: Utc::now(),
            });
            inner.index = Some(Arc::new(index));
            inner.state = DocumentState::Ready;
        }

        info!("Document {} is ready for queries", document_id);
        Ok(DocumentState::Ready)
    }

    /// Rebuild a document from its cached transcript.
    ///
    /// Fails with `TranscriptUnavailable` when no cached transcript exists
    /// (expired, invalidated, or never processed here).
    #[instrument(skip(self))]
    pub async fn reprocess(&self, document_id: &str) -> Result<DocumentState> {
        let bytes = self
            .cache
            .get(CacheNamespace::Transcript, document_id)
            .await?
            .ok_or_else(|| {
                GjenlydError::TranscriptUnavailable(format!(
                    "no cached transcript for '{}'",
                    document_id
                ))
            })?;

        let transcript: Transcript = serde_json::from_slice(&bytes)?;
        self.process_transcript(transcript).await
    }

    /// Query a document. Valid only once the document is `Ready`; earlier
    /// states fail with `NotReady` carrying the observed state.
    #[instrument(skip(self), fields(document_id = %document_id))]
    pub async fn query(
        &self,
        document_id: &str,
        query_text: &str,
        top_k: usize,
        weight: Option<f32>,
    ) -> Result<QueryResult> {
        let slot = {
            let docs = self.documents.read().unwrap();
            docs.get(document_id).cloned()
        }
        .ok_or_else(|| GjenlydError::IndexNotFound(document_id.to_string()))?;

        let index = {
            let inner = slot.inner.read().unwrap();
            match &inner.state {
                DocumentState::Ready => inner
                    .index
                    .clone()
                    .ok_or_else(|| GjenlydError::IndexNotFound(document_id.to_string()))?,
                state => {
                    return Err(GjenlydError::NotReady {
                        state: state.clone(),
                    })
                }
            }
        };

        index.query(query_text, top_k, weight).await
    }

    /// Drop a document and every cache artifact scoped to it.
    ///
    /// Content-addressed embeddings are left to their TTL; they are shared
    /// across documents and re-keyed lookups stay correct.
    #[instrument(skip(self))]
    pub async fn invalidate(&self, document_id: &str) -> Result<()> {
        {
            let mut docs = self.documents.write().unwrap();
            docs.remove(document_id);
        }
        self.cache
            .invalidate(CacheNamespace::Transcript, document_id)
            .await?;
        self.cache
            .invalidate_prefix(&format!("{}:", document_id))
            .await?;

        info!("Invalidated document {}", document_id);
        Ok(())
    }

    fn slot(&self, document_id: &str) -> Arc<DocumentSlot> {
        let mut docs = self.documents.write().unwrap();
        docs.entry(document_id.to_string())
            .or_insert_with(|| Arc::new(DocumentSlot::new()))
            .clone()
    }

    async fn store_transcript(&self, transcript: &Transcript, ttl: Duration) -> Result<()> {
        let bytes = serde_json::to_vec(transcript)?;
        self.cache
            .put(
                CacheNamespace::Transcript,
                &transcript.document_id,
                bytes,
                ttl,
            )
            .await
    }

    #[cfg(test)]
    fn set_state_for_test(&self, document_id: &str, state: DocumentState) {
        self.slot(document_id).set_state(state);
    }
}
