//! Gjenlyd - Transcript Retrieval and Caching
//!
//! A local-first library and CLI for turning spoken-word transcripts into a
//! queryable knowledge base.
//!
//! The name "Gjenlyd" comes from the Norwegian word for "echo."
//!
//! # Overview
//!
//! Gjenlyd allows you to:
//! - Split transcripts into semantically coherent, overlapping chunks
//! - Build a hybrid (dense vector + sparse lexical) index per document
//! - Answer natural-language queries with fused, deterministic rankings
//! - Avoid repeated embedding calls through a two-tier, TTL-bounded cache
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `transcript` - Transcript types and transcript source abstraction
//! - `chunking` - Boundary-aware transcript chunking
//! - `embedding` - Embedding generation
//! - `cache` - Two-tier content-addressed cache
//! - `index` - Hybrid vector + lexical index with score fusion
//! - `engine` - Per-document processing state machine
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use gjenlyd::cache::CacheManager;
//! use gjenlyd::config::Settings;
//! use gjenlyd::embedding::OpenAIEmbedder;
//! use gjenlyd::engine::Engine;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let cache = Arc::new(CacheManager::new(&settings)?);
//!     let embedder = Arc::new(OpenAIEmbedder::new());
//!     let engine = Engine::new(settings, embedder, cache);
//!
//!     let state = engine
//!         .process("talk-42", "The sun is a star. It is very hot.", "en")
//!         .await?;
//!     println!("document state: {}", state);
//!
//!     let results = engine.query("talk-42", "what is the sun?", 5, None).await?;
//!     for scored in results.chunks {
//!         println!("{:.3} {}", scored.score, scored.chunk.text);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod index;
pub mod transcript;

pub use error::{GjenlydError, Result};
