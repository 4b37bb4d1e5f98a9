//! CLI command implementations.

mod ask;
mod init;
mod invalidate;
mod process;

pub use ask::run_ask;
pub use init::run_init;
pub use invalidate::run_invalidate;
pub use process::run_process;

use crate::cache::CacheManager;
use crate::config::Settings;
use crate::embedding::OpenAIEmbedder;
use crate::engine::Engine;
use crate::error::Result;
use std::sync::Arc;

/// Wire an engine from settings: durable cache plus the configured embedder.
pub(crate) fn build_engine(settings: &Settings) -> Result<Engine> {
    let cache = Arc::new(CacheManager::new(settings)?);
    let embedder = Arc::new(OpenAIEmbedder::with_config(
        &settings.embedding.model,
        settings.embedding.dimensions as usize,
    ));

    Ok(Engine::new(settings.clone(), embedder, cache))
}
