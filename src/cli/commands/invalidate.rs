//! Invalidate command implementation.

use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Run the invalidate command: drop a document's cached artifacts so the
/// next processing run starts clean.
pub async fn run_invalidate(document_id: &str, settings: Settings) -> Result<()> {
    let engine = super::build_engine(&settings)?;

    engine.invalidate(document_id).await?;
    Output::success(&format!("Invalidated cached artifacts for {}", document_id));

    Ok(())
}
