//! Process command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::GjenlydError;
use crate::transcript::{parse_input, Transcript};
use anyhow::Result;

/// Run the process command: fetch the transcript, chunk and index it.
pub async fn run_process(input: &str, settings: Settings) -> Result<()> {
    let (source, document_id) = parse_input(input).ok_or_else(|| {
        GjenlydError::InvalidInput(format!("could not resolve transcript source: {}", input))
    })?;

    let engine = super::build_engine(&settings)?;

    let spinner = Output::spinner("Fetching transcript...");
    let fetched = source.fetch(input).await;
    spinner.finish_and_clear();
    let fetched = fetched?;

    Output::kv("document", &document_id);
    Output::kv("language", &fetched.language);

    let transcript = if fetched.segments.is_empty() {
        Transcript::from_text(document_id.clone(), fetched.language, fetched.text)
    } else {
        Transcript::new(document_id.clone(), fetched.language, fetched.segments)
    };

    let spinner = Output::spinner("Chunking and indexing...");
    let result = engine.process_transcript(transcript).await;
    spinner.finish_and_clear();

    match result {
        Ok(state) => {
            let chunks = engine.chunk_count(&document_id).unwrap_or(0);
            Output::success(&format!(
                "Document {} is {} ({} chunks indexed)",
                document_id, state, chunks
            ));
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Processing failed: {}", e));
            Err(e.into())
        }
    }
}
