//! Ask command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::GjenlydError;
use crate::transcript::{parse_input, Transcript};
use anyhow::Result;

/// Run the ask command: ensure the transcript is indexed, then print the
/// chunks a downstream answer generator would consume.
pub async fn run_ask(
    input: &str,
    question: &str,
    top_k: Option<usize>,
    weight: Option<f32>,
    settings: Settings,
) -> Result<()> {
    let (source, document_id) = parse_input(input).ok_or_else(|| {
        GjenlydError::InvalidInput(format!("could not resolve transcript source: {}", input))
    })?;

    let top_k = top_k.unwrap_or(settings.retrieval.top_k_default);
    let engine = super::build_engine(&settings)?;

    let spinner = Output::spinner("Preparing document...");
    let prepared = match engine.reprocess(&document_id).await {
        // a cached transcript spares the source fetch
        Ok(state) => Ok(state),
        Err(GjenlydError::TranscriptUnavailable(_)) => {
            let fetched = source.fetch(input).await?;
            let transcript = if fetched.segments.is_empty() {
                Transcript::from_text(document_id.clone(), fetched.language, fetched.text)
            } else {
                Transcript::new(document_id.clone(), fetched.language, fetched.segments)
            };
            engine.process_transcript(transcript).await
        }
        Err(e) => Err(e),
    };
    spinner.finish_and_clear();
    prepared?;

    let spinner = Output::spinner("Searching...");
    let result = engine.query(&document_id, question, top_k, weight).await;
    spinner.finish_and_clear();

    match result {
        Ok(result) => {
            if result.chunks.is_empty() {
                Output::warning("No chunks matched the question.");
                return Ok(());
            }

            Output::success(&format!(
                "Top {} chunks for: {}",
                result.chunks.len(),
                question
            ));
            for (rank, scored) in result.chunks.iter().enumerate() {
                Output::ranked_chunk(
                    rank + 1,
                    &scored.chunk.format_timestamp(),
                    scored.score,
                    &scored.chunk.text,
                );
            }
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Query failed: {}", e));
            Err(e.into())
        }
    }
}
