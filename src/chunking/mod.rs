//! Transcript chunking for Gjenlyd.
//!
//! Splits transcripts into overlapping, boundary-aware segments that carry
//! their position and time range within the source document.

mod splitter;

pub use splitter::{split_spans, Span};

use crate::config::ChunkingSettings;
use crate::error::Result;
use crate::transcript::{content_hash, Transcript};
use serde::{Deserialize, Serialize};

/// A chunk of transcript text.
///
/// Chunks are immutable once created; `sequence` defines document order and
/// is what neighbor expansion walks at query time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Deterministic identifier: hash of document id, sequence and text.
    pub id: String,
    /// Position of this chunk within its document.
    pub sequence: usize,
    /// Text content of this chunk.
    pub text: String,
    /// Byte offset of the chunk start within the full transcript text.
    pub start_char: usize,
    /// Byte offset one past the chunk end.
    pub end_char: usize,
    /// Start time in seconds (0.0 when the transcript has no timing).
    pub start_seconds: f64,
    /// End time in seconds (0.0 when the transcript has no timing).
    pub end_seconds: f64,
    /// Rough token count, used for budgeting downstream prompts.
    pub token_estimate: usize,
    /// Set when a single sentence exceeded the target size and was kept whole.
    pub oversized: bool,
}

impl Chunk {
    /// Create a chunk from a span of the transcript.
    fn from_span(transcript: &Transcript, sequence: usize, span: &Span) -> Self {
        let text = transcript.full_text[span.start..span.end].to_string();
        let (start_seconds, end_seconds) = transcript.time_range(span.start, span.end);
        let id = content_hash(&format!(
            "{}:{}:{}",
            transcript.document_id, sequence, text
        ));
        let token_estimate = text.chars().count().div_ceil(4);

        Self {
            id,
            sequence,
            text,
            start_char: span.start,
            end_char: span.end,
            start_seconds,
            end_seconds,
            token_estimate,
            oversized: span.oversized,
        }
    }

    /// Format the chunk's start time for display.
    pub fn format_timestamp(&self) -> String {
        let total_seconds = self.start_seconds as u32;
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let secs = total_seconds % 60;

        if hours > 0 {
            format!("{:02}:{:02}:{:02}", hours, minutes, secs)
        } else {
            format!("{:02}:{:02}", minutes, secs)
        }
    }
}

/// Split a transcript into ordered, overlapping chunks.
///
/// Pure over its inputs: no cache interaction, chunking is cheap to redo.
pub fn chunk_transcript(transcript: &Transcript, config: &ChunkingSettings) -> Result<Vec<Chunk>> {
    let spans = split_spans(&transcript.full_text, config.target_size, config.overlap)?;

    Ok(spans
        .iter()
        .enumerate()
        .map(|(sequence, span)| Chunk::from_span(transcript, sequence, span))
        .collect())
}
