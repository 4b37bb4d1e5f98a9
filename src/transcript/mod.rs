//! Transcript types and transcript source abstraction for Gjenlyd.
//!
//! Provides a trait-based interface for obtaining transcripts (local files,
//! HTTP endpoints) and the data model the rest of the pipeline consumes.

mod http;
mod local;

pub use http::HttpSource;
pub use local::LocalSource;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A single timed segment of a transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Start time in seconds.
    pub start_seconds: f64,
    /// End time in seconds.
    pub end_seconds: f64,
    /// Segment text.
    pub text: String,
}

impl TranscriptSegment {
    /// Create a new segment.
    pub fn new(start_seconds: f64, end_seconds: f64, text: String) -> Self {
        Self {
            start_seconds,
            end_seconds,
            text,
        }
    }
}

/// A complete transcript for one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    /// Document ID this transcript belongs to.
    pub document_id: String,
    /// Detected or declared language code (e.g. "en").
    pub language: String,
    /// Timed segments; empty when the source carries no timing.
    pub segments: Vec<TranscriptSegment>,
    /// Full transcript text (concatenated segments).
    pub full_text: String,
    /// Total duration in seconds (0.0 when unknown).
    pub duration_seconds: f64,
}

impl Transcript {
    /// Create a transcript from timed segments.
    pub fn new(document_id: String, language: String, segments: Vec<TranscriptSegment>) -> Self {
        let full_text = segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        let duration_seconds = segments.last().map(|s| s.end_seconds).unwrap_or(0.0);

        Self {
            document_id,
            language,
            segments,
            full_text,
            duration_seconds,
        }
    }

    /// Create a transcript from raw text without timing information.
    pub fn from_text(document_id: String, language: String, text: String) -> Self {
        Self {
            document_id,
            language,
            segments: Vec::new(),
            full_text: text,
            duration_seconds: 0.0,
        }
    }

    /// Map a character span of `full_text` onto a time range.
    ///
    /// Segment texts are joined with single spaces in `full_text`, so each
    /// segment occupies a known character range. Returns (0.0, 0.0) when the
    /// transcript has no timing.
    pub fn time_range(&self, start_char: usize, end_char: usize) -> (f64, f64) {
        if self.segments.is_empty() {
            return (0.0, 0.0);
        }

        let mut start_seconds = self.duration_seconds;
        let mut end_seconds = 0.0f64;
        let mut offset = 0usize;

        for segment in &self.segments {
            let seg_start = offset;
            let seg_end = offset + segment.text.len();
            // joined with a single space
            offset = seg_end + 1;

            if seg_end > start_char && seg_start < end_char {
                if segment.start_seconds < start_seconds {
                    start_seconds = segment.start_seconds;
                }
                if segment.end_seconds > end_seconds {
                    end_seconds = segment.end_seconds;
                }
            }
        }

        if end_seconds < start_seconds {
            (0.0, 0.0)
        } else {
            (start_seconds, end_seconds)
        }
    }
}

/// A fetched transcript payload before it is tied to a document.
#[derive(Debug, Clone)]
pub struct FetchedTranscript {
    /// Raw transcript text.
    pub text: String,
    /// Language code, defaulting to "en" when the source does not declare one.
    pub language: String,
    /// Timed segments, when the source format carries them.
    pub segments: Vec<TranscriptSegment>,
}

/// Trait for transcript source providers.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Fetch the transcript behind `input`.
    async fn fetch(&self, input: &str) -> Result<FetchedTranscript>;

    /// Check if this source can handle the given input.
    fn can_handle(&self, input: &str) -> bool;

    /// Derive a stable document ID from the input.
    fn document_id(&self, input: &str) -> Option<String>;
}

/// Detect the appropriate transcript source for the given input.
pub fn detect_source(input: &str) -> Option<Box<dyn TranscriptSource>> {
    let http = HttpSource::new();
    if http.can_handle(input) {
        return Some(Box::new(http));
    }

    let local = LocalSource::new();
    if local.can_handle(input) {
        return Some(Box::new(local));
    }

    None
}

/// Parse input and return the appropriate source and document ID.
pub fn parse_input(input: &str) -> Option<(Box<dyn TranscriptSource>, String)> {
    let source = detect_source(input)?;
    let id = source.document_id(input)?;
    Some((source, id))
}

/// Hex-encoded SHA-256 of a text, used for content-derived identifiers.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_is_stable() {
        let a = content_hash("the same text");
        let b = content_hash("the same text");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, content_hash("different text"));
    }

    #[test]
    fn test_full_text_joins_segments() {
        let transcript = Transcript::new(
            "doc".to_string(),
            "en".to_string(),
            vec![
                TranscriptSegment::new(0.0, 5.0, "Hello there.".to_string()),
                TranscriptSegment::new(5.0, 10.0, "General remarks.".to_string()),
            ],
        );
        assert_eq!(transcript.full_text, "Hello there. General remarks.");
        assert!((transcript.duration_seconds - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_time_range_covers_overlapping_segments() {
        let transcript = Transcript::new(
            "doc".to_string(),
            "en".to_string(),
            vec![
                TranscriptSegment::new(0.0, 5.0, "aaaa".to_string()),
                TranscriptSegment::new(5.0, 10.0, "bbbb".to_string()),
                TranscriptSegment::new(10.0, 15.0, "cccc".to_string()),
            ],
        );
        // span inside the second segment only ("aaaa bbbb cccc")
        let (start, end) = transcript.time_range(5, 9);
        assert!((start - 5.0).abs() < f64::EPSILON);
        assert!((end - 10.0).abs() < f64::EPSILON);

        // span straddling the first two segments
        let (start, end) = transcript.time_range(2, 7);
        assert!((start - 0.0).abs() < f64::EPSILON);
        assert!((end - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_time_range_without_segments() {
        let transcript =
            Transcript::from_text("doc".to_string(), "en".to_string(), "plain".to_string());
        assert_eq!(transcript.time_range(0, 5), (0.0, 0.0));
    }
}
