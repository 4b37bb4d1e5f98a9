//! Local file transcript source.
//!
//! Reads transcripts from plain-text files or timestamped JSON exports.

use super::{content_hash, FetchedTranscript, TranscriptSegment, TranscriptSource};
use crate::error::{GjenlydError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Transcript source reading local files.
///
/// Plain `.txt` files are taken verbatim; `.json` files are expected to be
/// a timestamped export with `segments` and an optional `language` field.
pub struct LocalSource;

impl LocalSource {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LocalSource {
    fn default() -> Self {
        Self::new()
    }
}

/// JSON transcript export shape.
#[derive(Debug, Deserialize)]
struct TranscriptFile {
    #[serde(default)]
    language: Option<String>,
    segments: Vec<SegmentEntry>,
}

#[derive(Debug, Deserialize)]
struct SegmentEntry {
    start_seconds: f64,
    end_seconds: f64,
    text: String,
}

#[async_trait]
impl TranscriptSource for LocalSource {
    async fn fetch(&self, input: &str) -> Result<FetchedTranscript> {
        let path = Path::new(input);
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            GjenlydError::TranscriptUnavailable(format!("failed to read {}: {}", input, e))
        })?;

        if content.trim().is_empty() {
            return Err(GjenlydError::TranscriptUnavailable(format!(
                "{} is empty",
                input
            )));
        }

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        if is_json {
            let parsed: TranscriptFile = serde_json::from_str(&content).map_err(|e| {
                GjenlydError::TranscriptUnavailable(format!(
                    "failed to parse transcript JSON {}: {}",
                    input, e
                ))
            })?;

            let segments: Vec<TranscriptSegment> = parsed
                .segments
                .into_iter()
                .map(|s| TranscriptSegment::new(s.start_seconds, s.end_seconds, s.text))
                .collect();

            let text = segments
                .iter()
                .map(|s| s.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");

            debug!("Loaded {} timed segments from {}", segments.len(), input);

            Ok(FetchedTranscript {
                text,
                language: parsed.language.unwrap_or_else(|| "en".to_string()),
                segments,
            })
        } else {
            Ok(FetchedTranscript {
                text: content,
                language: "en".to_string(),
                segments: Vec::new(),
            })
        }
    }

    fn can_handle(&self, input: &str) -> bool {
        !input.starts_with("http://") && !input.starts_with("https://") && Path::new(input).exists()
    }

    fn document_id(&self, input: &str) -> Option<String> {
        // Stable across renames: derived from file contents, not the path.
        let content = std::fs::read_to_string(input).ok()?;
        let stem = Path::new(input)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("file");
        Some(format!("local_{}_{}", stem, &content_hash(&content)[..12]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_fetch_plain_text() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        writeln!(file, "A transcript about stars.").unwrap();

        let source = LocalSource::new();
        let input = file.path().to_str().unwrap().to_string();
        assert!(source.can_handle(&input));

        let fetched = source.fetch(&input).await.unwrap();
        assert!(fetched.text.contains("stars"));
        assert_eq!(fetched.language, "en");
        assert!(fetched.segments.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_timestamped_json() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"language": "sv", "segments": [
                {{"start_seconds": 0.0, "end_seconds": 4.5, "text": "Hej."}},
                {{"start_seconds": 4.5, "end_seconds": 9.0, "text": "Hej da."}}
            ]}}"#
        )
        .unwrap();

        let source = LocalSource::new();
        let fetched = source
            .fetch(file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(fetched.language, "sv");
        assert_eq!(fetched.segments.len(), 2);
        assert_eq!(fetched.text, "Hej. Hej da.");
    }

    #[tokio::test]
    async fn test_missing_file_is_unavailable() {
        let source = LocalSource::new();
        let err = source.fetch("/no/such/transcript.txt").await.unwrap_err();
        assert!(matches!(err, GjenlydError::TranscriptUnavailable(_)));
    }

    #[test]
    fn test_document_id_tracks_content() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        write!(file, "same content").unwrap();

        let source = LocalSource::new();
        let id1 = source.document_id(file.path().to_str().unwrap()).unwrap();
        let id2 = source.document_id(file.path().to_str().unwrap()).unwrap();
        assert_eq!(id1, id2);
        assert!(id1.starts_with("local_"));
    }
}
