//! HTTP transcript source.
//!
//! Fetches transcripts published at an HTTP(S) URL, either as plain text or
//! as a timestamped JSON export.

use super::{FetchedTranscript, TranscriptSegment, TranscriptSource};
use crate::error::{GjenlydError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use url::Url;

/// Transcript source fetching over HTTP.
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpSource {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptPayload {
    #[serde(default)]
    language: Option<String>,
    segments: Vec<SegmentPayload>,
}

#[derive(Debug, Deserialize)]
struct SegmentPayload {
    start_seconds: f64,
    end_seconds: f64,
    text: String,
}

#[async_trait]
impl TranscriptSource for HttpSource {
    async fn fetch(&self, input: &str) -> Result<FetchedTranscript> {
        let response = self
            .client
            .get(input)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                GjenlydError::TranscriptUnavailable(format!("failed to fetch {}: {}", input, e))
            })?;

        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("json"));

        let body = response.text().await.map_err(|e| {
            GjenlydError::TranscriptUnavailable(format!("failed to read body of {}: {}", input, e))
        })?;

        if body.trim().is_empty() {
            return Err(GjenlydError::TranscriptUnavailable(format!(
                "{} returned an empty transcript",
                input
            )));
        }

        if is_json {
            let parsed: TranscriptPayload = serde_json::from_str(&body).map_err(|e| {
                GjenlydError::TranscriptUnavailable(format!(
                    "failed to parse transcript JSON from {}: {}",
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

            debug!("Fetched {} timed segments from {}", segments.len(), input);

            Ok(FetchedTranscript {
                text,
                language: parsed.language.unwrap_or_else(|| "en".to_string()),
                segments,
            })
        } else {
            Ok(FetchedTranscript {
                text: body,
                language: "en".to_string(),
                segments: Vec::new(),
            })
        }
    }

    fn can_handle(&self, input: &str) -> bool {
        input.starts_with("http://") || input.starts_with("https://")
    }

    fn document_id(&self, input: &str) -> Option<String> {
        let url = Url::parse(input).ok()?;
        let host = url.host_str()?;

        let mut parts: Vec<String> = vec![sanitize_component(host)];
        parts.extend(
            url.path()
                .trim_matches('/')
                .split('/')
                .filter(|s| !s.is_empty())
                .map(sanitize_component),
        );

        Some(parts.join("_"))
    }
}

fn sanitize_component(input: &str) -> String {
    input
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
