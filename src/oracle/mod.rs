use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::OllamaConfig;

/// Errors talking to the inference service
///
/// Both kinds are absorbed per file by the search pipeline: a failed
/// judgement classifies that one file as a non-match and the run continues.
#[derive(Error, Debug)]
pub enum OracleError {
    #[error("inference service unreachable: {0}")]
    Unreachable(String),

    #[error("malformed inference response: {0}")]
    MalformedResponse(String),
}

/// Judges whether a text excerpt relates to a query
///
/// The trait is the seam for swapping the live Ollama client for a scripted
/// oracle in tests.
#[async_trait]
pub trait RelevanceOracle: Send + Sync {
    /// Produce a free-form judgement for an already-built prompt
    async fn judge(&self, prompt: &str) -> Result<String, OracleError>;
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

/// One line of the newline-delimited streaming response
#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    response: String,

    #[serde(default)]
    done: bool,
}

/// Client for an Ollama-compatible `/api/generate` endpoint
pub struct OllamaClient {
    client: reqwest::Client,
    config: OllamaConfig,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    /// Single blocking call (`stream: false`), returns the `response` field
    async fn generate(&self, prompt: &str) -> Result<String, OracleError> {
        let response = self
            .client
            .post(&self.config.url)
            .json(&GenerateRequest {
                model: &self.config.model,
                prompt,
                stream: false,
            })
            .send()
            .await
            .map_err(|err| OracleError::Unreachable(err.to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|err| OracleError::Unreachable(err.to_string()))?;

        let value: Value = serde_json::from_str(&body)
            .map_err(|err| OracleError::MalformedResponse(err.to_string()))?;

        value
            .get("response")
            .and_then(Value::as_str)
            .map(|text| text.trim().to_string())
            .ok_or_else(|| OracleError::MalformedResponse("missing 'response' field".to_string()))
    }

    /// Chunked-stream call (`stream: true`), assembles the judgement from
    /// newline-delimited partial results as they arrive
    async fn generate_stream(&self, prompt: &str) -> Result<String, OracleError> {
        let response = self
            .client
            .post(&self.config.url)
            .json(&GenerateRequest {
                model: &self.config.model,
                prompt,
                stream: true,
            })
            .send()
            .await
            .map_err(|err| OracleError::Unreachable(err.to_string()))?;

        let mut stream = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();
        let mut judgement = String::new();
        let mut done = false;

        while !done {
            let Some(chunk) = stream.next().await else {
                break;
            };
            let chunk = chunk.map_err(|err| OracleError::Unreachable(err.to_string()))?;
            buffer.extend_from_slice(&chunk);

            while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                if let Some(parsed) = parse_chunk(&line)? {
                    judgement.push_str(&parsed.response);
                    if parsed.done {
                        done = true;
                        break;
                    }
                }
            }
        }

        // A final line without a trailing newline still counts
        if !done {
            if let Some(parsed) = parse_chunk(&buffer)? {
                judgement.push_str(&parsed.response);
            }
        }

        debug!("Assembled {} streamed judgement chars", judgement.len());
        Ok(judgement.trim().to_string())
    }
}

#[async_trait]
impl RelevanceOracle for OllamaClient {
    async fn judge(&self, prompt: &str) -> Result<String, OracleError> {
        if self.config.stream {
            self.generate_stream(prompt).await
        } else {
            self.generate(prompt).await
        }
    }
}

/// Parse one newline-delimited stream line; blank lines yield `None`
fn parse_chunk(line: &[u8]) -> Result<Option<StreamChunk>, OracleError> {
    let line = std::str::from_utf8(line)
        .map_err(|err| OracleError::MalformedResponse(err.to_string()))?
        .trim();

    if line.is_empty() {
        return Ok(None);
    }

    serde_json::from_str(line)
        .map(Some)
        .map_err(|err| OracleError::MalformedResponse(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chunk_fragment() {
        let chunk = parse_chunk(br#"{"response":"Yes, ","done":false}"#)
            .unwrap()
            .unwrap();
        assert_eq!(chunk.response, "Yes, ");
        assert!(!chunk.done);
    }

    #[test]
    fn test_parse_chunk_done_marker() {
        let chunk = parse_chunk(br#"{"response":"","done":true}"#)
            .unwrap()
            .unwrap();
        assert_eq!(chunk.response, "");
        assert!(chunk.done);
    }

    #[test]
    fn test_parse_chunk_skips_blank_lines() {
        assert!(parse_chunk(b"\n").unwrap().is_none());
        assert!(parse_chunk(b"   ").unwrap().is_none());
        assert!(parse_chunk(b"").unwrap().is_none());
    }

    #[test]
    fn test_parse_chunk_rejects_garbage() {
        let err = parse_chunk(b"not json at all").unwrap_err();
        assert!(matches!(err, OracleError::MalformedResponse(_)));
    }
}
