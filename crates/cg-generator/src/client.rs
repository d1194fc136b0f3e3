//! Ollama API client for code generation.
//!
//! Talks to `/api/generate` with streaming enabled. Ollama answers with
//! newline-delimited JSON, one object per generated fragment:
//!
//! ```text
//! {"model":"codellama:13b-instruct","response":"// Clean","done":false}
//! {"model":"codellama:13b-instruct","response":"er.swift\n","done":false}
//! {"model":"codellama:13b-instruct","response":"","done":true}
//! ```

use std::time::Duration;

use async_trait::async_trait;
use cg_core::{BackendError, ChunkSink, CompletionBackend};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Model used for the Swift class stage.
pub const DEFAULT_PRIMARY_MODEL: &str = "codellama:13b-instruct";

/// Model used for the bridge module stage.
pub const DEFAULT_SECONDARY_MODEL: &str = "codegemma:7b-instruct";

/// Default Ollama server.
pub const DEFAULT_HOST: &str = "http://localhost:11434";

/// Ollama client configuration.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Server base URL
    pub host: String,
    /// Model to use
    pub model: String,
    /// Connect timeout. Generation itself has no timeout.
    pub connect_timeout: Duration,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            model: DEFAULT_PRIMARY_MODEL.to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl OllamaConfig {
    /// Set the server URL.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// URL of the generate endpoint.
    pub fn generate_url(&self) -> String {
        format!("{}/api/generate", self.host.trim_end_matches('/'))
    }
}

/// Streaming Ollama client.
pub struct OllamaClient {
    config: OllamaConfig,
    client: Client,
}

impl OllamaClient {
    /// Create a new client with the given config.
    pub fn new(config: OllamaConfig) -> Result<Self, BackendError> {
        if config.model.is_empty() {
            return Err(BackendError::Model("model name is empty".to_string()));
        }

        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| BackendError::Http(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Get current config.
    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }
}

#[async_trait]
impl CompletionBackend for OllamaClient {
    async fn complete(
        &self,
        prompt: &str,
        temperature: f32,
        on_chunk: ChunkSink<'_>,
    ) -> Result<String, BackendError> {
        let request = GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: true,
            options: GenerateOptions { temperature },
        };

        let mut response = self
            .client
            .post(self.config.generate_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| BackendError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| BackendError::Http(e.to_string()))?;
            return Err(BackendError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let mut decoder = NdjsonDecoder::default();
        let mut accumulated_text = String::new();

        while let Some(bytes) = response
            .chunk()
            .await
            .map_err(|e| BackendError::Stream(e.to_string()))?
        {
            for line in decoder.push(&bytes) {
                handle_event(&line, &mut accumulated_text, on_chunk)?;
            }
        }
        if let Some(line) = decoder.finish() {
            handle_event(&line, &mut accumulated_text, on_chunk)?;
        }

        debug!(
            model = %self.config.model,
            bytes = accumulated_text.len(),
            "Generation finished"
        );
        Ok(accumulated_text)
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

/// Apply one NDJSON event to the accumulated response.
fn handle_event(
    line: &str,
    accumulated_text: &mut String,
    on_chunk: &mut (dyn FnMut(&str) + Send),
) -> Result<(), BackendError> {
    if line.trim().is_empty() {
        return Ok(());
    }

    let event: GenerateEvent = serde_json::from_str(line)
        .map_err(|e| BackendError::Stream(format!("invalid event {line:?}: {e}")))?;

    if let Some(error) = event.error {
        return Err(BackendError::Model(error));
    }
    if !event.response.is_empty() {
        on_chunk(&event.response);
        accumulated_text.push_str(&event.response);
    }
    Ok(())
}

/// Splits a byte stream into complete lines.
///
/// Network chunks do not respect line (or UTF-8) boundaries, so bytes are
/// buffered until a newline arrives.
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    buffer: Vec<u8>,
}

impl NdjsonDecoder {
    /// Feed bytes, returning every line they complete.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&line[..pos]).into_owned());
        }
        lines
    }

    /// Return the trailing line if the stream did not end with a newline.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.buffer).into_owned();
        self.buffer.clear();
        Some(line)
    }
}

/// API request body.
#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

/// One streamed event.
#[derive(Deserialize)]
struct GenerateEvent {
    #[serde(default)]
    response: String,
    #[serde(default)]
    error: Option<String>,
}
