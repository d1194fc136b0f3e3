//! The text-completion capability the generator depends on.

use async_trait::async_trait;

/// Callback receiving streamed text as it arrives.
pub type ChunkSink<'a> = &'a mut (dyn FnMut(&str) + Send);

/// A model that completes a prompt, streaming chunks while it works.
///
/// Implementations call `on_chunk` for every piece of text in arrival order
/// and return the full text at the end. Non-streaming backends may skip the
/// callback and only return the text.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Complete `prompt` at the given sampling temperature.
    async fn complete(
        &self,
        prompt: &str,
        temperature: f32,
        on_chunk: ChunkSink<'_>,
    ) -> Result<String, BackendError>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}

/// Errors raised by a completion backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Model error: {0}")]
    Model(String),

    #[error("Stream error: {0}")]
    Stream(String),
}
