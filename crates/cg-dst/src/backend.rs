//! Simulated model backends.
//!
//! [`ScriptedBackend`] plays back a fixed list of replies and records every
//! prompt it receives. [`FaultyBackend`] answers with the same text every
//! time but fails, panics or stalls according to a seeded
//! [`FaultInjector`].

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use cg_core::{BackendError, ChunkSink, CompletionBackend};

use crate::fault::{FaultDecision, FaultInjector};

/// One scripted answer.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Stream the text as one chunk
    Text(String),
    /// Stream the pieces in order
    Chunks(Vec<String>),
    /// Return a backend error with this message
    Fail(String),
    /// Panic with this message
    Panic(String),
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply::Text(text.into())
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Reply::Fail(message.into())
    }

    pub fn panic(message: impl Into<String>) -> Self {
        Reply::Panic(message.into())
    }
}

/// Backend that returns scripted replies in order.
///
/// When the script runs out, the last reply is repeated.
pub struct ScriptedBackend {
    model: String,
    replies: Mutex<VecDeque<Reply>>,
    last: Mutex<Option<Reply>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new(model: impl Into<String>, replies: impl IntoIterator<Item = Reply>) -> Self {
        let replies: VecDeque<Reply> = replies.into_iter().collect();
        debug_assert!(!replies.is_empty(), "Script must contain at least one reply");

        Self {
            model: model.into(),
            replies: Mutex::new(replies),
            last: Mutex::new(None),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts received so far, in order.
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    /// Number of calls made so far.
    pub fn calls_count(&self) -> usize {
        lock(&self.prompts).len()
    }

    fn next_reply(&self) -> Option<Reply> {
        let mut last = lock(&self.last);
        match lock(&self.replies).pop_front() {
            Some(reply) => {
                *last = Some(reply.clone());
                Some(reply)
            }
            None => last.clone(),
        }
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn complete(
        &self,
        prompt: &str,
        _temperature: f32,
        on_chunk: ChunkSink<'_>,
    ) -> Result<String, BackendError> {
        lock(&self.prompts).push(prompt.to_string());

        match self.next_reply() {
            Some(Reply::Text(text)) => {
                on_chunk(&text);
                Ok(text)
            }
            Some(Reply::Chunks(chunks)) => {
                for chunk in &chunks {
                    on_chunk(chunk);
                    tokio::task::yield_now().await;
                }
                Ok(chunks.concat())
            }
            Some(Reply::Fail(message)) => Err(BackendError::Model(message)),
            Some(Reply::Panic(message)) => panic!("{}", message),
            None => Err(BackendError::Model("script is empty".to_string())),
        }
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Backend that returns fixed text, with seeded faults.
pub struct FaultyBackend {
    model: String,
    text: String,
    injector: Mutex<FaultInjector>,
}

impl FaultyBackend {
    pub fn new(model: impl Into<String>, text: impl Into<String>, injector: FaultInjector) -> Self {
        Self {
            model: model.into(),
            text: text.into(),
            injector: Mutex::new(injector),
        }
    }

    /// Faults injected so far.
    pub fn stats(&self) -> crate::fault::FaultStats {
        lock(&self.injector).stats()
    }
}

#[async_trait]
impl CompletionBackend for FaultyBackend {
    async fn complete(
        &self,
        _prompt: &str,
        _temperature: f32,
        on_chunk: ChunkSink<'_>,
    ) -> Result<String, BackendError> {
        let (decision, delay_ms) = {
            let mut injector = lock(&self.injector);
            (injector.decide(), injector.maybe_delay_ms())
        };

        if let Some(ms) = delay_ms {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }

        match decision {
            FaultDecision::Pass => {
                on_chunk(&self.text);
                Ok(self.text.clone())
            }
            FaultDecision::Fail => Err(BackendError::Model("injected failure".to_string())),
            FaultDecision::Panic => panic!("injected panic in {}", self.model),
        }
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Lock a mutex, recovering the data if a panicking call poisoned it.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
