//! Test-only mock provider.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::LlmError;
use crate::provider::{LlmProvider, Message};

/// Scripted provider: chat answers are popped from a queue, embeddings are
/// looked up by exact text with a fallback vector.
#[derive(Debug, Clone)]
pub struct MockProvider {
    responses: Arc<Mutex<Vec<String>>>,
    embeddings: HashMap<String, Vec<f32>>,
    chats: Arc<Mutex<Vec<Vec<Message>>>>,
    batch_calls: Arc<AtomicUsize>,
    embed_calls: Arc<AtomicUsize>,
    pub default_response: String,
    pub default_embedding: Vec<f32>,
    pub model: String,
    pub fail_chat: bool,
    pub fail_embed: bool,
    /// Batch calls beyond this many fail.
    pub fail_batch_after: Option<usize>,
    /// Milliseconds to sleep before answering a chat or batch embedding call.
    pub delay_ms: u64,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            embeddings: HashMap::new(),
            chats: Arc::new(Mutex::new(Vec::new())),
            batch_calls: Arc::new(AtomicUsize::new(0)),
            embed_calls: Arc::new(AtomicUsize::new(0)),
            default_response: "{\"answer\": \"mock response\", \"items\": []}".into(),
            default_embedding: vec![0.0; 3],
            model: "mock-embedding".into(),
            fail_chat: false,
            fail_embed: false,
            fail_batch_after: None,
            delay_ms: 0,
        }
    }
}

impl MockProvider {
    #[must_use]
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_embedding(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.embeddings.insert(text.into(), vector);
        self
    }

    #[must_use]
    pub fn with_default_embedding(mut self, vector: Vec<f32>) -> Self {
        self.default_embedding = vector;
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_delay(mut self, ms: u64) -> Self {
        self.delay_ms = ms;
        self
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_chat: true,
            fail_embed: true,
            ..Self::default()
        }
    }

    /// Queue another chat response.
    pub fn push_response(&self, response: impl Into<String>) {
        self.responses.lock().unwrap().push(response.into());
    }

    /// Number of `embed_batch` calls made so far, including failed ones.
    #[must_use]
    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    /// Number of single `embed` calls made so far.
    #[must_use]
    pub fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }

    /// Every message list passed to `chat`/`chat_json`, oldest first.
    #[must_use]
    pub fn recorded_chats(&self) -> Vec<Vec<Message>> {
        self.chats.lock().unwrap().clone()
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        self.embeddings
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.default_embedding.clone())
    }

    async fn pause(&self) {
        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }
    }
}

impl LlmProvider for MockProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.pause().await;
        self.chats.lock().unwrap().push(messages.to_vec());
        if self.fail_chat {
            return Err(LlmError::Other("mock LLM error".into()));
        }
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(self.default_response.clone())
        } else {
            Ok(responses.remove(0))
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_embed {
            return Err(LlmError::Other("mock embedding error".into()));
        }
        Ok(self.vector_for(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        let call = self.batch_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if self.fail_embed || self.fail_batch_after.is_some_and(|limit| call >= limit) {
            return Err(LlmError::Other("mock embedding error".into()));
        }
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }

    fn embedding_model(&self) -> &str {
        &self.model
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "mock"
    }
}
