use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::LlmError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A remote model that can both generate text and embed it.
///
/// Embedding vectors from one provider are only comparable with vectors
/// produced by the same [`LlmProvider::embedding_model`].
pub trait LlmProvider: Send + Sync {
    /// Send messages to the model and return the assistant response.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails to communicate or the response is invalid.
    fn chat(&self, messages: &[Message]) -> impl Future<Output = Result<String, LlmError>> + Send;

    /// Like [`LlmProvider::chat`], but asks the backend to constrain output to a JSON object.
    ///
    /// Backends without a JSON mode fall back to plain chat; callers must still
    /// validate the returned text.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails to communicate or the response is invalid.
    fn chat_json(
        &self,
        messages: &[Message],
    ) -> impl Future<Output = Result<String, LlmError>> + Send {
        self.chat(messages)
    }

    /// Embed a single text.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedding request fails.
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, LlmError>> + Send;

    /// Embed several texts in one request. The returned vectors are positionally
    /// aligned with `texts`.
    ///
    /// # Errors
    ///
    /// Returns an error if any embedding request fails.
    fn embed_batch(
        &self,
        texts: &[String],
    ) -> impl Future<Output = Result<Vec<Vec<f32>>, LlmError>> + Send {
        async move {
            let mut vectors = Vec::with_capacity(texts.len());
            for text in texts {
                vectors.push(self.embed(text).await?);
            }
            Ok(vectors)
        }
    }

    /// Identifier of the model that produces embeddings.
    fn embedding_model(&self) -> &str;

    fn name(&self) -> &str;
}
