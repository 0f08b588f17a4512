use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::provider::{LlmProvider, Message};

/// Provider for the `OpenAI` API and any endpoint speaking the same
/// `/chat/completions` and `/embeddings` protocol.
#[derive(Clone)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    embedding_model: String,
}

impl fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("embedding_model", &self.embedding_model)
            .finish()
    }
}

impl OpenAiProvider {
    #[must_use]
    pub fn new(
        api_key: String,
        mut base_url: String,
        model: String,
        max_tokens: u32,
        embedding_model: String,
    ) -> Self {
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: crate::http::default_client(),
            api_key,
            base_url,
            model,
            max_tokens,
            embedding_model,
        }
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<String, LlmError> {
        let response = self
            .client
            .post(format!("{}/{path}", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await.map_err(LlmError::Http)?;

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!("OpenAI rate limited on /{path}");
            return Err(LlmError::RateLimited);
        }

        if !status.is_success() {
            tracing::error!("OpenAI API error {status} on /{path}: {text}");
            return Err(LlmError::Status {
                provider: "openai",
                status: status.as_u16(),
            });
        }

        Ok(text)
    }

    async fn send_chat(&self, messages: &[Message], json_mode: bool) -> Result<String, LlmError> {
        let api_messages = convert_messages(messages);
        let body = ChatRequest {
            model: &self.model,
            messages: &api_messages,
            max_tokens: self.max_tokens,
            response_format: json_mode.then_some(ResponseFormat {
                r#type: "json_object",
            }),
        };

        let text = self.post("chat/completions", &body).await?;
        let resp: OpenAiChatResponse = serde_json::from_str(&text)?;

        resp.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(LlmError::EmptyResponse { provider: "openai" })
    }

    async fn send_embeddings(&self, input: EmbeddingInput<'_>) -> Result<Vec<Vec<f32>>, LlmError> {
        let body = EmbeddingRequest {
            input,
            model: &self.embedding_model,
        };

        let text = self.post("embeddings", &body).await?;
        let mut resp: EmbeddingResponse = serde_json::from_str(&text)?;

        resp.data.sort_by_key(|d| d.index);
        Ok(resp.data.into_iter().map(|d| d.embedding).collect())
    }
}

impl LlmProvider for OpenAiProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.send_chat(messages, false).await
    }

    async fn chat_json(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.send_chat(messages, true).await
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        self.send_embeddings(EmbeddingInput::One(text))
            .await?
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyResponse { provider: "openai" })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let vectors = self.send_embeddings(EmbeddingInput::Many(texts)).await?;
        tracing::debug!(
            requested = texts.len(),
            returned = vectors.len(),
            "OpenAI batch embedding"
        );
        Ok(vectors)
    }

    fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "openai"
    }
}

fn convert_messages(messages: &[Message]) -> Vec<ApiMessage<'_>> {
    messages
        .iter()
        .map(|msg| ApiMessage {
            role: match msg.role {
                crate::provider::Role::System => "system",
                crate::provider::Role::User => "user",
                crate::provider::Role::Assistant => "assistant",
            },
            content: &msg.content,
        })
        .collect()
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    r#type: &'static str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ApiMessage<'a>],
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    content: String,
}

#[derive(Serialize)]
#[serde(untagged)]
enum EmbeddingInput<'a> {
    One(&'a str),
    Many(&'a [String]),
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: EmbeddingInput<'a>,
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}
