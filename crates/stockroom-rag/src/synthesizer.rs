use std::sync::Arc;

use stockroom_llm::{LlmProvider, Message};

use crate::answer::{GroundedAnswer, parse_generated_answer};
use crate::error::Result;
use crate::grounding::{GroundingStrategy, SubstringGrounding, ground_items};
use crate::retriever::RetrievalResult;

pub const SYSTEM_PROMPT: &str = r#"You are an inventory assistant. Answer questions about the inventory using the provided context.
Format your response as a JSON object with the following structure:
{
    "answer": "Your natural language answer here",
    "items": [
        {
            "item_id": "ID of the relevant item",
            "relevance": "Why this item is relevant to the query",
            "details": {
                "category": "Item category",
                "location": "Storage location",
                "technical_info": "Key technical details"
            }
        }
    ]
}
Include only the most relevant items. Make sure the response is valid JSON."#;

const CONTEXT_SEPARATOR: &str = "\n\n";

/// Retrieved entry texts in ranking order, one paragraph each.
#[must_use]
pub fn build_context(retrieval: &RetrievalResult) -> String {
    retrieval
        .entries
        .iter()
        .map(|e| e.entry.text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

#[must_use]
pub fn build_user_prompt(context: &str, query: &str) -> String {
    format!("Context about the inventory:\n\n{context}\n\nQuestion: {query}")
}

/// Turns retrieved context and a question into a grounded answer.
pub struct AnswerSynthesizer<P> {
    provider: Arc<P>,
    strategy: Box<dyn GroundingStrategy>,
}

impl<P: LlmProvider> AnswerSynthesizer<P> {
    #[must_use]
    pub fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            strategy: Box::new(SubstringGrounding),
        }
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: impl GroundingStrategy + 'static) -> Self {
        self.strategy = Box::new(strategy);
        self
    }

    /// Ask the generation model and ground its items against `retrieval`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RagError::Upstream`] if the generation call fails and
    /// [`crate::RagError::MalformedResponse`] if its output cannot be parsed.
    pub async fn synthesize(&self, query: &str, retrieval: &RetrievalResult) -> Result<GroundedAnswer> {
        let context = build_context(retrieval);
        tracing::debug!(
            entries = retrieval.entries.len(),
            context_len = context.len(),
            "built answer context"
        );

        let messages = [
            Message::system(SYSTEM_PROMPT),
            Message::user(build_user_prompt(&context, query)),
        ];
        let raw = self.provider.chat_json(&messages).await?;
        let generated = parse_generated_answer(&raw).inspect_err(|e| {
            tracing::warn!("could not parse generated answer: {e}");
        })?;

        let items = ground_items(self.strategy.as_ref(), generated.items, &retrieval.entries);
        tracing::debug!(
            items = items.len(),
            grounded = items.iter().filter(|i| i.is_grounded()).count(),
            "answer synthesized"
        );

        Ok(GroundedAnswer {
            answer: generated.answer,
            items,
        })
    }
}
