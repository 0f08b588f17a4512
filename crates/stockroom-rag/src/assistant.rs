use std::sync::Arc;

use stockroom_catalog::CatalogSource;
use stockroom_llm::LlmProvider;

use crate::answer::GroundedAnswer;
use crate::builder::{BuilderConfig, EmbeddingIndexBuilder};
use crate::error::{RagError, Result};
use crate::lifecycle::{IndexLifecycleManager, IndexStatus};
use crate::retriever::RetrievalEngine;
use crate::snapshot::IndexSnapshot;
use crate::synthesizer::AnswerSynthesizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssistantConfig {
    /// Entries retrieved when the caller does not ask for a count.
    pub top_k: usize,
    /// Upper bound for caller-supplied counts.
    pub max_top_k: usize,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            max_top_k: 20,
        }
    }
}

/// Question answering over the catalog: retrieve, then synthesize.
pub struct InventoryAssistant<P> {
    lifecycle: Arc<IndexLifecycleManager<P>>,
    retriever: RetrievalEngine<P>,
    synthesizer: AnswerSynthesizer<P>,
    config: AssistantConfig,
}

impl<P: LlmProvider> InventoryAssistant<P> {
    #[must_use]
    pub fn new(
        provider: Arc<P>,
        catalog: Arc<dyn CatalogSource>,
        builder: BuilderConfig,
        config: AssistantConfig,
    ) -> Self {
        let lifecycle = Arc::new(IndexLifecycleManager::new(
            catalog,
            EmbeddingIndexBuilder::new(Arc::clone(&provider), builder),
        ));
        Self {
            retriever: RetrievalEngine::new(Arc::clone(&provider), Arc::clone(&lifecycle)),
            synthesizer: AnswerSynthesizer::new(provider),
            lifecycle,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> AssistantConfig {
        self.config
    }

    #[must_use]
    pub fn lifecycle(&self) -> &IndexLifecycleManager<P> {
        &self.lifecycle
    }

    /// Rebuild the embedding index from the catalog.
    ///
    /// # Errors
    ///
    /// See [`IndexLifecycleManager::refresh`].
    pub async fn refresh(&self) -> Result<Arc<IndexSnapshot>> {
        self.lifecycle.refresh().await
    }

    #[must_use]
    pub fn status(&self) -> IndexStatus {
        self.lifecycle.status()
    }

    /// Answer a natural-language question about the inventory.
    ///
    /// `top_k` defaults to the configured count and is capped at
    /// `max_top_k`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Validation`] for an empty query or a zero
    /// `top_k`, and otherwise whatever retrieval or synthesis failed with.
    pub async fn ask(&self, query: &str, top_k: Option<usize>) -> Result<GroundedAnswer> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RagError::Validation("No query provided".into()));
        }
        let k = self.resolve_top_k(top_k)?;

        tracing::info!(k, query_len = query.len(), "answering inventory query");
        let retrieval = self.retriever.retrieve(query, k).await?;
        self.synthesizer.synthesize(query, &retrieval).await
    }

    fn resolve_top_k(&self, requested: Option<usize>) -> Result<usize> {
        match requested {
            Some(0) => Err(RagError::Validation("top_k must be at least 1".into())),
            Some(k) => Ok(k.min(self.config.max_top_k)),
            None => Ok(self.config.top_k.min(self.config.max_top_k)),
        }
    }
}
