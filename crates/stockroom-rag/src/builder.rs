//! Batched embedding of the catalog into a fresh [`IndexSnapshot`].
//!
//! Records are split into fixed-size batches, one embedding request per
//! batch, with a bounded number of requests in flight. A build is
//! all-or-nothing: the first failing batch aborts the build, cancels the
//! batches still in flight, and no partial snapshot is returned.

use std::sync::Arc;
use std::time::Instant;

use futures::{StreamExt, TryStreamExt, stream};
use stockroom_catalog::CatalogRecord;
use stockroom_llm::LlmProvider;

use crate::error::{RagError, Result};
use crate::projector::project;
use crate::snapshot::{IndexEntry, IndexSnapshot};

/// Batching knobs for index builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuilderConfig {
    /// Records per embedding request.
    pub batch_size: usize,
    /// Embedding requests allowed in flight at once.
    pub max_concurrent_batches: usize,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            max_concurrent_batches: 4,
        }
    }
}

pub struct EmbeddingIndexBuilder<P> {
    provider: Arc<P>,
    config: BuilderConfig,
}

impl<P: LlmProvider> EmbeddingIndexBuilder<P> {
    #[must_use]
    pub fn new(provider: Arc<P>, config: BuilderConfig) -> Self {
        Self { provider, config }
    }

    #[must_use]
    pub fn config(&self) -> BuilderConfig {
        self.config
    }

    /// Embed every record and assemble a snapshot in input order.
    ///
    /// An empty record list yields an empty snapshot without any remote call.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Upstream`] if a batch request fails and
    /// [`RagError::MalformedResponse`] if a batch returns the wrong number of
    /// vectors or the vectors disagree on dimension.
    pub async fn build(&self, records: &[CatalogRecord]) -> Result<IndexSnapshot> {
        let start = Instant::now();
        let batch_size = self.config.batch_size.max(1);
        let in_flight = self.config.max_concurrent_batches.max(1);

        tracing::info!(
            records = records.len(),
            batch_size,
            in_flight,
            provider = self.provider.name(),
            model = self.provider.embedding_model(),
            "building embedding index"
        );

        // Created up front so the build future stays `Send` for any provider.
        let pending: Vec<_> = records
            .chunks(batch_size)
            .enumerate()
            .map(|(index, batch)| self.embed_batch(index, batch))
            .collect();
        let batches: Vec<Vec<IndexEntry>> = stream::iter(pending)
            .buffered(in_flight)
            .try_collect()
            .await?;

        let entries: Vec<IndexEntry> = batches.into_iter().flatten().collect();
        check_dimensions(&entries)?;

        tracing::info!(
            entries = entries.len(),
            elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "embedding index built"
        );

        Ok(IndexSnapshot::new(entries, self.provider.embedding_model()))
    }

    async fn embed_batch(&self, index: usize, batch: &[CatalogRecord]) -> Result<Vec<IndexEntry>> {
        let texts: Vec<String> = batch
            .iter()
            .map(|record| project(record, record.location.as_ref()))
            .collect();

        let vectors = self.provider.embed_batch(&texts).await.inspect_err(|e| {
            tracing::error!(batch = index, size = batch.len(), "embedding batch failed: {e}");
        })?;

        if vectors.len() != texts.len() {
            return Err(RagError::MalformedResponse(format!(
                "embedding batch {index} returned {} vectors for {} inputs",
                vectors.len(),
                texts.len()
            )));
        }

        tracing::debug!(batch = index, size = batch.len(), "embedded batch");

        Ok(batch
            .iter()
            .zip(texts)
            .zip(vectors)
            .map(|((record, text), vector)| IndexEntry {
                record_id: record.id,
                vector,
                text,
            })
            .collect())
    }
}

fn check_dimensions(entries: &[IndexEntry]) -> Result<()> {
    let Some(first) = entries.first() else {
        return Ok(());
    };
    let dimension = first.vector.len();
    if dimension == 0 {
        return Err(RagError::MalformedResponse(format!(
            "empty embedding vector for record {}",
            first.record_id
        )));
    }
    if let Some(bad) = entries.iter().find(|e| e.vector.len() != dimension) {
        return Err(RagError::MalformedResponse(format!(
            "embedding for record {} has dimension {}, expected {dimension}",
            bad.record_id,
            bad.vector.len()
        )));
    }
    Ok(())
}
