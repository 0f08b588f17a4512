use std::cmp::Ordering;
use std::sync::Arc;

use serde::Serialize;
use stockroom_llm::LlmProvider;

use crate::error::{RagError, Result};
use crate::lifecycle::IndexLifecycleManager;
use crate::snapshot::{IndexEntry, IndexSnapshot};

#[derive(Debug, Clone, Serialize)]
pub struct ScoredEntry {
    #[serde(flatten)]
    pub entry: IndexEntry,
    pub score: f32,
}

/// Top-k entries for one query, best first, all from the same snapshot.
#[derive(Debug, Clone, Default)]
pub struct RetrievalResult {
    pub entries: Vec<ScoredEntry>,
    /// Generation of the snapshot the entries came from.
    pub generation: u64,
}

impl RetrievalResult {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Embeds queries and ranks them against the published snapshot.
pub struct RetrievalEngine<P> {
    provider: Arc<P>,
    lifecycle: Arc<IndexLifecycleManager<P>>,
}

impl<P: LlmProvider> RetrievalEngine<P> {
    #[must_use]
    pub fn new(provider: Arc<P>, lifecycle: Arc<IndexLifecycleManager<P>>) -> Self {
        Self {
            provider,
            lifecycle,
        }
    }

    /// Return the `k` entries whose vectors score highest against the query.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NotReady`] when no snapshot is published,
    /// [`RagError::Upstream`] when embedding the query fails, and
    /// [`RagError::MalformedResponse`] when the query vector dimension does
    /// not match the snapshot.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<RetrievalResult> {
        let snapshot = self.lifecycle.current()?;
        if snapshot.is_empty() || k == 0 {
            return Ok(RetrievalResult {
                entries: Vec::new(),
                generation: snapshot.generation(),
            });
        }

        let query_vector = self.provider.embed(query).await?;
        if snapshot.dimension() != Some(query_vector.len()) {
            return Err(RagError::MalformedResponse(format!(
                "query embedding has dimension {}, index has {}",
                query_vector.len(),
                snapshot.dimension().unwrap_or_default()
            )));
        }

        let entries = rank(&snapshot, &query_vector, k);
        tracing::debug!(
            k,
            returned = entries.len(),
            generation = snapshot.generation(),
            "retrieved entries"
        );
        Ok(RetrievalResult {
            entries,
            generation: snapshot.generation(),
        })
    }
}

/// Score every entry by dot product and keep the best `k`.
///
/// Ties keep snapshot order. NaN scores rank below every number.
#[must_use]
pub fn rank(snapshot: &IndexSnapshot, query: &[f32], k: usize) -> Vec<ScoredEntry> {
    let mut scored: Vec<(usize, f32)> = snapshot
        .entries()
        .iter()
        .enumerate()
        .map(|(i, e)| (i, dot_product(query, &e.vector)))
        .collect();

    // Stable sort preserves snapshot order between equal scores.
    scored.sort_by(|a, b| descending(a.1, b.1));
    scored.truncate(k);

    scored
        .into_iter()
        .map(|(i, score)| ScoredEntry {
            entry: snapshot.entries()[i].clone(),
            score,
        })
        .collect()
}

#[must_use]
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn descending(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}
