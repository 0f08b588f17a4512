use chrono::{DateTime, Utc};
use serde::Serialize;
use stockroom_catalog::RecordId;

/// One embedded catalog record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexEntry {
    pub record_id: RecordId,
    pub vector: Vec<f32>,
    /// Projected text the vector was computed from.
    pub text: String,
}

/// Immutable result of one index build.
///
/// All vectors share one dimension and were produced by `model`. Entries keep
/// catalog order. Once published a snapshot is never mutated; a refresh
/// replaces it wholesale.
#[derive(Debug, Clone)]
pub struct IndexSnapshot {
    entries: Vec<IndexEntry>,
    model: String,
    built_at: DateTime<Utc>,
    generation: u64,
}

impl IndexSnapshot {
    #[must_use]
    pub fn new(entries: Vec<IndexEntry>, model: impl Into<String>) -> Self {
        Self {
            entries,
            model: model.into(),
            built_at: Utc::now(),
            generation: 0,
        }
    }

    #[must_use]
    pub(crate) fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    #[must_use]
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Embedding model the vectors came from.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[must_use]
    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// Publication counter, starting at 1 for the first published snapshot.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Vector dimension, `None` for an empty snapshot.
    #[must_use]
    pub fn dimension(&self) -> Option<usize> {
        self.entries.first().map(|e| e.vector.len())
    }
}
