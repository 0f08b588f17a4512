//! Semantic retrieval over the item catalog.
//!
//! Catalog records are projected to text, embedded in batches into an
//! immutable [`IndexSnapshot`], and published through an
//! [`IndexLifecycleManager`]. Queries are embedded, ranked by dot product
//! against the current snapshot, and the top entries are handed to a
//! generation model whose answer is grounded back to record ids.

pub mod answer;
pub mod assistant;
pub mod builder;
pub mod error;
pub mod grounding;
pub mod lifecycle;
pub mod projector;
pub mod retriever;
pub mod snapshot;
pub mod synthesizer;

pub use answer::{AnswerItem, Grounding, GroundedAnswer, ItemDetails};
pub use assistant::{AssistantConfig, InventoryAssistant};
pub use builder::{BuilderConfig, EmbeddingIndexBuilder};
pub use error::{RagError, Result};
pub use grounding::{GroundingStrategy, SubstringGrounding};
pub use lifecycle::{IndexLifecycleManager, IndexStatus, LifecycleState};
pub use retriever::{RetrievalEngine, RetrievalResult, ScoredEntry};
pub use snapshot::{IndexEntry, IndexSnapshot};
pub use synthesizer::AnswerSynthesizer;
