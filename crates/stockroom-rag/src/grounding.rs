//! Resolution of generated answer items back to catalog records.

use stockroom_catalog::RecordId;

use crate::answer::{AnswerItem, GeneratedItem, Grounding};
use crate::retriever::ScoredEntry;

/// Fallback matcher used when the model did not name a retrieved record.
pub trait GroundingStrategy: Send + Sync {
    /// Pick the retrieved entry `item` refers to, if any.
    fn ground(&self, item: &GeneratedItem, candidates: &[ScoredEntry]) -> Option<RecordId>;
}

/// Case-insensitive substring match between the item's technical info and
/// the projected text of each candidate, in ranking order. Either string
/// may contain the other. Empty technical info never matches.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringGrounding;

impl GroundingStrategy for SubstringGrounding {
    fn ground(&self, item: &GeneratedItem, candidates: &[ScoredEntry]) -> Option<RecordId> {
        let needle = item.details.technical_info.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        candidates
            .iter()
            .find(|c| {
                let text = c.entry.text.trim().to_lowercase();
                !text.is_empty() && (text.contains(&needle) || needle.contains(&text))
            })
            .map(|c| c.entry.record_id)
    }
}

/// Attach a record id and grounding kind to every generated item.
///
/// A claimed id is trusted only when it belongs to a retrieved entry;
/// otherwise `strategy` decides. Items that match nothing are kept and
/// marked [`Grounding::Ungrounded`].
pub fn ground_items(
    strategy: &dyn GroundingStrategy,
    items: Vec<GeneratedItem>,
    candidates: &[ScoredEntry],
) -> Vec<AnswerItem> {
    items
        .into_iter()
        .map(|item| {
            let claimed = item
                .claimed_id
                .filter(|id| candidates.iter().any(|c| c.entry.record_id == *id));
            let (record_id, grounding) = if let Some(id) = claimed {
                (Some(id), Grounding::Claimed)
            } else if let Some(id) = strategy.ground(&item, candidates) {
                (Some(id), Grounding::TextMatch)
            } else {
                tracing::warn!(
                    claimed_id = ?item.claimed_id,
                    "answer item could not be matched to a retrieved record"
                );
                (None, Grounding::Ungrounded)
            };
            AnswerItem {
                record_id,
                grounding,
                relevance: item.relevance,
                details: item.details,
            }
        })
        .collect()
}
