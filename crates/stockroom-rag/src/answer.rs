//! Answer types and the parsing boundary for generated JSON.
//!
//! Generated output is untrusted: it is validated here once and nothing past
//! [`parse_generated_answer`] sees raw model text.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use stockroom_catalog::RecordId;

use crate::error::{RagError, Result};

/// Descriptive fields the model reported for an item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDetails {
    pub category: String,
    pub location: String,
    pub technical_info: String,
}

/// How an answer item was tied back to a catalog record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grounding {
    /// The model's own item id matched a retrieved entry.
    Claimed,
    /// Resolved by matching `technical_info` against retrieved entry text.
    TextMatch,
    /// No retrieved entry could be matched.
    Ungrounded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerItem {
    pub record_id: Option<RecordId>,
    pub grounding: Grounding,
    pub relevance: String,
    pub details: ItemDetails,
}

impl AnswerItem {
    #[must_use]
    pub fn is_grounded(&self) -> bool {
        self.record_id.is_some()
    }
}

/// Final answer returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundedAnswer {
    pub answer: String,
    pub items: Vec<AnswerItem>,
}

/// One item as the model produced it, before grounding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedItem {
    pub claimed_id: Option<RecordId>,
    pub relevance: String,
    pub details: ItemDetails,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedAnswer {
    pub answer: String,
    pub items: Vec<GeneratedItem>,
}

#[derive(Deserialize)]
struct RawAnswer {
    answer: Option<Value>,
    items: Option<Vec<RawItem>>,
}

#[derive(Deserialize)]
struct RawItem {
    item_id: Option<Value>,
    relevance: Option<Value>,
    details: Option<RawDetails>,
}

#[derive(Deserialize)]
struct RawDetails {
    category: Option<Value>,
    location: Option<Value>,
    technical_info: Option<Value>,
}

/// Parse the model's JSON answer.
///
/// A surrounding markdown code fence is tolerated. A missing `items` list
/// means no items; a missing `answer` is an error. Item ids may come as
/// numbers or numeric strings; anything else is treated as absent.
///
/// # Errors
///
/// Returns [`RagError::MalformedResponse`] if the text is not a JSON object of
/// the expected shape.
pub fn parse_generated_answer(raw: &str) -> Result<GeneratedAnswer> {
    let body = strip_code_fence(raw);
    let value: Value = serde_json::from_str(body)
        .map_err(|e| RagError::MalformedResponse(format!("generated answer is not valid JSON: {e}")))?;
    if !value.is_object() {
        return Err(RagError::MalformedResponse(
            "generated answer is not a JSON object".into(),
        ));
    }
    let parsed: RawAnswer = serde_json::from_value(value)
        .map_err(|e| RagError::MalformedResponse(format!("unexpected answer shape: {e}")))?;

    let answer = parsed
        .answer
        .as_ref()
        .and_then(text_of)
        .ok_or_else(|| RagError::MalformedResponse("generated answer has no `answer` field".into()))?;

    let items = parsed
        .items
        .unwrap_or_default()
        .into_iter()
        .map(|item| {
            let details = item.details.map_or_else(ItemDetails::default, |d| ItemDetails {
                category: d.category.as_ref().and_then(text_of).unwrap_or_default(),
                location: d.location.as_ref().and_then(text_of).unwrap_or_default(),
                technical_info: d.technical_info.as_ref().and_then(text_of).unwrap_or_default(),
            });
            GeneratedItem {
                claimed_id: item.item_id.as_ref().and_then(id_of),
                relevance: item.relevance.as_ref().and_then(text_of).unwrap_or_default(),
                details,
            }
        })
        .collect();

    Ok(GeneratedAnswer { answer, items })
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. `json`), which may share a line with the body.
    let rest = rest
        .trim_start()
        .trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn id_of(value: &Value) -> Option<RecordId> {
    match value {
        Value::Number(n) => n.as_i64().map(RecordId),
        Value::String(s) => s.trim().parse().ok().map(RecordId),
        _ => None,
    }
}
