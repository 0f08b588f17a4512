use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier of a catalog item, assigned by the catalog store.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Free-form technical description of an item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnicalDetails {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub use_cases: Vec<String>,
}

impl TechnicalDetails {
    /// Decode the stored column value.
    ///
    /// Legacy rows hold plain text instead of a JSON object; that text is kept
    /// as the description.
    #[must_use]
    pub fn from_column(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::default();
        }
        match serde_json::from_str::<Self>(trimmed) {
            Ok(details) => details,
            Err(e) => {
                tracing::debug!("technical_details is not JSON ({e}), keeping as description");
                Self {
                    description: Some(trimmed.to_owned()),
                    use_cases: Vec::new(),
                }
            }
        }
    }
}

/// Names of the storage levels enclosing an item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub shelf: Option<String>,
    pub container: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub id: RecordId,
    pub category: String,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub technical_details: TechnicalDetails,
    #[serde(default)]
    pub location: Option<ResolvedLocation>,
}

impl CatalogRecord {
    #[must_use]
    pub fn new(id: impl Into<RecordId>, category: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            category: category.into(),
            ..Self::default()
        }
    }
}
