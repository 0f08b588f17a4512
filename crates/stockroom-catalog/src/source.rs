use std::future::Future;
use std::pin::Pin;
use std::sync::RwLock;

use crate::error::CatalogError;
use crate::types::CatalogRecord;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Read side of the item catalog.
pub trait CatalogSource: Send + Sync {
    /// Return every item with its resolved storage location.
    fn list_all_records(&self) -> BoxFuture<'_, Result<Vec<CatalogRecord>, CatalogError>>;
}

/// Catalog held in process memory, used for tests and fixtures.
#[derive(Default)]
pub struct InMemoryCatalog {
    records: RwLock<Vec<CatalogRecord>>,
}

impl InMemoryCatalog {
    #[must_use]
    pub fn new(records: Vec<CatalogRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    /// Replace the catalog contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn replace(&self, records: Vec<CatalogRecord>) -> Result<(), CatalogError> {
        let mut guard = self
            .records
            .write()
            .map_err(|e| CatalogError::Other(e.to_string()))?;
        *guard = records;
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCatalog").finish_non_exhaustive()
    }
}

impl CatalogSource for InMemoryCatalog {
    fn list_all_records(&self) -> BoxFuture<'_, Result<Vec<CatalogRecord>, CatalogError>> {
        Box::pin(async move {
            let records = self
                .records
                .read()
                .map_err(|e| CatalogError::Other(e.to_string()))?;
            Ok(records.clone())
        })
    }
}
