//! Ownership of the published index snapshot.
//!
//! Readers take an `Arc` clone of the current snapshot and never observe a
//! partially built one. Refreshes are serialized: while one is running,
//! another call fails fast with [`RagError::RefreshInProgress`]. A failed or
//! cancelled refresh clears the published snapshot so that queries report
//! not-ready instead of answering from stale data.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use stockroom_catalog::CatalogSource;
use stockroom_llm::LlmProvider;

use crate::builder::EmbeddingIndexBuilder;
use crate::error::{RagError, Result};
use crate::snapshot::IndexSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Uninitialized,
    Ready,
}

/// Point-in-time view of the index for status endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStatus {
    pub state: LifecycleState,
    pub item_count: usize,
    pub refreshing: bool,
    pub generation: u64,
    pub model: Option<String>,
    pub built_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl IndexStatus {
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state == LifecycleState::Ready
    }
}

#[derive(Default)]
struct Published {
    snapshot: Option<Arc<IndexSnapshot>>,
    generation: u64,
    last_error: Option<String>,
}

pub struct IndexLifecycleManager<P> {
    catalog: Arc<dyn CatalogSource>,
    builder: EmbeddingIndexBuilder<P>,
    published: RwLock<Published>,
    refreshing: AtomicBool,
}

impl<P: LlmProvider> IndexLifecycleManager<P> {
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogSource>, builder: EmbeddingIndexBuilder<P>) -> Self {
        Self {
            catalog,
            builder,
            published: RwLock::new(Published::default()),
            refreshing: AtomicBool::new(false),
        }
    }

    /// Rebuild the index from the catalog and publish it.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::RefreshInProgress`] if another refresh is running,
    /// otherwise whatever the catalog read or the build failed with. On
    /// failure the index is left uninitialized.
    pub async fn refresh(&self) -> Result<Arc<IndexSnapshot>> {
        let Some(mut guard) = RefreshGuard::acquire(self) else {
            tracing::warn!("rejecting refresh: another refresh is in progress");
            return Err(RagError::RefreshInProgress);
        };

        tracing::info!("refreshing embeddings");
        let outcome = self.rebuild().await;
        guard.settled = true;

        match outcome {
            Ok(snapshot) => {
                let snapshot = self.publish(snapshot);
                tracing::info!(
                    generation = snapshot.generation(),
                    items = snapshot.len(),
                    "embeddings refreshed"
                );
                Ok(snapshot)
            }
            Err(e) => {
                tracing::error!("embeddings refresh failed: {e}");
                self.clear(e.to_string());
                Err(e)
            }
        }
    }

    async fn rebuild(&self) -> Result<IndexSnapshot> {
        let records = self.catalog.list_all_records().await?;
        tracing::debug!(records = records.len(), "catalog loaded for refresh");
        self.builder.build(&records).await
    }

    fn publish(&self, snapshot: IndexSnapshot) -> Arc<IndexSnapshot> {
        let mut published = self.published.write().unwrap_or_else(PoisonError::into_inner);
        published.generation += 1;
        let snapshot = Arc::new(snapshot.with_generation(published.generation));
        published.snapshot = Some(Arc::clone(&snapshot));
        published.last_error = None;
        snapshot
    }

    fn clear(&self, reason: String) {
        let mut published = self.published.write().unwrap_or_else(PoisonError::into_inner);
        published.snapshot = None;
        published.last_error = Some(reason);
    }

    /// The currently published snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::NotReady`] when nothing is published.
    pub fn current(&self) -> Result<Arc<IndexSnapshot>> {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot
            .clone()
            .ok_or(RagError::NotReady)
    }

    #[must_use]
    pub fn status(&self) -> IndexStatus {
        let published = self.published.read().unwrap_or_else(PoisonError::into_inner);
        let snapshot = published.snapshot.as_deref();
        IndexStatus {
            state: if snapshot.is_some() {
                LifecycleState::Ready
            } else {
                LifecycleState::Uninitialized
            },
            item_count: snapshot.map_or(0, IndexSnapshot::len),
            refreshing: self.refreshing.load(Ordering::Acquire),
            generation: snapshot.map_or(0, IndexSnapshot::generation),
            model: snapshot.map(|s| s.model().to_owned()),
            built_at: snapshot.map(IndexSnapshot::built_at),
            last_error: published.last_error.clone(),
        }
    }
}

/// Holds the single refresh slot. Dropping it before the refresh settled
/// means the refresh future was cancelled, which counts as a failure.
struct RefreshGuard<'a, P: LlmProvider> {
    manager: &'a IndexLifecycleManager<P>,
    settled: bool,
}

impl<'a, P: LlmProvider> RefreshGuard<'a, P> {
    fn acquire(manager: &'a IndexLifecycleManager<P>) -> Option<Self> {
        manager
            .refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                manager,
                settled: false,
            })
    }
}

impl<P: LlmProvider> Drop for RefreshGuard<'_, P> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!("embeddings refresh cancelled");
            self.manager.clear("refresh cancelled".to_owned());
        }
        self.manager.refreshing.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use stockroom_catalog::{CatalogRecord, InMemoryCatalog, RecordId, TechnicalDetails};
    use stockroom_llm::mock::MockProvider;

    use super::*;
    use crate::builder::BuilderConfig;

    fn manager(
        provider: MockProvider,
        catalog: Arc<InMemoryCatalog>,
    ) -> IndexLifecycleManager<MockProvider> {
        let builder = EmbeddingIndexBuilder::new(Arc::new(provider), BuilderConfig::default());
        IndexLifecycleManager::new(catalog, builder)
    }

    fn catalog(n: i64) -> Arc<InMemoryCatalog> {
        Arc::new(InMemoryCatalog::new(
            (1..=n).map(|id| CatalogRecord::new(id, "resistor")).collect(),
        ))
    }

    #[tokio::test]
    async fn starts_uninitialized() {
        let m = manager(MockProvider::default(), catalog(2));
        assert!(matches!(m.current(), Err(RagError::NotReady)));
        let status = m.status();
        assert_eq!(status.state, LifecycleState::Uninitialized);
        assert_eq!(status.item_count, 0);
        assert!(!status.refreshing);
        assert!(status.last_error.is_none());
    }

    #[tokio::test]
    async fn refresh_publishes_snapshot() {
        let provider = MockProvider::default().with_model("text-embedding-3-small");
        let m = manager(provider, catalog(3));
        let snapshot = m.refresh().await.unwrap();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.model(), "text-embedding-3-small");
        assert_eq!(snapshot.generation(), 1);

        let status = m.status();
        assert!(status.is_ready());
        assert_eq!(status.item_count, 3);
        assert_eq!(status.model.as_deref(), Some("text-embedding-3-small"));
        assert!(status.built_at.is_some());
    }

    #[tokio::test]
    async fn refresh_replaces_snapshot_wholesale() {
        let cat = catalog(3);
        let m = manager(MockProvider::default(), Arc::clone(&cat));
        let first = m.refresh().await.unwrap();

        cat.replace(vec![CatalogRecord::new(10, "diode")]).unwrap();
        let second = m.refresh().await.unwrap();

        assert_eq!(second.generation(), 2);
        assert_eq!(second.len(), 1);
        assert_eq!(second.entries()[0].record_id, RecordId(10));
        // Old readers keep their own copy.
        assert_eq!(first.len(), 3);
        assert_eq!(m.current().unwrap().generation(), 2);
    }

    #[tokio::test]
    async fn empty_catalog_is_ready_with_zero_items() {
        let m = manager(MockProvider::default(), catalog(0));
        m.refresh().await.unwrap();
        let status = m.status();
        assert!(status.is_ready());
        assert_eq!(status.item_count, 0);
    }

    #[tokio::test]
    async fn failed_refresh_records_error() {
        let mut provider = MockProvider::default();
        provider.fail_batch_after = Some(1);
        let m = manager(provider, catalog(15));

        m.refresh().await.unwrap_err();
        assert!(matches!(m.current(), Err(RagError::NotReady)));
        let status = m.status();
        assert_eq!(status.state, LifecycleState::Uninitialized);
        assert!(status.last_error.unwrap().contains("mock embedding error"));
        assert!(!status.refreshing);
    }

    #[tokio::test]
    async fn failure_after_success_drops_old_snapshot() {
        let mut provider = MockProvider::default();
        provider.fail_batch_after = Some(2);
        let m = manager(provider, catalog(5));

        // First refresh uses one batch.
        m.refresh().await.unwrap();
        assert!(m.current().is_ok());
        // Second refresh uses the second batch and succeeds.
        m.refresh().await.unwrap();
        // Third refresh fails.
        let err = m.refresh().await.unwrap_err();
        assert!(matches!(err, RagError::Upstream(_)));
        assert!(matches!(m.current(), Err(RagError::NotReady)));
    }

    #[tokio::test]
    async fn concurrent_refresh_is_rejected() {
        let provider = MockProvider::default().with_delay(50);
        let m = manager(provider, catalog(3));

        let (first, second) = tokio::join!(m.refresh(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            m.refresh().await
        });

        assert!(first.is_ok());
        assert!(matches!(second, Err(RagError::RefreshInProgress)));
        assert_eq!(m.current().unwrap().generation(), 1);
        assert!(!m.status().refreshing);
    }

    #[tokio::test]
    async fn readers_see_old_snapshot_during_refresh() {
        let cat = catalog(2);
        let m = manager(MockProvider::default().with_delay(50), Arc::clone(&cat));
        m.refresh().await.unwrap();

        cat.replace((1..=4).map(|id| CatalogRecord::new(id, "capacitor")).collect())
            .unwrap();

        let (refreshed, seen) = tokio::join!(m.refresh(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let status = m.status();
            (m.current().unwrap().len(), status.refreshing)
        });

        assert_eq!(seen, (2, true));
        assert_eq!(refreshed.unwrap().len(), 4);
        assert_eq!(m.current().unwrap().len(), 4);
    }

    fn assert_send<T: Send>(_: T) {}

    fn refresh_is_send<P: LlmProvider + 'static>(m: &IndexLifecycleManager<P>) {
        assert_send(m.refresh());
    }

    #[test]
    fn refresh_future_is_send_for_any_provider() {
        refresh_is_send(&manager(MockProvider::default(), catalog(1)));
    }

    #[tokio::test]
    async fn rebuild_of_unchanged_catalog_projects_identical_text() {
        let records = vec![
            CatalogRecord {
                brand: Some("Yageo".into()),
                technical_details: TechnicalDetails {
                    description: Some("10k ohm, 1/4W".into()),
                    use_cases: vec!["pull-up".into(), "divider".into()],
                },
                ..CatalogRecord::new(1, "resistor")
            },
            CatalogRecord::new(2, "capacitor"),
        ];
        let m = manager(
            MockProvider::default(),
            Arc::new(InMemoryCatalog::new(records)),
        );

        let first = m.refresh().await.unwrap();
        let second = m.refresh().await.unwrap();

        assert_eq!(first.len(), second.len());
        for (a, b) in first.entries().iter().zip(second.entries()) {
            assert_eq!(a.record_id, b.record_id);
            assert_eq!(a.text, b.text);
        }
    }

    #[tokio::test]
    async fn cancelled_refresh_counts_as_failure() {
        let m = manager(MockProvider::default().with_delay(200), catalog(2));
        m.refresh().await.unwrap();

        let timed_out = tokio::time::timeout(Duration::from_millis(20), m.refresh()).await;
        assert!(timed_out.is_err());

        assert!(matches!(m.current(), Err(RagError::NotReady)));
        let status = m.status();
        assert!(!status.refreshing);
        assert_eq!(status.last_error.as_deref(), Some("refresh cancelled"));
    }
}
