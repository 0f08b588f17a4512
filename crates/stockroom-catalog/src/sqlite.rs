use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::error::CatalogError;
use crate::source::CatalogSource;
use crate::types::{CatalogRecord, RecordId, ResolvedLocation, TechnicalDetails};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

type ItemRow = (
    i64,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
);

const LIST_ITEMS_SQL: &str = "\
    SELECT i.id, i.category, i.subcategory, i.brand, i.model, i.technical_details, \
           s.name, c.name \
    FROM stored_items i \
    LEFT JOIN storage_shelves s ON s.id = i.shelf_id \
    LEFT JOIN storage_containers c ON c.id = i.container_id \
    ORDER BY i.id";

/// Catalog backed by the inventory `SQLite` database.
#[derive(Debug, Clone)]
pub struct SqliteCatalog {
    pool: SqlitePool,
}

impl SqliteCatalog {
    /// Open (or create) the database and run migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrations fail.
    pub async fn new(path: &str) -> Result<Self, CatalogError> {
        let in_memory = path == ":memory:";
        let url = if in_memory {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite:{path}?mode=rwc")
        };

        let opts = SqliteConnectOptions::from_str(&url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        // Every in-memory connection is a separate database.
        let max_connections = if in_memory { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(opts)
            .await?;

        sqlx::migrate!("../../migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Load every stored item joined with its shelf and container names.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn load_records(&self) -> Result<Vec<CatalogRecord>, CatalogError> {
        let rows: Vec<ItemRow> = sqlx::query_as(LIST_ITEMS_SQL)
            .fetch_all(&self.pool)
            .await?;
        tracing::debug!(count = rows.len(), "loaded catalog rows");
        Ok(rows.into_iter().map(record_from_row).collect())
    }
}

fn record_from_row(row: ItemRow) -> CatalogRecord {
    let (id, category, subcategory, brand, model, details, shelf, container) = row;
    let location = if shelf.is_some() || container.is_some() {
        Some(ResolvedLocation { shelf, container })
    } else {
        None
    };
    CatalogRecord {
        id: RecordId(id),
        category,
        subcategory,
        brand,
        model,
        technical_details: details
            .as_deref()
            .map(TechnicalDetails::from_column)
            .unwrap_or_default(),
        location,
    }
}

impl CatalogSource for SqliteCatalog {
    fn list_all_records(&self) -> BoxFuture<'_, Result<Vec<CatalogRecord>, CatalogError>> {
        Box::pin(self.load_records())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::NamedTempFile;

    use super::*;

    async fn seed(catalog: &SqliteCatalog) {
        let pool = catalog.pool();
        sqlx::query("INSERT INTO storage_shelves (id, name) VALUES (1, 'Shelf A')")
            .execute(pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO storage_containers (id, shelf_id, name, container_type) \
             VALUES (1, 1, 'Drawer 3', 'drawer')",
        )
        .execute(pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO stored_items (id, category, brand, technical_details, shelf_id, container_id) \
             VALUES (1, 'resistor', 'Yageo', '{\"description\": \"10k\", \"use_cases\": [\"pull-up\"]}', 1, 1)",
        )
        .execute(pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO stored_items (id, category, shelf_id) VALUES (2, 'capacitor', 1)")
            .execute(pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO stored_items (id, category, technical_details) VALUES (3, 'diode', 'fast recovery')")
            .execute(pool)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn empty_database_lists_nothing() {
        let catalog = SqliteCatalog::new(":memory:").await.unwrap();
        let records = catalog.list_all_records().await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn loads_records_with_locations() {
        let catalog = SqliteCatalog::new(":memory:").await.unwrap();
        seed(&catalog).await;

        let records = catalog.list_all_records().await.unwrap();
        assert_eq!(records.len(), 3);

        let resistor = &records[0];
        assert_eq!(resistor.id, RecordId(1));
        assert_eq!(resistor.brand.as_deref(), Some("Yageo"));
        assert_eq!(
            resistor.technical_details.description.as_deref(),
            Some("10k")
        );
        assert_eq!(resistor.technical_details.use_cases, vec!["pull-up"]);
        let loc = resistor.location.as_ref().unwrap();
        assert_eq!(loc.shelf.as_deref(), Some("Shelf A"));
        assert_eq!(loc.container.as_deref(), Some("Drawer 3"));

        let capacitor = &records[1];
        let loc = capacitor.location.as_ref().unwrap();
        assert_eq!(loc.shelf.as_deref(), Some("Shelf A"));
        assert!(loc.container.is_none());

        let diode = &records[2];
        assert!(diode.location.is_none());
        assert_eq!(
            diode.technical_details.description.as_deref(),
            Some("fast recovery")
        );
    }

    #[tokio::test]
    async fn wal_journal_mode_enabled_on_file_db() {
        let file = NamedTempFile::new().expect("tempfile");
        let path = file.path().to_str().expect("valid path");

        let catalog = SqliteCatalog::new(path).await.expect("SqliteCatalog::new");

        let mode: String = sqlx::query_scalar("PRAGMA journal_mode")
            .fetch_one(catalog.pool())
            .await
            .expect("PRAGMA query");

        assert_eq!(mode, "wal", "expected WAL journal mode, got: {mode}");
    }

    #[tokio::test]
    async fn reopening_file_db_keeps_items() {
        let file = NamedTempFile::new().expect("tempfile");
        let path = file.path().to_str().expect("valid path");

        {
            let catalog = SqliteCatalog::new(path).await.unwrap();
            seed(&catalog).await;
            catalog.pool().close().await;
        }

        let reopened = SqliteCatalog::new(path).await.unwrap();
        assert_eq!(reopened.list_all_records().await.unwrap().len(), 3);
    }
}
