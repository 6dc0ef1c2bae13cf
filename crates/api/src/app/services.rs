use std::sync::Arc;

use evergiven_infra::db::schema;
use evergiven_infra::{Backend, Database, DbError, OrderStore, SqlOrderStore};

/// Shared services handed to every handler.
pub struct AppServices {
    db: Database,
    store: Arc<dyn OrderStore>,
}

impl AppServices {
    /// Wire the SQL order store onto an already-verified database.
    pub fn new(db: Database) -> Self {
        let store: Arc<dyn OrderStore> = Arc::new(SqlOrderStore::new(db.clone()));
        Self { db, store }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn orders(&self) -> &dyn OrderStore {
        self.store.as_ref()
    }
}

/// Startup sequence: pick backend → connect + probe → ensure schema.
pub async fn build_services(database_url: &str) -> Result<AppServices, DbError> {
    let backend = Backend::from_url(database_url);
    tracing::info!(dialect = %backend.dialect(), "selected storage backend");

    let db = Database::connect(&backend).await?;
    schema::ensure_order_table(&db).await?;

    Ok(AppServices::new(db))
}
