use std::sync::Arc;

use callboard_events::ProgressHub;
use callboard_pipeline::{ImportJobStore, ImportService, PgImportStore};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything inside is behind `Arc` or is already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: callboard_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Progress subscribers (SSE streams).
    pub progress_hub: Arc<ProgressHub>,
    /// Admits and runs spreadsheet imports.
    pub imports: ImportService,
}

impl AppState {
    /// Wire the progress hub, job slot and Postgres-backed import service.
    pub fn new(pool: callboard_db::DbPool, config: ServerConfig) -> Self {
        let progress_hub = Arc::new(ProgressHub::new());
        let jobs = Arc::new(ImportJobStore::new(Arc::clone(&progress_hub)));
        let store = Arc::new(PgImportStore::new(pool.clone()));
        let imports = ImportService::new(store, jobs, config.import);

        Self {
            pool,
            config: Arc::new(config),
            progress_hub,
            imports,
        }
    }

    /// The import job slot and its current snapshot.
    pub fn jobs(&self) -> &Arc<ImportJobStore> {
        self.imports.jobs()
    }
}
