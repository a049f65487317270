//! Table name -> schema plus bound backend, built once at startup.

use crate::backend::{Backend, FileBackend, PgBackend};
use crate::config::{resolve, BackendKind, FullConfig, ResolvedModel, ResolvedTable, Settings};
use crate::error::{AppError, ConfigError};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;

/// A resolved table and the backend that stores it.
#[derive(Clone)]
pub struct TableHandle {
    pub table: Arc<ResolvedTable>,
    pub backend: Arc<dyn Backend>,
}

pub struct TableRegistry {
    model: ResolvedModel,
    file: Arc<FileBackend>,
    pg: Option<Arc<PgBackend>>,
}

impl TableRegistry {
    /// Fails when a relational table is configured without a database pool.
    pub fn new(model: ResolvedModel, file: FileBackend, pool: Option<PgPool>) -> Result<Self, ConfigError> {
        if pool.is_none() {
            if let Some(t) = model.tables.iter().find(|t| t.backend == BackendKind::Relational) {
                return Err(ConfigError::MissingDatabaseUrl(t.name.clone()));
            }
        }
        Ok(TableRegistry {
            model,
            file: Arc::new(file),
            pg: pool.map(|p| Arc::new(PgBackend::new(p))),
        })
    }

    /// Validate and resolve the config, open the pool if any table needs it.
    pub async fn connect(settings: &Settings, config: &FullConfig) -> Result<Self, AppError> {
        let model = resolve(config)?;
        let file_tables: Vec<String> = model
            .tables
            .iter()
            .filter(|t| t.backend == BackendKind::File)
            .map(|t| t.name.clone())
            .collect();
        let file = FileBackend::new(&settings.data_dir, file_tables);
        let pool = if config.needs_database() {
            let url = settings.database_url.as_deref().ok_or_else(|| {
                let first = model
                    .tables
                    .iter()
                    .find(|t| t.backend == BackendKind::Relational)
                    .map(|t| t.name.clone())
                    .unwrap_or_default();
                ConfigError::MissingDatabaseUrl(first)
            })?;
            let pool = PgPoolOptions::new()
                .max_connections(settings.db_max_connections)
                .connect(url)
                .await?;
            tracing::info!(max_connections = settings.db_max_connections, "connected to database");
            Some(pool)
        } else {
            None
        };
        tracing::info!(tables = model.tables.len(), "table registry ready");
        Ok(Self::new(model, file, pool)?)
    }

    /// Look up a table by (case-insensitive) name.
    pub fn table(&self, name: &str) -> Result<TableHandle, AppError> {
        let table = self.model.table(name)?.clone();
        let backend: Arc<dyn Backend> = match table.backend {
            BackendKind::File => self.file.clone(),
            BackendKind::Relational => self
                .pg
                .clone()
                .ok_or_else(|| ConfigError::MissingDatabaseUrl(table.name.clone()))?,
        };
        Ok(TableHandle { table, backend })
    }

    pub fn model(&self) -> &ResolvedModel {
        &self.model
    }

    pub fn pool(&self) -> Option<&PgPool> {
        self.pg.as_deref().map(PgBackend::pool)
    }
}
