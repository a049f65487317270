//! tablekit: schema-driven CRUD over file-backed and PostgreSQL tables.

pub mod backend;
pub mod config;
pub mod error;
pub mod extractors;
pub mod filter;
pub mod handlers;
pub mod registry;
pub mod request;
pub mod response;
pub mod routes;
pub mod row;
pub mod service;
pub mod sql;
pub mod state;

pub use config::{load_from_path, resolve, validate, FullConfig, ResolvedModel, ResolvedTable, Settings};
pub use error::{AppError, ConfigError, StorageError};
pub use registry::{TableHandle, TableRegistry};
pub use routes::{app, common_routes, table_routes};
pub use row::{Row, RowId};
pub use service::{CrudService, MutationOutcome, SearchOutcome};
pub use state::AppState;
