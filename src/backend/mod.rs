//! Storage backends. A table is bound to one backend at startup. Every orchestrator call opens one
//! `Session`, does all its reads and writes through it, and commits once.
//!
//! - [`file::FileBackend`]: whole-table JSON document, read-modify-write under a per-table lock.
//! - [`postgres::PgBackend`]: one transaction per session; dropping an uncommitted session rolls back.

pub mod allocator;
pub mod file;
pub mod postgres;

use crate::config::{BackendKind, ResolvedTable};
use crate::error::AppError;
use crate::filter::{id_in, Predicate};
use crate::row::{Row, RowId};
use async_trait::async_trait;
use std::sync::Arc;

pub use file::FileBackend;
pub use postgres::PgBackend;

/// What a session will be used for. Read sessions must not mutate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intent {
    Read,
    Write,
}

/// How the rows an update/delete item targets are found.
#[derive(Clone, Debug, PartialEq)]
pub enum Selector {
    Ids(Vec<RowId>),
    Filter(Predicate),
}

impl Selector {
    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Selector::Ids(ids) => id_in(row, ids),
            Selector::Filter(p) => p.matches(row),
        }
    }
}

#[async_trait]
pub trait Backend: Send + Sync {
    fn kind(&self) -> BackendKind;

    async fn begin(&self, table: Arc<ResolvedTable>, intent: Intent) -> Result<Box<dyn Session>, AppError>;
}

#[async_trait]
pub trait Session: Send {
    /// Rows matching the selector, in table order.
    async fn select(&mut self, selector: &Selector) -> Result<Vec<Row>, AppError>;

    /// Store a new row (any `id` in it is ignored) and return its id.
    async fn insert(&mut self, row: Row) -> Result<RowId, AppError>;

    /// Overwrite fields of one row. `id` in `changes` is ignored.
    async fn update(&mut self, id: RowId, changes: &Row) -> Result<(), AppError>;

    async fn delete(&mut self, id: RowId) -> Result<(), AppError>;

    /// Make every change of this session durable at once.
    async fn commit(self: Box<Self>) -> Result<(), AppError>;
}
