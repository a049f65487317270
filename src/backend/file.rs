//! File-backed tables: one JSON document per table, `{"<table>": [rows]}`.
//!
//! A write session takes the table's mutex, loads every row, mutates in memory and persists once on commit.
//! Persisting writes and syncs `<table>.json.tmp`, then renames it over the original.

use super::allocator::{next_id, renumber};
use super::{Backend, Intent, Selector, Session};
use crate::config::{BackendKind, ResolvedTable, ID_FIELD};
use crate::error::{AppError, StorageError};
use crate::row::{row_id, Row, RowId};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, OwnedMutexGuard};

pub struct FileBackend {
    dir: PathBuf,
    locks: HashMap<String, Arc<Mutex<()>>>,
}

impl FileBackend {
    pub fn new<I, S>(dir: impl Into<PathBuf>, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let locks = tables
            .into_iter()
            .map(|t| (t.into(), Arc::new(Mutex::new(()))))
            .collect();
        FileBackend {
            dir: dir.into(),
            locks,
        }
    }

    pub fn table_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{}.json", table))
    }
}

#[async_trait]
impl Backend for FileBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::File
    }

    async fn begin(&self, table: Arc<ResolvedTable>, intent: Intent) -> Result<Box<dyn Session>, AppError> {
        let lock = self
            .locks
            .get(&table.name)
            .ok_or_else(|| AppError::NotFound(format!("table '{}' is not file-backed", table.name)))?;
        let guard = match intent {
            Intent::Write => Some(lock.clone().lock_owned().await),
            Intent::Read => None,
        };
        let path = self.table_path(&table.name);
        let rows = load_all(&path, &table.name).await?;
        Ok(Box::new(FileSession {
            table,
            path,
            rows,
            dirty: false,
            deleted: false,
            _guard: guard,
        }))
    }
}

pub struct FileSession {
    table: Arc<ResolvedTable>,
    path: PathBuf,
    rows: Vec<Row>,
    dirty: bool,
    deleted: bool,
    _guard: Option<OwnedMutexGuard<()>>,
}

impl FileSession {
    fn position(&self, id: RowId) -> Result<usize, AppError> {
        self.rows
            .iter()
            .position(|r| row_id(r) == Some(id))
            .ok_or_else(|| AppError::NotFound(format!("row {} in '{}'", id, self.table.name)))
    }
}

#[async_trait]
impl Session for FileSession {
    async fn select(&mut self, selector: &Selector) -> Result<Vec<Row>, AppError> {
        Ok(self.rows.iter().filter(|r| selector.matches(r)).cloned().collect())
    }

    async fn insert(&mut self, mut row: Row) -> Result<RowId, AppError> {
        let id = next_id(&self.rows).ok_or_else(|| StorageError::Corrupt {
            file: self.path.display().to_string(),
            reason: format!("no id left after {}", RowId::MAX),
        })?;
        row.insert(ID_FIELD.to_string(), Value::Number(id.into()));
        self.rows.push(row);
        self.dirty = true;
        Ok(id)
    }

    async fn update(&mut self, id: RowId, changes: &Row) -> Result<(), AppError> {
        let at = self.position(id)?;
        let row = &mut self.rows[at];
        for (k, v) in changes {
            if k != ID_FIELD {
                row.insert(k.clone(), v.clone());
            }
        }
        self.dirty = true;
        Ok(())
    }

    async fn delete(&mut self, id: RowId) -> Result<(), AppError> {
        let at = self.position(id)?;
        self.rows.remove(at);
        self.dirty = true;
        self.deleted = true;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let mut session = *self;
        if !session.dirty {
            return Ok(());
        }
        if session.deleted {
            renumber(&mut session.rows);
        }
        persist_all(&session.path, &session.table.name, &session.rows).await?;
        Ok(())
    }
}

/// Read every row of a table file. A missing file is an empty table.
pub async fn load_all(path: &Path, table: &str) -> Result<Vec<Row>, StorageError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(table = %table, path = %path.display(), "table file missing, starting empty");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };
    let corrupt = |reason: String| StorageError::Corrupt {
        file: path.display().to_string(),
        reason,
    };
    let doc: Value = serde_json::from_slice(&bytes)?;
    let Value::Object(mut doc) = doc else {
        return Err(corrupt("top level is not an object".into()));
    };
    let rows = match doc.remove(table) {
        None => Vec::new(),
        Some(Value::Array(items)) => {
            let mut rows = Vec::with_capacity(items.len());
            let mut seen = HashSet::new();
            for (i, item) in items.into_iter().enumerate() {
                let Value::Object(row) = item else {
                    return Err(corrupt(format!("row {} is not an object", i)));
                };
                let id = row_id(&row).ok_or_else(|| corrupt(format!("row {} has no integer id", i)))?;
                if !seen.insert(id) {
                    return Err(corrupt(format!("duplicate id {}", id)));
                }
                rows.push(row);
            }
            rows
        }
        Some(_) => return Err(corrupt(format!("'{}' is not an array", table))),
    };
    tracing::debug!(table = %table, rows = rows.len(), "loaded table file");
    Ok(rows)
}

/// Write every row of a table file through a temporary file and a rename.
pub async fn persist_all(path: &Path, table: &str, rows: &[Row]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let mut doc = serde_json::Map::new();
    doc.insert(
        table.to_string(),
        Value::Array(rows.iter().cloned().map(Value::Object).collect()),
    );
    let body = serde_json::to_vec_pretty(&Value::Object(doc))?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(&body).await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(&tmp, path).await?;
    tracing::debug!(table = %table, rows = rows.len(), "persisted table file");
    Ok(())
}
