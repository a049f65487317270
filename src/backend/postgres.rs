//! Relational tables over PostgreSQL. Each session is one transaction; write sessions lock what they select.

use super::{Backend, Intent, Selector, Session};
use crate::config::{BackendKind, ResolvedTable, ID_FIELD};
use crate::error::AppError;
use crate::row::{Row, RowId};
use crate::sql::{self, PgBindValue, QueryBuf};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;

pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    pub fn new(pool: PgPool) -> Self {
        PgBackend { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Backend for PgBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Relational
    }

    async fn begin(&self, table: Arc<ResolvedTable>, intent: Intent) -> Result<Box<dyn Session>, AppError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgSession {
            tx,
            table,
            for_update: intent == Intent::Write,
        }))
    }
}

pub struct PgSession {
    tx: Transaction<'static, Postgres>,
    table: Arc<ResolvedTable>,
    for_update: bool,
}

impl PgSession {
    fn bind<'q>(q: &'q QueryBuf) -> sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query (tx)");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        query
    }

    async fn fetch_rows(&mut self, q: &QueryBuf) -> Result<Vec<Row>, AppError> {
        let rows = Self::bind(q).fetch_all(&mut *self.tx).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }
}

#[async_trait]
impl Session for PgSession {
    async fn select(&mut self, selector: &Selector) -> Result<Vec<Row>, AppError> {
        let q = match selector {
            Selector::Ids(ids) => sql::select_by_ids(&self.table, ids, self.for_update),
            Selector::Filter(p) => sql::select_matching(&self.table, p, self.for_update),
        };
        self.fetch_rows(&q).await
    }

    async fn insert(&mut self, row: Row) -> Result<RowId, AppError> {
        let q = sql::insert(&self.table, &row);
        let created = Self::bind(&q).fetch_one(&mut *self.tx).await?;
        row_to_json(&created)
            .get(ID_FIELD)
            .and_then(Value::as_i64)
            .ok_or_else(|| AppError::Db(sqlx::Error::RowNotFound))
    }

    async fn update(&mut self, id: RowId, changes: &Row) -> Result<(), AppError> {
        let Some(q) = sql::update_by_id(&self.table, id, changes) else {
            return Ok(());
        };
        Self::bind(&q).execute(&mut *self.tx).await?;
        Ok(())
    }

    async fn delete(&mut self, id: RowId) -> Result<(), AppError> {
        let q = sql::delete_by_id(&self.table, id);
        Self::bind(&q).execute(&mut *self.tx).await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        self.tx.commit().await?;
        Ok(())
    }
}

fn row_to_json(row: &sqlx::postgres::PgRow) -> Row {
    use sqlx::Column;
    use sqlx::Row as _;
    row.columns()
        .iter()
        .map(|col| (col.name().to_string(), cell_to_value(row, col.name())))
        .collect()
}

/// Decode one cell by trying the column types this crate selects. Unknown types come back as null.
fn cell_to_value(row: &sqlx::postgres::PgRow, name: &str) -> Value {
    use sqlx::Row as _;
    if let Ok(v) = row.try_get::<Option<i64>, _>(name) {
        return v.map(|n| Value::Number(n.into())).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<i32>, _>(name) {
        return v.map(|n| Value::Number(n.into())).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(name) {
        return v
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(name) {
        return v.map(Value::Bool).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return v.map(|d| Value::String(d.to_rfc3339())).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return v
            .map(|d| Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string()))
            .unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return v
            .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
            .unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(name) {
        return v.map(Value::String).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<Value>, _>(name) {
        return v.unwrap_or(Value::Null);
    }
    Value::Null
}
