//! Search, add, update and delete over any backend. One session and one commit per batch.

use super::validation::RequestValidator;
use crate::backend::{Intent, Selector};
use crate::config::{ResolvedTable, ID_FIELD};
use crate::error::AppError;
use crate::filter::{FilterSpec, Predicate};
use crate::registry::TableHandle;
use crate::request::{DeleteRequest, UpdateRequest};
use crate::row::{row_id, Row, RowId};
use axum::http::StatusCode;
use serde::Serialize;

#[derive(Clone, Debug, Serialize)]
pub struct SearchOutcome {
    pub count: usize,
    pub results: Vec<Row>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verb {
    Added,
    Updated,
    Deleted,
}

impl Verb {
    fn phrase(self) -> &'static str {
        match self {
            Verb::Added => "added to",
            Verb::Updated => "updated in",
            Verb::Deleted => "deleted from",
        }
    }
}

/// Result of a write batch: affected ids in request order plus per-item warnings.
#[derive(Clone, Debug)]
pub struct MutationOutcome {
    pub verb: Verb,
    pub table: String,
    pub ids: Vec<RowId>,
    pub warnings: Vec<String>,
}

impl MutationOutcome {
    pub fn message(&self) -> String {
        format!(
            "{} object(s) {} '{}'",
            self.ids.len(),
            self.verb.phrase(),
            self.table
        )
    }

    /// `201` for adds; otherwise `200` when anything was affected and `404` when nothing was.
    pub fn status(&self) -> StatusCode {
        match self.verb {
            Verb::Added => StatusCode::CREATED,
            _ if self.ids.is_empty() => StatusCode::NOT_FOUND,
            _ => StatusCode::OK,
        }
    }
}

pub struct CrudService;

impl CrudService {
    /// Union of the rows matching each spec, in spec order, without dedup.
    pub async fn search(handle: &TableHandle, specs: &[FilterSpec]) -> Result<SearchOutcome, AppError> {
        let table = &handle.table;
        let predicates = specs
            .iter()
            .enumerate()
            .map(|(i, s)| Predicate::compile(s, table).map_err(|e| at_item("filter", i, e)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut session = handle.backend.begin(table.clone(), Intent::Read).await?;
        let mut results = Vec::new();
        for p in predicates {
            results.extend(session.select(&Selector::Filter(p)).await?);
        }
        session.commit().await?;

        for row in &mut results {
            table.strip_sensitive(row);
        }
        tracing::debug!(table = %table.name, specs = specs.len(), count = results.len(), "search");
        Ok(SearchOutcome {
            count: results.len(),
            results,
        })
    }

    /// Insert objects with defaults filled in. Every object is checked before anything is stored.
    pub async fn add(handle: &TableHandle, objects: Vec<Row>) -> Result<MutationOutcome, AppError> {
        let table = &handle.table;
        if objects.is_empty() {
            return Err(AppError::BadRequest("no objects given".into()));
        }
        let mut prepared = Vec::with_capacity(objects.len());
        let mut warnings = Vec::new();
        for (i, mut obj) in objects.into_iter().enumerate() {
            obj.remove(ID_FIELD);
            check_known_fields(table, &obj).map_err(|e| at_item("object", i, e))?;
            let mut filled = Vec::new();
            for (k, default) in &table.defaults {
                if !obj.contains_key(k) {
                    obj.insert(k.clone(), default.clone());
                    filled.push(format!("{}={}", k, default));
                }
            }
            RequestValidator::validate(&obj, &table.validation, &table.patterns).map_err(|e| at_item("object", i, e))?;
            if !filled.is_empty() {
                warnings.push(format!("object {}: auto-filled {}", i, filled.join(", ")));
            }
            prepared.push(obj);
        }

        let mut session = handle.backend.begin(table.clone(), Intent::Write).await?;
        let mut ids = Vec::with_capacity(prepared.len());
        for row in prepared {
            ids.push(session.insert(row).await?);
        }
        session.commit().await?;

        tracing::info!(table = %table.name, count = ids.len(), "objects added");
        Ok(MutationOutcome {
            verb: Verb::Added,
            table: table.name.clone(),
            ids,
            warnings,
        })
    }

    /// Apply each request's changes to the rows it targets. Requests that match nothing become warnings.
    pub async fn update(handle: &TableHandle, requests: Vec<UpdateRequest>) -> Result<MutationOutcome, AppError> {
        let table = &handle.table;
        if requests.is_empty() {
            return Err(AppError::BadRequest("no update requests given".into()));
        }
        let mut plans = Vec::with_capacity(requests.len());
        for (i, req) in requests.into_iter().enumerate() {
            let plan = Self::plan_update(table, req).map_err(|e| at_item("request", i, e))?;
            plans.push(plan);
        }

        let mut session = handle.backend.begin(table.clone(), Intent::Write).await?;
        let mut ids = Vec::new();
        let mut warnings = Vec::new();
        for (i, (selector, changes)) in plans.iter().enumerate() {
            let hit = session.select(selector).await?;
            if hit.is_empty() {
                warnings.push(no_match(table, i));
                continue;
            }
            for id in hit.iter().filter_map(row_id) {
                session.update(id, changes).await?;
                ids.push(id);
            }
        }
        session.commit().await?;

        tracing::info!(table = %table.name, count = ids.len(), misses = warnings.len(), "objects updated");
        Ok(MutationOutcome {
            verb: Verb::Updated,
            table: table.name.clone(),
            ids,
            warnings,
        })
    }

    /// Remove the rows each request targets. File tables are renumbered on commit.
    pub async fn delete(handle: &TableHandle, requests: Vec<DeleteRequest>) -> Result<MutationOutcome, AppError> {
        let table = &handle.table;
        if requests.is_empty() {
            return Err(AppError::BadRequest("no delete requests given".into()));
        }
        let selectors = requests
            .iter()
            .enumerate()
            .map(|(i, req)| {
                req.target()
                    .and_then(|t| t.selector(table))
                    .map_err(|e| at_item("request", i, e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut session = handle.backend.begin(table.clone(), Intent::Write).await?;
        let mut ids = Vec::new();
        let mut warnings = Vec::new();
        for (i, selector) in selectors.iter().enumerate() {
            let hit = session.select(selector).await?;
            if hit.is_empty() {
                warnings.push(no_match(table, i));
                continue;
            }
            for id in hit.iter().filter_map(row_id) {
                session.delete(id).await?;
                ids.push(id);
            }
        }
        session.commit().await?;

        tracing::info!(table = %table.name, count = ids.len(), misses = warnings.len(), "objects deleted");
        Ok(MutationOutcome {
            verb: Verb::Deleted,
            table: table.name.clone(),
            ids,
            warnings,
        })
    }

    fn plan_update(table: &ResolvedTable, req: UpdateRequest) -> Result<(Selector, Row), AppError> {
        let selector = req.target()?.selector(table)?;
        let mut changes = req.update;
        changes.remove(ID_FIELD);
        if changes.is_empty() {
            return Err(AppError::BadRequest("update cannot be empty".into()));
        }
        check_known_fields(table, &changes)?;
        RequestValidator::validate_partial(&changes, &table.validation, &table.patterns)?;
        Ok((selector, changes))
    }
}

fn check_known_fields(table: &ResolvedTable, row: &Row) -> Result<(), AppError> {
    match row.keys().find(|k| table.field(k).is_none()) {
        Some(k) => Err(AppError::BadRequest(format!(
            "unknown field '{}' for '{}'",
            k, table.name
        ))),
        None => Ok(()),
    }
}

fn no_match(table: &ResolvedTable, i: usize) -> String {
    tracing::warn!(table = %table.name, request = i, "no rows matched");
    format!("request {}: no rows matched in '{}'", i, table.name)
}

/// Prefix client errors with the index of the item that caused them.
fn at_item(what: &str, i: usize, e: AppError) -> AppError {
    match e {
        AppError::BadRequest(m) => AppError::BadRequest(format!("{} {}: {}", what, i, m)),
        AppError::Validation(m) => AppError::Validation(format!("{} {}: {}", what, i, m)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(verb: Verb, ids: Vec<RowId>) -> MutationOutcome {
        MutationOutcome {
            verb,
            table: "stock".into(),
            ids,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn status_follows_verb_and_hits() {
        assert_eq!(outcome(Verb::Added, vec![1]).status(), StatusCode::CREATED);
        assert_eq!(outcome(Verb::Updated, vec![1]).status(), StatusCode::OK);
        assert_eq!(outcome(Verb::Deleted, vec![]).status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn message_counts_ids() {
        assert_eq!(
            outcome(Verb::Deleted, vec![1, 3]).message(),
            "2 object(s) deleted from 'stock'"
        );
        assert_eq!(outcome(Verb::Added, vec![4]).message(), "1 object(s) added to 'stock'");
    }

    #[test]
    fn item_index_prefixes_client_errors_only() {
        let e = at_item("object", 2, AppError::BadRequest("boom".into()));
        assert_eq!(e.to_string(), "bad request: object 2: boom");
        let e = at_item("object", 2, AppError::Unauthorized);
        assert!(matches!(e, AppError::Unauthorized));
    }
}
