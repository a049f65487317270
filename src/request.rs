//! Request payload shapes: per-table splitting, item lists and update/delete targets.

use crate::backend::Selector;
use crate::config::ResolvedTable;
use crate::error::AppError;
use crate::filter::{FilterSpec, Predicate};
use crate::row::{Row, RowId};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateRequest {
    #[serde(default)]
    pub ids: Option<Vec<RowId>>,
    #[serde(default)]
    pub filter: Option<FilterSpec>,
    pub update: Row,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteRequest {
    #[serde(default)]
    pub ids: Option<Vec<RowId>>,
    #[serde(default)]
    pub filter: Option<FilterSpec>,
}

/// Rows an update or delete applies to. Ids win over a filter when both are given.
#[derive(Clone, Debug, PartialEq)]
pub enum Target {
    Ids(Vec<RowId>),
    Filter(FilterSpec),
}

impl Target {
    pub fn from_parts(ids: Option<&Vec<RowId>>, filter: Option<&FilterSpec>) -> Result<Self, AppError> {
        match (ids, filter) {
            (Some(ids), _) if !ids.is_empty() => Ok(Target::Ids(ids.clone())),
            (_, Some(f)) if f.has_criteria() => Ok(Target::Filter(f.clone())),
            (Some(_), _) => Err(AppError::BadRequest("ids cannot be empty".into())),
            (None, Some(_)) => Err(AppError::BadRequest("filter cannot be empty".into())),
            (None, None) => Err(AppError::BadRequest("either ids or filter is required".into())),
        }
    }

    pub fn selector(&self, table: &ResolvedTable) -> Result<Selector, AppError> {
        Ok(match self {
            Target::Ids(ids) => Selector::Ids(ids.clone()),
            Target::Filter(spec) => Selector::Filter(Predicate::compile(spec, table)?),
        })
    }
}

impl UpdateRequest {
    pub fn target(&self) -> Result<Target, AppError> {
        Target::from_parts(self.ids.as_ref(), self.filter.as_ref())
    }
}

impl DeleteRequest {
    pub fn target(&self) -> Result<Target, AppError> {
        Target::from_parts(self.ids.as_ref(), self.filter.as_ref())
    }
}

/// Split a decoded body into `(table, payload)` pairs.
///
/// With a table in the path the whole body belongs to it. Otherwise the body is an object keyed by table name;
/// `multi_table` allows more than one key (search only).
pub fn split_payload(
    path_table: Option<&str>,
    body: Value,
    multi_table: bool,
) -> Result<Vec<(String, Value)>, AppError> {
    if let Some(table) = path_table {
        return Ok(vec![(table.to_lowercase(), body)]);
    }
    let Value::Object(map) = body else {
        return Err(AppError::BadRequest(
            "body must be an object keyed by table name".into(),
        ));
    };
    if map.is_empty() {
        return Err(AppError::BadRequest("body names no table".into()));
    }
    if !multi_table && map.len() != 1 {
        return Err(AppError::BadRequest(format!(
            "expected exactly one table, got {}",
            map.len()
        )));
    }
    Ok(map.into_iter().map(|(k, v)| (k.to_lowercase(), v)).collect())
}

/// A single item or a list of items. Errors name the offending index.
pub fn parse_items<T: DeserializeOwned>(payload: Value, what: &str) -> Result<Vec<T>, AppError> {
    let items = match payload {
        Value::Array(items) => items,
        other => vec![other],
    };
    if items.is_empty() {
        return Err(AppError::BadRequest(format!("no {} given", what)));
    }
    items
        .into_iter()
        .enumerate()
        .map(|(i, v)| {
            serde_json::from_value(v).map_err(|e| AppError::BadRequest(format!("{} {}: {}", what, i, e)))
        })
        .collect()
}

/// Search payload: null or absent means one spec matching everything.
pub fn parse_search_specs(payload: Value) -> Result<Vec<FilterSpec>, AppError> {
    if payload.is_null() {
        return Ok(vec![FilterSpec::default()]);
    }
    parse_items(payload, "filter")
}

/// Decode a raw body. An empty body is `null`.
pub fn decode_body(bytes: &[u8]) -> Result<Value, AppError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes).map_err(|e| AppError::BadRequest(format!("invalid JSON body: {}", e)))
}
