//! Table handlers: search, add, update, delete, with or without the table in the path.
//! The caller's role is checked against every named table before any backend work.

use crate::config::Access;
use crate::error::AppError;
use crate::extractors::CallerRole;
use crate::filter::FilterSpec;
use crate::registry::TableHandle;
use crate::request::{decode_body, parse_items, parse_search_specs, split_payload, DeleteRequest, UpdateRequest};
use crate::response::{mutation, search_results, MutationBody};
use crate::row::Row;
use crate::service::CrudService;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

/// Resolve the single table a write names and gate it on the caller's role.
fn write_target(
    state: &AppState,
    role: &CallerRole,
    path_table: Option<&str>,
    body: &Bytes,
) -> Result<(TableHandle, Value), AppError> {
    let body = decode_body(body)?;
    let (name, payload) = split_payload(path_table, body, false)?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::BadRequest("body names no table".into()))?;
    let handle = state.registry.table(&name)?;
    handle.table.authorize(Access::Write, role.as_deref())?;
    Ok((handle, payload))
}

async fn run_search(
    state: AppState,
    role: CallerRole,
    path_table: Option<&str>,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let body = decode_body(&body)?;
    let mut plans: Vec<(TableHandle, Vec<FilterSpec>)> = Vec::new();
    for (name, payload) in split_payload(path_table, body, true)? {
        let handle = state.registry.table(&name)?;
        handle.table.authorize(Access::Read, role.as_deref())?;
        plans.push((handle, parse_search_specs(payload)?));
    }
    let mut outcomes = Vec::with_capacity(plans.len());
    for (handle, specs) in plans {
        let outcome = CrudService::search(&handle, &specs).await?;
        outcomes.push((handle.table.name.clone(), outcome));
    }
    Ok(search_results(outcomes))
}

pub async fn search(
    State(state): State<AppState>,
    role: CallerRole,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), AppError> {
    run_search(state, role, None, body).await
}

pub async fn search_table(
    State(state): State<AppState>,
    Path(table): Path<String>,
    role: CallerRole,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), AppError> {
    run_search(state, role, Some(&table), body).await
}

async fn run_add(
    state: AppState,
    role: CallerRole,
    path_table: Option<&str>,
    body: Bytes,
) -> Result<(StatusCode, Json<MutationBody>), AppError> {
    let (handle, payload) = write_target(&state, &role, path_table, &body)?;
    let objects: Vec<Row> = parse_items(payload, "object")?;
    Ok(mutation(CrudService::add(&handle, objects).await?))
}

pub async fn add(
    State(state): State<AppState>,
    role: CallerRole,
    body: Bytes,
) -> Result<(StatusCode, Json<MutationBody>), AppError> {
    run_add(state, role, None, body).await
}

pub async fn add_table(
    State(state): State<AppState>,
    Path(table): Path<String>,
    role: CallerRole,
    body: Bytes,
) -> Result<(StatusCode, Json<MutationBody>), AppError> {
    run_add(state, role, Some(&table), body).await
}

async fn run_update(
    state: AppState,
    role: CallerRole,
    path_table: Option<&str>,
    body: Bytes,
) -> Result<(StatusCode, Json<MutationBody>), AppError> {
    let (handle, payload) = write_target(&state, &role, path_table, &body)?;
    let requests: Vec<UpdateRequest> = parse_items(payload, "request")?;
    Ok(mutation(CrudService::update(&handle, requests).await?))
}

pub async fn update(
    State(state): State<AppState>,
    role: CallerRole,
    body: Bytes,
) -> Result<(StatusCode, Json<MutationBody>), AppError> {
    run_update(state, role, None, body).await
}

pub async fn update_table(
    State(state): State<AppState>,
    Path(table): Path<String>,
    role: CallerRole,
    body: Bytes,
) -> Result<(StatusCode, Json<MutationBody>), AppError> {
    run_update(state, role, Some(&table), body).await
}

async fn run_delete(
    state: AppState,
    role: CallerRole,
    path_table: Option<&str>,
    body: Bytes,
) -> Result<(StatusCode, Json<MutationBody>), AppError> {
    let (handle, payload) = write_target(&state, &role, path_table, &body)?;
    let requests: Vec<DeleteRequest> = parse_items(payload, "request")?;
    Ok(mutation(CrudService::delete(&handle, requests).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    role: CallerRole,
    body: Bytes,
) -> Result<(StatusCode, Json<MutationBody>), AppError> {
    run_delete(state, role, None, body).await
}

pub async fn delete_table(
    State(state): State<AppState>,
    Path(table): Path<String>,
    role: CallerRole,
    body: Bytes,
) -> Result<(StatusCode, Json<MutationBody>), AppError> {
    run_delete(state, role, Some(&table), body).await
}
