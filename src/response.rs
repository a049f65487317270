//! Response bodies for the table routes.

use crate::row::RowId;
use crate::service::{MutationOutcome, SearchOutcome};
use axum::{http::StatusCode, Json};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Serialize)]
pub struct MutationBody {
    pub message: String,
    pub ids: Vec<RowId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Add/update/delete outcome with its status: 201 for adds, 404 when nothing was affected.
pub fn mutation(outcome: MutationOutcome) -> (StatusCode, Json<MutationBody>) {
    let status = outcome.status();
    let message = outcome.message();
    (
        status,
        Json(MutationBody {
            message,
            ids: outcome.ids,
            warnings: outcome.warnings,
        }),
    )
}

/// `{<table>: {count, results}}`, one entry per table searched.
pub fn search_results(outcomes: Vec<(String, SearchOutcome)>) -> (StatusCode, Json<Value>) {
    let mut body = Map::new();
    for (table, outcome) in outcomes {
        body.insert(
            table,
            serde_json::to_value(outcome).unwrap_or(Value::Null),
        );
    }
    (StatusCode::OK, Json(Value::Object(body)))
}
