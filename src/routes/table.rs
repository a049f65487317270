//! Table routes. Each verb is reachable with the table in the path or as the single key of the body.

use crate::handlers::table::{
    add, add_table, delete as delete_handler, delete_table, search, search_table, update, update_table,
};
use crate::state::AppState;
use axum::{
    routing::{delete, get, post, put},
    Router,
};

pub fn table_routes(state: AppState) -> Router {
    Router::new()
        .route("/search", get(search).post(search))
        .route("/search/:table", get(search_table).post(search_table))
        .route("/add", post(add))
        .route("/add/:table", post(add_table))
        .route("/update", put(update).patch(update))
        .route("/update/:table", put(update_table).patch(update_table))
        .route("/delete", delete(delete_handler))
        .route("/delete/:table", delete(delete_table))
        .with_state(state)
}
