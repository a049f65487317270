//! Shared application state for all routes.

use crate::registry::TableRegistry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<TableRegistry>,
}

impl AppState {
    pub fn new(registry: TableRegistry) -> Self {
        AppState {
            registry: Arc::new(registry),
        }
    }
}
