//! HTTP handlers for the table routes.

pub mod table;
pub use table::*;
