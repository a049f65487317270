//! Parameterized PostgreSQL for relational tables. Identifiers come from validated config; values are always bound.

mod builder;
mod params;

pub use builder::{delete_by_id, insert, select_by_ids, select_matching, update_by_id, QueryBuf};
pub use params::PgBindValue;
