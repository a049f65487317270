//! Filter DSL: parse filter objects into clauses, compile them against a table, evaluate over rows.

mod clause;
mod predicate;
pub use clause::*;
pub use predicate::*;
