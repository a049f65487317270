//! CrudService: search/add/update/delete against a table's backend.

mod crud;
mod validation;
pub use crud::{CrudService, MutationOutcome, SearchOutcome, Verb};
pub use validation::RequestValidator;
