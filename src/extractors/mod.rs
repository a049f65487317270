pub mod role;
pub use role::{CallerRole, CALLER_ROLE_HEADER};
