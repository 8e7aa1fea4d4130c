//! Request validation and query DTOs.
//!
//! Bodies are forwarded upstream as-is; validation only checks the fields the
//! proxy itself depends on.

mod query;
mod responses;

pub use query::{ListQuery, RetrieveQuery};
pub use responses::{CreateResponseRequest, validate_id, validate_object_body};
