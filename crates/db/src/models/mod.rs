//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` entity struct matching the database row
//! - A create DTO for inserts
//! - Where needed, a `Serialize` response struct that omits secrets

pub mod cookie;
pub mod notebook;
pub mod session;
pub mod status;
pub mod user;
