//! Pure domain logic for the notebook relay service.
//!
//! Everything in this crate is free of I/O: the RED document builder,
//! container image resolution, URL normalization, and the shared error
//! taxonomy. HTTP, database, and filesystem concerns live in the other
//! workspace crates.

pub mod error;
pub mod images;
pub mod red;
pub mod types;
pub mod url;
