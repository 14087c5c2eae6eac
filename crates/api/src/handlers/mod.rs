//! HTTP request handlers, grouped by resource.

pub mod auth;
pub mod callbacks;
pub mod images;
pub mod notebooks;
