//! CC-Agency REST client library.
//!
//! Provides typed batch models, cookie-based authentication, RED
//! submission, batch listing and cancellation, and debug info retrieval
//! for integrating with CC-Agency execution backends.

pub mod api;
pub mod batch;
