//! Authentication and authorization primitives.
//!
//! - [`token`] -- Argon2id notebook-token hashing and verification.
//! - [`session`] -- opaque web-session token generation and hashing.

pub mod session;
pub mod token;
