//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod cookie_repo;
pub mod notebook_repo;
pub mod session_repo;
pub mod user_repo;

pub use cookie_repo::CookieRepo;
pub use notebook_repo::NotebookRepo;
pub use session_repo::SessionRepo;
pub use user_repo::UserRepo;
