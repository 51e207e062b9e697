//! User infrastructure module
//!
//! This module provides the user directory together with its in-memory and
//! PostgreSQL backends.

mod directory;
mod postgres_repository;
mod repository;

pub use directory::UserDirectory;
pub use postgres_repository::PostgresUserBackend;
pub use repository::InMemoryUserBackend;
