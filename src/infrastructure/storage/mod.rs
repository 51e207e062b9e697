//! Storage backends and selection

mod factory;
mod postgres;

pub use factory::{BackendFactory, StorageConfig, StorageType};
pub use postgres::{connect_pool, PostgresConfig};
