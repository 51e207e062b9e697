//! Backend factory for runtime storage selection

use std::sync::Arc;

use tracing::info;

use crate::domain::user::UserBackend;
use crate::domain::DomainError;
use crate::infrastructure::user::{InMemoryUserBackend, PostgresUserBackend};

use super::postgres::PostgresConfig;

/// Supported storage types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    /// In-memory storage (for testing/development)
    InMemory,
    /// PostgreSQL storage
    Postgres,
}

impl StorageType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "memory" | "inmemory" | "in-memory" | "in_memory" => Some(Self::InMemory),
            "postgres" | "postgresql" | "pg" => Some(Self::Postgres),
            _ => None,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone)]
pub enum StorageConfig {
    /// In-memory storage configuration
    InMemory,
    /// PostgreSQL storage configuration
    Postgres(PostgresConfig),
}

impl StorageConfig {
    /// Creates an in-memory storage configuration
    pub fn in_memory() -> Self {
        Self::InMemory
    }

    /// Creates a PostgreSQL storage configuration
    pub fn postgres(config: PostgresConfig) -> Self {
        Self::Postgres(config)
    }

    /// Creates a PostgreSQL configuration from a URL
    pub fn postgres_url(url: impl Into<String>) -> Self {
        Self::Postgres(PostgresConfig::new(url))
    }

    /// Returns the storage type
    pub fn storage_type(&self) -> StorageType {
        match self {
            Self::InMemory => StorageType::InMemory,
            Self::Postgres(_) => StorageType::Postgres,
        }
    }
}

/// Factory for creating user backends
#[derive(Debug)]
pub struct BackendFactory;

impl BackendFactory {
    /// Creates a backend instance based on the configuration
    pub async fn create(config: &StorageConfig) -> Result<Arc<dyn UserBackend>, DomainError> {
        info!(storage = ?config.storage_type(), "Creating user backend");

        match config {
            StorageConfig::InMemory => Ok(Arc::new(InMemoryUserBackend::new())),
            StorageConfig::Postgres(pg_config) => {
                Ok(Arc::new(PostgresUserBackend::connect(pg_config).await?))
            }
        }
    }
}
