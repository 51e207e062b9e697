//! User Directory
//!
//! An identity store for user records with:
//! - Unique usernames and emails, enforced atomically by the backend
//! - Lookup by id, username, email, or username-or-email
//! - Automatic creation/update timestamps from an injected clock
//! - In-memory and PostgreSQL backends

pub mod config;
pub mod domain;
pub mod infrastructure;

pub use crate::config::AppConfig;
pub use domain::{
    Clock, DomainError, ManualClock, NewUser, SystemClock, UniqueField, User, UserBackend, UserId,
};
pub use infrastructure::user::{InMemoryUserBackend, PostgresUserBackend, UserDirectory};

use std::sync::Arc;

use infrastructure::{logging, storage::BackendFactory};
use tracing::info;

/// Create a directory with the backend selected by configuration and the
/// system clock
pub async fn create_user_directory(config: &AppConfig) -> anyhow::Result<UserDirectory> {
    create_user_directory_with_clock(config, Arc::new(SystemClock)).await
}

/// Create a directory with the configured backend and a custom clock
pub async fn create_user_directory_with_clock(
    config: &AppConfig,
    clock: Arc<dyn Clock>,
) -> anyhow::Result<UserDirectory> {
    let storage = config.storage.to_storage_config()?;
    info!("Storage backend: {:?}", storage.storage_type());

    let backend = BackendFactory::create(&storage).await?;
    Ok(UserDirectory::new(backend, clock))
}

/// Load `.env` and configuration, install logging and build the directory
pub async fn bootstrap() -> anyhow::Result<UserDirectory> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    logging::init_logging(&config.logging)?;

    create_user_directory(&config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_in_memory_directory() {
        let directory = create_user_directory(&AppConfig::default()).await.unwrap();

        let user = directory
            .create(NewUser::new("harry_test", "harry@mail.org", "changeme"))
            .await
            .unwrap();

        assert_eq!(
            directory.find_by_id(user.id()).await.unwrap(),
            Some(user)
        );
    }

    #[tokio::test]
    async fn test_unknown_backend_is_rejected() {
        let mut config = AppConfig::default();
        config.storage.backend = "cassandra".to_string();

        let err = create_user_directory(&config).await.unwrap_err();
        assert!(err.to_string().contains("Unknown storage backend"));
    }
}
