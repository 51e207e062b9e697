//! Persistence backend trait for user records

use async_trait::async_trait;
use std::fmt::Debug;

use super::entity::{NewUserRecord, UniqueField, User, UserId};
use crate::domain::DomainError;

/// Storage contract the user directory relies on.
///
/// `insert` must check both unique fields and write the record as one atomic
/// step, and `update`/`delete` must not interleave with it on the same keys.
/// Failures other than a uniqueness violation are reported as
/// `DomainError::BackendUnavailable`.
#[async_trait]
pub trait UserBackend: Send + Sync + Debug {
    /// Store a new record and return the id assigned to it
    async fn insert(&self, record: &NewUserRecord) -> Result<UserId, DomainError>;

    /// Get a record by its id
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, DomainError>;

    /// Get a record by exact match on one of the unique fields
    async fn get_by_unique_field(
        &self,
        field: UniqueField,
        value: &str,
    ) -> Result<Option<User>, DomainError>;

    /// Overwrite a stored record. Returns false when no record has its id.
    async fn update(&self, user: &User) -> Result<bool, DomainError>;

    /// Delete a record. Returns false when no record has the id.
    async fn delete(&self, id: UserId) -> Result<bool, DomainError>;

    /// List every record ordered by id
    async fn list(&self) -> Result<Vec<User>, DomainError>;

    /// Count stored records
    async fn count(&self) -> Result<usize, DomainError> {
        Ok(self.list().await?.len())
    }
}
