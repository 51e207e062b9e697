//! User directory: creation, timestamping and multi-key lookup

use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use tracing::{debug, info, warn};

use crate::domain::user::{
    validate_email, validate_username, NewUser, UniqueField, User, UserBackend, UserId,
};
use crate::domain::{Clock, DomainError};

/// Single authoritative store of user records.
///
/// All state lives in the backend; the directory validates input, stamps
/// `created_at`/`updated_at` from its clock and routes lookups. It is cheap
/// to clone and safe to share across tasks.
#[derive(Debug, Clone)]
pub struct UserDirectory {
    backend: Arc<dyn UserBackend>,
    clock: Arc<dyn Clock>,
}

impl UserDirectory {
    /// Create a new directory over a backend and a clock
    pub fn new(backend: Arc<dyn UserBackend>, clock: Arc<dyn Clock>) -> Self {
        Self { backend, clock }
    }

    /// Store a new user.
    ///
    /// Fails with `DomainError::DuplicateKey` when the username or email is
    /// already taken; nothing is stored in that case.
    pub async fn create(&self, candidate: NewUser) -> Result<User, DomainError> {
        validate_fields(candidate.username(), candidate.email())?;

        let record = candidate.into_record(self.now());

        let id = self.backend.insert(&record).await.inspect_err(|e| {
            if let Some(field) = e.duplicate_field() {
                warn!(%field, "Rejected duplicate user");
                debug!(%field, value = record.field(field), "Duplicate value");
            }
        })?;

        info!(user_id = %id, username = %record.username, "Created user");
        Ok(record.persisted(id))
    }

    /// Write back changes made to a stored user and refresh `updated_at`.
    ///
    /// `id`, `created_at` and `last_login_at` always keep their stored
    /// values; only `record_login` moves the last login.
    pub async fn update(&self, user: User) -> Result<User, DomainError> {
        validate_fields(user.username(), user.email())?;

        let stored = self.require(user.id()).await?;

        let mut user = user.with_last_login_at(stored.last_login_at());
        user.restore_created_at(stored.created_at());
        user.touch(self.now());

        self.write(&user).await?;

        info!(user_id = %user.id(), "Updated user");
        Ok(user)
    }

    /// Record a successful login for a user
    pub async fn record_login(&self, user: &User) -> Result<User, DomainError> {
        let mut stored = self.require(user.id()).await?;
        stored.record_login(self.now());

        self.write(&stored).await?;

        debug!(user_id = %stored.id(), "Recorded login");
        Ok(stored)
    }

    /// Delete a user and drop it from every lookup
    pub async fn remove(&self, user: &User) -> Result<(), DomainError> {
        if !self.backend.delete(user.id()).await? {
            return Err(not_found(user.id()));
        }

        info!(user_id = %user.id(), username = %user.username(), "Removed user");
        Ok(())
    }

    /// Get a user by ID
    pub async fn find_by_id(&self, id: UserId) -> Result<Option<User>, DomainError> {
        // Ids start at 1
        if id.value() <= 0 {
            return Ok(None);
        }

        self.backend.get_by_id(id).await
    }

    /// Get a user by exact username
    pub async fn find_one_by_username(&self, username: &str) -> Result<Option<User>, DomainError> {
        self.find_one_by(UniqueField::Username, username).await
    }

    /// Get a user by exact email
    pub async fn find_one_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        self.find_one_by(UniqueField::Email, email).await
    }

    /// Get a user whose username, or failing that whose email, equals `key`.
    ///
    /// A username match wins over an email match on a different record.
    pub async fn find_one_by_username_or_email(
        &self,
        key: &str,
    ) -> Result<Option<User>, DomainError> {
        if let Some(user) = self.find_one_by_username(key).await? {
            return Ok(Some(user));
        }

        self.find_one_by_email(key).await
    }

    /// List all users ordered by id
    pub async fn find_all(&self) -> Result<Vec<User>, DomainError> {
        self.backend.list().await
    }

    /// Count users
    pub async fn count(&self) -> Result<usize, DomainError> {
        self.backend.count().await
    }

    /// Check if a username is taken
    pub async fn username_exists(&self, username: &str) -> Result<bool, DomainError> {
        Ok(self.find_one_by_username(username).await?.is_some())
    }

    /// Check if an email is taken
    pub async fn email_exists(&self, email: &str) -> Result<bool, DomainError> {
        Ok(self.find_one_by_email(email).await?.is_some())
    }

    async fn find_one_by(
        &self,
        field: UniqueField,
        value: &str,
    ) -> Result<Option<User>, DomainError> {
        let user = self.backend.get_by_unique_field(field, value).await?;
        debug!(%field, found = user.is_some(), "User lookup");
        Ok(user)
    }

    async fn require(&self, id: UserId) -> Result<User, DomainError> {
        self.find_by_id(id).await?.ok_or_else(|| not_found(id))
    }

    async fn write(&self, user: &User) -> Result<(), DomainError> {
        // The record may have been removed since it was read
        if !self.backend.update(user).await? {
            return Err(not_found(user.id()));
        }
        Ok(())
    }

    /// Stored timestamps keep microsecond precision on every backend
    fn now(&self) -> DateTime<Utc> {
        self.clock.now().trunc_subsecs(6)
    }
}

fn validate_fields(username: &str, email: &str) -> Result<(), DomainError> {
    validate_username(username).map_err(|e| DomainError::validation(e.to_string()))?;
    validate_email(email).map_err(|e| DomainError::validation(e.to_string()))?;
    Ok(())
}

fn not_found(id: UserId) -> DomainError {
    DomainError::not_found(format!("User '{}' not found", id))
}
