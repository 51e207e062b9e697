//! In-memory user backend implementation

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::user::{NewUserRecord, UniqueField, User, UserBackend, UserId};
use crate::domain::DomainError;

/// Records plus both unique indices, guarded together so that
/// check-then-insert is atomic.
#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    /// Index for username -> user ID lookup
    username_index: HashMap<String, UserId>,
    /// Index for email -> user ID lookup
    email_index: HashMap<String, UserId>,
    last_id: i64,
}

impl Tables {
    fn index(&self, field: UniqueField) -> &HashMap<String, UserId> {
        match field {
            UniqueField::Username => &self.username_index,
            UniqueField::Email => &self.email_index,
        }
    }

    /// Returns the first unique field whose value is held by another record
    fn conflicting_field(
        &self,
        username: &str,
        email: &str,
        owner: Option<UserId>,
    ) -> Option<(UniqueField, String)> {
        [(UniqueField::Username, username), (UniqueField::Email, email)]
            .into_iter()
            .find(|(field, value)| {
                self.index(*field)
                    .get(*value)
                    .is_some_and(|holder| Some(*holder) != owner)
            })
            .map(|(field, value)| (field, value.to_string()))
    }

    fn insert_indexed(&mut self, user: User) {
        let id = user.id();
        self.username_index.insert(user.username().to_string(), id);
        self.email_index.insert(user.email().to_string(), id);
        self.users.insert(id, user);
    }

    fn remove_indexed(&mut self, id: UserId) -> Option<User> {
        let user = self.users.remove(&id)?;
        self.username_index.remove(user.username());
        self.email_index.remove(user.email());
        Some(user)
    }
}

/// In-memory implementation of UserBackend
///
/// Ids start at 1 and are never reused, even after a delete. Data is lost
/// when the process terminates.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserBackend {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryUserBackend {
    /// Create a new empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend with initial users
    pub fn with_users(users: Vec<User>) -> Self {
        let mut tables = Tables::default();

        for user in users {
            tables.last_id = tables.last_id.max(user.id().value());
            tables.insert_indexed(user);
        }

        Self {
            tables: Arc::new(RwLock::new(tables)),
        }
    }
}

#[async_trait]
impl UserBackend for InMemoryUserBackend {
    async fn insert(&self, record: &NewUserRecord) -> Result<UserId, DomainError> {
        let mut tables = self.tables.write().await;

        if let Some((field, value)) =
            tables.conflicting_field(&record.username, &record.email, None)
        {
            return Err(DomainError::duplicate_key(field, value));
        }

        tables.last_id = tables
            .last_id
            .checked_add(1)
            .ok_or_else(|| DomainError::backend_unavailable("User id space exhausted"))?;
        let id = UserId::new(tables.last_id);
        tables.insert_indexed(record.clone().persisted(id));

        debug!(user_id = %id, "Inserted user record");
        Ok(id)
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, DomainError> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id).cloned())
    }

    async fn get_by_unique_field(
        &self,
        field: UniqueField,
        value: &str,
    ) -> Result<Option<User>, DomainError> {
        let tables = self.tables.read().await;

        Ok(tables
            .index(field)
            .get(value)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn update(&self, user: &User) -> Result<bool, DomainError> {
        let mut tables = self.tables.write().await;
        let id = user.id();

        if !tables.users.contains_key(&id) {
            return Ok(false);
        }

        if let Some((field, value)) =
            tables.conflicting_field(user.username(), user.email(), Some(id))
        {
            return Err(DomainError::duplicate_key(field, value));
        }

        // Re-index from scratch so renamed keys drop their old entries
        tables.remove_indexed(id);
        tables.insert_indexed(user.clone());

        Ok(true)
    }

    async fn delete(&self, id: UserId) -> Result<bool, DomainError> {
        let mut tables = self.tables.write().await;
        Ok(tables.remove_indexed(id).is_some())
    }

    async fn list(&self) -> Result<Vec<User>, DomainError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().cloned().collect())
    }

    async fn count(&self) -> Result<usize, DomainError> {
        let tables = self.tables.read().await;
        Ok(tables.users.len())
    }
}
