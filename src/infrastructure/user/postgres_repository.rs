//! PostgreSQL user backend implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::debug;

use crate::domain::user::{NewUserRecord, UniqueField, User, UserBackend, UserId};
use crate::domain::DomainError;
use crate::infrastructure::storage::{connect_pool, PostgresConfig};

const USERNAME_CONSTRAINT: &str = "users_username_key";
const EMAIL_CONSTRAINT: &str = "users_email_key";

const USER_COLUMNS: &str =
    "id, username, email, password_hash, is_active, created_at, updated_at, last_login_at";

/// PostgreSQL implementation of UserBackend
///
/// Uniqueness is enforced by the table's `UNIQUE` constraints and ids come
/// from an identity column, so concurrent inserts need no extra locking.
#[derive(Debug, Clone)]
pub struct PostgresUserBackend {
    pool: PgPool,
}

impl PostgresUserBackend {
    /// Create a new backend with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a new pool and make sure the users table exists
    pub async fn connect(config: &PostgresConfig) -> Result<Self, DomainError> {
        let backend = Self::new(connect_pool(config).await?);
        backend.ensure_table().await?;
        Ok(backend)
    }

    /// Returns a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the users table if it does not exist
    pub async fn ensure_table(&self) -> Result<(), DomainError> {
        let query = create_table_sql();

        sqlx::query(&query)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::backend_unavailable(format!("Failed to create table: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl UserBackend for PostgresUserBackend {
    async fn insert(&self, record: &NewUserRecord) -> Result<UserId, DomainError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO users (username, email, password_hash, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&record.username)
        .bind(&record.email)
        .bind(&record.password_hash)
        .bind(record.is_active)
        .bind(record.created_at)
        .bind(record.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, &record.username, &record.email, "create user"))?;

        debug!(user_id = id, "Inserted user row");
        Ok(UserId::new(id))
    }

    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, DomainError> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);

        let row = sqlx::query(&query)
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::backend_unavailable(format!("Failed to get user: {}", e)))?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn get_by_unique_field(
        &self,
        field: UniqueField,
        value: &str,
    ) -> Result<Option<User>, DomainError> {
        // Column name comes from a closed enum, never from input
        let query = format!(
            "SELECT {} FROM users WHERE {} = $1",
            USER_COLUMNS,
            field.as_str()
        );

        let row = sqlx::query(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                DomainError::backend_unavailable(format!("Failed to get user by {}: {}", field, e))
            })?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn update(&self, user: &User) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET username = $2, email = $3, password_hash = $4, is_active = $5,
                updated_at = $6, last_login_at = $7
            WHERE id = $1
            "#,
        )
        .bind(user.id().value())
        .bind(user.username())
        .bind(user.email())
        .bind(user.password_hash())
        .bind(user.is_active())
        .bind(user.updated_at())
        .bind(user.last_login_at())
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, user.username(), user.email(), "update user"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: UserId) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.value())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::backend_unavailable(format!("Failed to delete user: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> Result<Vec<User>, DomainError> {
        let query = format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS);

        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::backend_unavailable(format!("Failed to list users: {}", e)))?;

        rows.iter().map(row_to_user).collect()
    }

    async fn count(&self) -> Result<usize, DomainError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::backend_unavailable(format!("Failed to count users: {}", e)))?;

        Ok(count as usize)
    }
}

/// Every column is written explicitly on insert, so none carries a default
fn create_table_sql() -> String {
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
            username VARCHAR(180) NOT NULL CONSTRAINT {} UNIQUE,
            email VARCHAR(180) NOT NULL CONSTRAINT {} UNIQUE,
            password_hash TEXT NOT NULL,
            is_active BOOLEAN NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL,
            last_login_at TIMESTAMPTZ NULL
        )
        "#,
        USERNAME_CONSTRAINT, EMAIL_CONSTRAINT
    )
}

/// Maps a violated unique constraint back to the field it guards
fn field_for_constraint(constraint: &str) -> Option<UniqueField> {
    match constraint {
        USERNAME_CONSTRAINT => Some(UniqueField::Username),
        EMAIL_CONSTRAINT => Some(UniqueField::Email),
        _ => None,
    }
}

fn map_write_error(e: sqlx::Error, username: &str, email: &str, action: &str) -> DomainError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            match db_err.constraint().and_then(field_for_constraint) {
                Some(UniqueField::Username) => {
                    return DomainError::duplicate_key(UniqueField::Username, username);
                }
                Some(UniqueField::Email) => {
                    return DomainError::duplicate_key(UniqueField::Email, email);
                }
                None => {}
            }
        }
    }

    DomainError::backend_unavailable(format!("Failed to {}: {}", action, e))
}

fn row_to_user(row: &PgRow) -> Result<User, DomainError> {
    let decode = |e: sqlx::Error| {
        DomainError::backend_unavailable(format!("Failed to decode user row: {}", e))
    };

    let id: i64 = row.try_get("id").map_err(decode)?;
    let last_login_at: Option<DateTime<Utc>> = row.try_get("last_login_at").map_err(decode)?;

    let record = NewUserRecord {
        username: row.try_get("username").map_err(decode)?,
        email: row.try_get("email").map_err(decode)?,
        password_hash: row.try_get("password_hash").map_err(decode)?,
        is_active: row.try_get("is_active").map_err(decode)?,
        created_at: row.try_get("created_at").map_err(decode)?,
        updated_at: row.try_get("updated_at").map_err(decode)?,
    };

    Ok(record
        .persisted(UserId::new(id))
        .with_last_login_at(last_login_at))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_for_constraint() {
        assert_eq!(
            field_for_constraint("users_username_key"),
            Some(UniqueField::Username)
        );
        assert_eq!(
            field_for_constraint("users_email_key"),
            Some(UniqueField::Email)
        );
        assert_eq!(field_for_constraint("users_pkey"), None);
    }

    #[test]
    fn test_create_table_sql() {
        let sql = create_table_sql();

        assert!(sql.contains("CONSTRAINT users_username_key UNIQUE"));
        assert!(sql.contains("CONSTRAINT users_email_key UNIQUE"));
        assert!(sql.contains("is_active BOOLEAN NOT NULL,"));
        assert!(!sql.contains("DEFAULT"));
    }

    #[test]
    fn test_non_database_error_is_backend_unavailable() {
        let err = map_write_error(
            sqlx::Error::PoolTimedOut,
            "harry_test",
            "harry@mail.org",
            "create user",
        );

        assert!(matches!(err, DomainError::BackendUnavailable { .. }));
        assert!(err.to_string().contains("Failed to create user"));
    }
}
