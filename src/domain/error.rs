use thiserror::Error;

use crate::domain::user::UniqueField;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Duplicate key: {field} '{value}' already exists")]
    DuplicateKey { field: UniqueField, value: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Backend unavailable: {message}")]
    BackendUnavailable { message: String },
}

impl DomainError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn duplicate_key(field: UniqueField, value: impl Into<String>) -> Self {
        Self::DuplicateKey {
            field,
            value: value.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn backend_unavailable(message: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            message: message.into(),
        }
    }

    /// The field that caused a uniqueness violation, if this is one
    pub fn duplicate_field(&self) -> Option<UniqueField> {
        match self {
            Self::DuplicateKey { field, .. } => Some(*field),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let error = DomainError::not_found("User '42' not found");
        assert_eq!(error.to_string(), "Not found: User '42' not found");
        assert!(error.is_not_found());
    }

    #[test]
    fn test_duplicate_key_error() {
        let error = DomainError::duplicate_key(UniqueField::Email, "harry@mail.org");
        assert_eq!(
            error.to_string(),
            "Duplicate key: email 'harry@mail.org' already exists"
        );
        assert_eq!(error.duplicate_field(), Some(UniqueField::Email));
    }

    #[test]
    fn test_backend_unavailable_error() {
        let error = DomainError::backend_unavailable("connection refused");
        assert_eq!(error.to_string(), "Backend unavailable: connection refused");
        assert_eq!(error.duplicate_field(), None);
    }
}
