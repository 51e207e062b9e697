//! User domain
//!
//! This module provides domain types and traits for the user directory,
//! including user entities, validation, and the persistence backend trait.

mod entity;
mod repository;
mod validation;

pub use entity::{NewUser, NewUserRecord, UniqueField, User, UserId};
pub use repository::UserBackend;
pub use validation::{validate_email, validate_username, UserValidationError};

#[cfg(test)]
pub use repository::mock::MockUserBackend;
