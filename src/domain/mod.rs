//! Domain layer - Core entities, errors and contracts

pub mod clock;
pub mod error;
pub mod user;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::DomainError;
pub use user::{NewUser, NewUserRecord, UniqueField, User, UserBackend, UserId};
