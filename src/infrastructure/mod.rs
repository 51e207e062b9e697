//! Infrastructure layer - Backends, logging and the user directory

pub mod logging;
pub mod storage;
pub mod user;
