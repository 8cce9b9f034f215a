//! Shared Utilities

pub mod error;
pub mod validation;

pub use error::{AppError, GatewayError};
