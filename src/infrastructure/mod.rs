//! Infrastructure Layer
//!
//! Database access, repository implementations, and metrics.

pub mod database;
pub mod metrics;
pub mod repositories;
