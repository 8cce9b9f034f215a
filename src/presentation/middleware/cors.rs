//! CORS Middleware Configuration

use std::time::Duration;

use tower_http::cors::{Any, CorsLayer};

use crate::config::CorsSettings;

/// Create CORS layer from settings.
///
/// An empty or fully unparseable origin list falls back to a permissive
/// layer, which suits local development; production configs list explicit
/// origins.
pub fn create_cors_layer(settings: &CorsSettings) -> CorsLayer {
    let mut origins = Vec::with_capacity(settings.allowed_origins.len());
    for origin in &settings.allowed_origins {
        match origin.parse() {
            Ok(value) => origins.push(value),
            Err(_) => tracing::warn!(origin = %origin, "Ignoring unparseable CORS origin"),
        }
    }

    if origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
            .max_age(Duration::from_secs(3600))
    }
}
