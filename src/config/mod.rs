//! Configuration Management

pub mod settings;

pub use settings::{
    CorsSettings, DatabaseSettings, GatewaySettings, JwtSettings, ServerSettings, Settings,
};
