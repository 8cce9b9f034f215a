//! # Chat Gateway Library
//!
//! This crate provides a real-time chat gateway with:
//! - A WebSocket endpoint per chat room for live messaging
//! - Message editing, soft deletion, reactions and chat likes
//! - Presence tracking with connect/disconnect announcements
//! - Inline base64 attachments persisted through a file store
//! - PostgreSQL for persistent storage
//!
//! ## Architecture
//!
//! The crate follows Clean Architecture principles:
//!
//! - **Domain Layer**: Core business entities and repository traits
//! - **Infrastructure Layer**: Database and metrics implementations
//! - **Presentation Layer**: HTTP routes and the WebSocket gateway
//!
//! ## Module Structure
//!
//! ```text
//! chat_gateway/
//! +-- config/         Configuration management
//! +-- domain/         Domain entities and repository traits
//! +-- infrastructure/ Database repositories and metrics
//! +-- presentation/   HTTP routes and WebSocket handlers
//! +-- shared/         Common utilities (errors, validation)
//! ```

// Configuration module
pub mod config;

// Domain layer - Core business logic
pub mod domain;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP and WebSocket handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
