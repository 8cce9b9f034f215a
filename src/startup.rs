//! Application Startup
//!
//! Application building and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use sqlx::PgPool;
use tokio::net::TcpListener;

use crate::config::Settings;
use crate::domain::Storage;
use crate::infrastructure::database;
use crate::infrastructure::repositories::pg_storage;
use crate::presentation::http::routes;
use crate::presentation::websocket::{
    BroadcastBus, ConnectionGateway, EventRouter, PresenceTracker,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub storage: Storage,
    pub bus: Arc<BroadcastBus>,
    pub gateway: Arc<ConnectionGateway>,
    pub router: Arc<EventRouter>,
    pub settings: Arc<Settings>,
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        // Create database pool
        let db = database::create_pool(&settings.database).await?;
        tracing::info!("Database connection pool created");

        database::run_migrations(&db).await?;
        tracing::info!("Database migrations applied");

        let storage = pg_storage(db.clone());

        // Wire the in-process broadcast bus and the connection lifecycle
        let bus = Arc::new(BroadcastBus::new());
        let presence = PresenceTracker::new(storage.presence.clone(), storage.users.clone());
        let gateway = Arc::new(ConnectionGateway::new(bus.clone(), presence));
        let router = Arc::new(EventRouter::new(
            storage.clone(),
            bus.clone(),
            settings.gateway.max_attachment_bytes,
        ));

        crate::presentation::http::handlers::health::init_server_start();

        // Create app state
        let state = AppState {
            db,
            storage,
            bus,
            gateway,
            router,
            settings: Arc::new(settings.clone()),
        };

        // Build router with middleware
        let app = routes::create_router(state);

        // Bind to address
        let addr = SocketAddr::from(([0, 0, 0, 0], settings.server.port));
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Listening on {}", addr);

        Ok(Self {
            listener,
            router: app,
        })
    }

    /// Run the server until stopped
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(self.listener, self.router).await?;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}
