pub mod attachments;
pub mod bus;
pub mod events;
pub mod gateway;
pub mod handler;
pub mod presence;
pub mod router;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use bus::BroadcastBus;
pub use gateway::ConnectionGateway;
pub use handler::ws_handler;
pub use presence::PresenceTracker;
pub use router::EventRouter;
pub use session::Session;
