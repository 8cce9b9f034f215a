//! Broadcast Bus
//!
//! Group-based publish/subscribe over in-process connection registries.
//! A connection registers its outbound sender once, joins any number of
//! named groups, and receives every event published to a group it is in —
//! exactly once per event, in each publisher's send order. No cross-group
//! delivery, no history.

use std::collections::HashSet;

use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::infrastructure::metrics;
use crate::shared::error::GatewayError;

use super::events::ServerEvent;

/// Connection id used as the bus registry key.
pub type ConnId = Uuid;

/// In-process broadcast bus.
///
/// Delivery goes straight into each member's unbounded outbound channel, so
/// a publish preserves the publisher's ordering per receiver and never
/// blocks on a slow socket. A receiver whose channel is gone (its writer
/// task exited) is skipped; that publish attempt is not retried.
pub struct BroadcastBus {
    /// Group name -> member connection ids
    groups: DashMap<String, HashSet<ConnId>>,
    /// Connection id -> outbound channel
    connections: DashMap<ConnId, mpsc::UnboundedSender<ServerEvent>>,
}

impl BroadcastBus {
    pub fn new() -> Self {
        Self {
            groups: DashMap::new(),
            connections: DashMap::new(),
        }
    }

    /// Register a connection's outbound sender. Must precede any join.
    pub fn register(&self, conn_id: ConnId, sender: mpsc::UnboundedSender<ServerEvent>) {
        self.connections.insert(conn_id, sender);
    }

    /// Remove a connection from the registry and from every group.
    pub fn unregister(&self, conn_id: ConnId) {
        self.connections.remove(&conn_id);
        self.groups.retain(|_, members| {
            members.remove(&conn_id);
            !members.is_empty()
        });
    }

    /// Add a connection to a named group.
    pub fn join_group(&self, group_name: &str, conn_id: ConnId) {
        self.groups
            .entry(group_name.to_string())
            .or_default()
            .insert(conn_id);
        tracing::debug!(group = %group_name, conn_id = %conn_id, "Joined group");
    }

    /// Remove a connection from a named group. Leaving a group the
    /// connection is not in is a no-op.
    pub fn leave_group(&self, group_name: &str, conn_id: ConnId) {
        if let Some(mut members) = self.groups.get_mut(group_name) {
            members.remove(&conn_id);
        }
        self.groups.remove_if(group_name, |_, m| m.is_empty());
        tracing::debug!(group = %group_name, conn_id = %conn_id, "Left group");
    }

    /// Publish an event to every connection currently in the group,
    /// including the publisher.
    pub fn publish(&self, group_name: &str, event: ServerEvent) {
        self.publish_filtered(group_name, event, None);
    }

    /// Publish to every group member except one. Used by the gateway for
    /// its own connect/disconnect announcements, which the subject session
    /// does not receive.
    pub fn publish_excluding(&self, group_name: &str, except: ConnId, event: ServerEvent) {
        self.publish_filtered(group_name, event, Some(except));
    }

    fn publish_filtered(&self, group_name: &str, event: ServerEvent, except: Option<ConnId>) {
        let members: Vec<ConnId> = match self.groups.get(group_name) {
            Some(members) => members.iter().copied().collect(),
            None => return,
        };

        metrics::PUBLISHED_TOTAL
            .with_label_values(&[event.event_type()])
            .inc();

        for conn_id in members {
            if Some(conn_id) == except {
                continue;
            }
            if let Some(sender) = self.connections.get(&conn_id) {
                if sender.send(event.clone()).is_err() {
                    // Receiver's writer task is gone; it will unregister
                    // itself. This delivery is dropped, not retried.
                    tracing::warn!(
                        group = %group_name,
                        conn_id = %conn_id,
                        "Dropped event for dead connection"
                    );
                }
            }
        }
    }

    /// Send an event to a single connection.
    pub fn unicast(&self, conn_id: ConnId, event: ServerEvent) -> Result<(), GatewayError> {
        let sender = self
            .connections
            .get(&conn_id)
            .ok_or_else(|| GatewayError::BusDelivery(format!("unknown connection {}", conn_id)))?;
        sender
            .send(event)
            .map_err(|_| GatewayError::BusDelivery(format!("connection {} is closed", conn_id)))
    }

    /// Number of registered connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

impl Default for BroadcastBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presentation::websocket::events::ServerEvent;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn connect(bus: &BroadcastBus) -> (ConnId, UnboundedReceiver<ServerEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        bus.register(conn_id, tx);
        (conn_id, rx)
    }

    fn deleted(id: i64) -> ServerEvent {
        ServerEvent::MessageDeleted { id }
    }

    #[tokio::test]
    async fn publish_reaches_every_member_including_publisher() {
        let bus = BroadcastBus::new();
        let (a, mut rx_a) = connect(&bus);
        let (b, mut rx_b) = connect(&bus);
        bus.join_group("room-1", a);
        bus.join_group("room-1", b);

        bus.publish("room-1", deleted(1));

        assert!(matches!(
            rx_a.recv().await,
            Some(ServerEvent::MessageDeleted { id: 1 })
        ));
        assert!(matches!(
            rx_b.recv().await,
            Some(ServerEvent::MessageDeleted { id: 1 })
        ));
    }

    #[tokio::test]
    async fn no_cross_group_delivery() {
        let bus = BroadcastBus::new();
        let (a, _rx_a) = connect(&bus);
        let (b, mut rx_b) = connect(&bus);
        bus.join_group("room-chat1", a);
        bus.join_group("room-chat2", b);

        bus.publish("room-chat1", deleted(1));

        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn publish_excluding_skips_the_subject() {
        let bus = BroadcastBus::new();
        let (a, mut rx_a) = connect(&bus);
        let (b, mut rx_b) = connect(&bus);
        bus.join_group("g", a);
        bus.join_group("g", b);

        bus.publish_excluding("g", a, deleted(2));

        assert!(rx_a.try_recv().is_err());
        assert!(matches!(
            rx_b.recv().await,
            Some(ServerEvent::MessageDeleted { id: 2 })
        ));
    }

    #[tokio::test]
    async fn left_member_stops_receiving() {
        let bus = BroadcastBus::new();
        let (a, mut rx_a) = connect(&bus);
        bus.join_group("g", a);
        bus.leave_group("g", a);

        bus.publish("g", deleted(3));

        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn publisher_order_is_preserved_per_receiver() {
        let bus = BroadcastBus::new();
        let (a, mut rx_a) = connect(&bus);
        bus.join_group("g", a);

        for id in 1..=5 {
            bus.publish("g", deleted(id));
        }
        for expected in 1..=5 {
            match rx_a.recv().await {
                Some(ServerEvent::MessageDeleted { id }) => assert_eq!(id, expected),
                other => panic!("unexpected event: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn unicast_to_unknown_connection_fails() {
        let bus = BroadcastBus::new();
        assert!(bus.unicast(Uuid::new_v4(), deleted(1)).is_err());
    }
}
