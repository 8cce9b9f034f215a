//! Connection Gateway
//!
//! Orchestrates the per-connection lifecycle around the bus and the
//! presence tracker: join group, register presence, announce, and the
//! mirror-image teardown. The socket plumbing lives in `handler`; keeping
//! the sequence here keeps it testable without a websocket.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::shared::error::GatewayError;

use super::bus::BroadcastBus;
use super::events::ServerEvent;
use super::presence::PresenceTracker;
use super::session::Session;

/// Lifecycle orchestration for chat connections.
pub struct ConnectionGateway {
    bus: Arc<BroadcastBus>,
    presence: PresenceTracker,
}

impl ConnectionGateway {
    pub fn new(bus: Arc<BroadcastBus>, presence: PresenceTracker) -> Self {
        Self { bus, presence }
    }

    pub fn bus(&self) -> &Arc<BroadcastBus> {
        &self.bus
    }

    /// Run the connect sequence for an authenticated session.
    ///
    /// Order matters: the connection joins its group before anything is
    /// published, so it cannot miss events that race with its arrival.
    /// Its own `connected_user` announcement goes to the others only, and
    /// the `online_user_list` it receives excludes itself.
    ///
    /// On failure everything acquired so far is released before the error
    /// returns. A failure before the `connected_user` announcement tears
    /// down silently; the group never hears a departure for a user it was
    /// never told arrived.
    pub async fn connect(
        &self,
        session: &Session,
        sender: mpsc::UnboundedSender<ServerEvent>,
    ) -> Result<(), GatewayError> {
        tracing::info!(
            user = %session.user.username,
            chat_id = session.chat_id,
            room = %session.room_name,
            conn_id = %session.conn_id,
            "CONNECT"
        );

        self.bus.register(session.conn_id, sender);
        self.bus.join_group(&session.group_name, session.conn_id);

        if let Err(e) = self.presence.join(session.user.id, session.chat_id).await {
            self.bus.leave_group(&session.group_name, session.conn_id);
            self.bus.unregister(session.conn_id);
            return Err(e);
        }

        self.bus.publish_excluding(
            &session.group_name,
            session.conn_id,
            ServerEvent::ConnectedUser {
                user: session.user_summary(),
            },
        );

        let listed = match self.presence.list(session.chat_id, session.user.id).await {
            Ok(user_list) => self
                .bus
                .unicast(session.conn_id, ServerEvent::OnlineUserList { user_list }),
            Err(e) => Err(e),
        };
        if let Err(e) = listed {
            // The arrival was already announced, so the full teardown
            // (departure included) is the right mirror here.
            self.disconnect(session).await;
            return Err(e);
        }

        Ok(())
    }

    /// Run the disconnect sequence.
    ///
    /// Best-effort on every step: this must release presence and group
    /// membership on every exit path, including a connect that failed
    /// halfway, so a storage hiccup is logged rather than propagated.
    pub async fn disconnect(&self, session: &Session) {
        tracing::info!(
            user = %session.user.username,
            chat_id = session.chat_id,
            room = %session.room_name,
            conn_id = %session.conn_id,
            "DISCONNECT"
        );

        if let Err(e) = self
            .presence
            .leave(session.user.id, session.chat_id)
            .await
        {
            tracing::error!(
                user = %session.user.username,
                chat_id = session.chat_id,
                error = %e,
                "Failed to remove presence record"
            );
        }

        self.bus.publish_excluding(
            &session.group_name,
            session.conn_id,
            ServerEvent::DisconnectedUser {
                user: session.user_summary(),
            },
        );

        self.bus.leave_group(&session.group_name, session.conn_id);
        self.bus.unregister(session.conn_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::user::User;
    use crate::presentation::websocket::testing::MemStore;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn gateway(store: &Arc<MemStore>) -> ConnectionGateway {
        let presence = PresenceTracker::new(store.clone(), store.clone());
        ConnectionGateway::new(Arc::new(BroadcastBus::new()), presence)
    }

    fn session(user_id: i64, username: &str) -> Session {
        let user = User {
            id: user_id,
            username: username.to_string(),
            avatar_url: None,
            created_at: Utc::now(),
        };
        Session::new(user, "room".to_string(), 7)
    }

    async fn connect(
        gateway: &ConnectionGateway,
        session: &Session,
    ) -> UnboundedReceiver<ServerEvent> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        gateway.connect(session, tx).await.unwrap();
        rx
    }

    fn drain(rx: &mut UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn joiner_gets_the_list_and_the_others_get_one_announcement() {
        let store = MemStore::new();
        store.seed_user(1, "A");
        store.seed_user(2, "B");
        store.seed_user(3, "C");
        let gw = gateway(&store);

        let a = session(1, "A");
        let b = session(2, "B");
        let c = session(3, "C");

        let mut rx_b = connect(&gw, &b).await;
        let mut rx_c = connect(&gw, &c).await;
        drain(&mut rx_b);
        drain(&mut rx_c);

        let mut rx_a = connect(&gw, &a).await;

        for rx in [&mut rx_b, &mut rx_c] {
            let events = drain(rx);
            assert_eq!(events.len(), 1);
            assert!(matches!(
                &events[0],
                ServerEvent::ConnectedUser { user } if user.username == "A"
            ));
        }

        // The joiner sees only the list of the others, never its own
        // connect announcement.
        let events = drain(&mut rx_a);
        assert_eq!(events.len(), 1);
        match &events[0] {
            ServerEvent::OnlineUserList { user_list } => {
                let mut names: Vec<_> =
                    user_list.iter().map(|u| u.username.as_str()).collect();
                names.sort_unstable();
                assert_eq!(names, vec!["B", "C"]);
            }
            other => panic!("expected online_user_list, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn departure_announces_once_to_the_remaining_members() {
        let store = MemStore::new();
        store.seed_user(1, "A");
        store.seed_user(2, "B");
        store.seed_user(3, "C");
        let gw = gateway(&store);

        let a = session(1, "A");
        let b = session(2, "B");
        let c = session(3, "C");

        let _rx_a = connect(&gw, &a).await;
        let mut rx_b = connect(&gw, &b).await;
        let mut rx_c = connect(&gw, &c).await;
        drain(&mut rx_b);
        drain(&mut rx_c);

        gw.disconnect(&a).await;

        for rx in [&mut rx_b, &mut rx_c] {
            let events = drain(rx);
            assert_eq!(events.len(), 1);
            assert!(matches!(
                &events[0],
                ServerEvent::DisconnectedUser { user } if user.username == "A"
            ));
        }

        // A new joiner's list no longer contains A.
        let d = session(1, "A"); // reconnecting user also works
        let mut rx_d = connect(&gw, &d).await;
        match drain(&mut rx_d).pop().unwrap() {
            ServerEvent::OnlineUserList { user_list } => {
                assert!(user_list.iter().all(|u| u.username != "A"));
                assert_eq!(user_list.len(), 2);
            }
            other => panic!("expected online_user_list, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn failed_connect_never_announces_a_departure() {
        let store = MemStore::new();
        store.seed_user(1, "A");
        store.seed_user(2, "B");
        let gw = gateway(&store);

        let b = session(2, "B");
        let mut rx_b = connect(&gw, &b).await;
        drain(&mut rx_b);

        store.fail_joins();
        let a = session(1, "A");
        let (tx, _rx_a) = tokio::sync::mpsc::unbounded_channel();
        assert!(gw.connect(&a, tx).await.is_err());

        // The group heard nothing about A, arrival or departure, and the
        // failed connection is gone from the bus.
        assert!(drain(&mut rx_b).is_empty());
        assert_eq!(gw.bus().connection_count(), 1);
    }

    #[tokio::test]
    async fn double_join_leaves_a_single_presence_record() {
        let store = MemStore::new();
        store.seed_user(1, "A");
        store.seed_user(2, "B");
        let gw = gateway(&store);

        let a1 = session(1, "A");
        let a2 = session(1, "A");
        let _rx1 = connect(&gw, &a1).await;
        let _rx2 = connect(&gw, &a2).await;

        let b = session(2, "B");
        let mut rx_b = connect(&gw, &b).await;
        match drain(&mut rx_b).pop().unwrap() {
            ServerEvent::OnlineUserList { user_list } => {
                assert_eq!(user_list.len(), 1);
                assert_eq!(user_list[0].username, "A");
            }
            other => panic!("expected online_user_list, got {:?}", other),
        }
    }
}
