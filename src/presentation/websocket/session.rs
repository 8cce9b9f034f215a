//! Websocket Session

use uuid::Uuid;

use crate::domain::entities::user::User;

use super::events::UserSummary;

/// Per-connection session state.
///
/// Owned exclusively by the connection task; created when the upgrade is
/// accepted, dropped when the socket closes. Never persisted.
#[derive(Debug, Clone)]
pub struct Session {
    /// Bus connection id
    pub conn_id: Uuid,

    /// Verified identity
    pub user: User,

    pub room_name: String,
    pub chat_id: i64,

    /// Broadcast group, `{room}-{chat_id}`
    pub group_name: String,
}

impl Session {
    pub fn new(user: User, room_name: String, chat_id: i64) -> Self {
        let group_name = format!("{}-{}", room_name, chat_id);
        Self {
            conn_id: Uuid::new_v4(),
            user,
            room_name,
            chat_id,
            group_name,
        }
    }

    /// The session's user as shown to other participants.
    pub fn user_summary(&self) -> UserSummary {
        UserSummary {
            id: self.user.id,
            username: self.user.username.clone(),
            avatar: self.user.avatar_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn group_name_is_room_dash_chat_id() {
        let user = User {
            id: 1,
            username: "u1".into(),
            avatar_url: None,
            created_at: Utc::now(),
        };
        let session = Session::new(user, "lobby".into(), 7);
        assert_eq!(session.group_name, "lobby-7");
    }
}
