//! Gateway Wire Protocol
//!
//! The JSON envelopes exchanged over a chat websocket, tagged by
//! `event_type`. Inbound envelopes are classified into the closed
//! `ClientEvent` sum type; everything the router does is an exhaustive
//! match over it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::shared::error::GatewayError;
use crate::shared::validation::validation_error;

/// An inline attachment as the client sends it: a name plus a
/// `data:<mime>;base64,<payload>` content string. Field presence is
/// checked by the ingest step so the errors can name the missing field.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AttachmentPayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// The `message` object of a `chat_message` envelope.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MessagePayload {
    /// Target chat id
    pub chat: i64,

    /// Message text; may be blank when attachments are present
    #[serde(default)]
    #[validate(length(max = 792, message = "Ensure this field has no more than 792 characters"))]
    pub text: Option<String>,

    #[serde(default)]
    pub attachments: Vec<AttachmentPayload>,
}

/// Full `chat_message` envelope shape, used by the default path.
#[derive(Debug, Deserialize)]
struct MessageEnvelope {
    message: MessagePayload,
}

/// A classified inbound event.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// `chat_message`, and the default for anything unclassifiable
    NewMessage(MessagePayload),
    /// `message_was_updated`
    MessageUpdated { id: i64, new_text: String },
    /// `message_was_deleted`
    MessageDeleted { id: i64 },
    /// `chat_was_deleted`
    ChatDeleted,
    /// `chat_was_liked/unliked`
    LikeToggled,
    /// `message_reaction`
    Reaction { id: i64, reaction: String },
}

impl ClientEvent {
    /// Tag used for logging and metrics.
    pub fn event_type(&self) -> &'static str {
        match self {
            ClientEvent::NewMessage(_) => "chat_message",
            ClientEvent::MessageUpdated { .. } => "message_was_updated",
            ClientEvent::MessageDeleted { .. } => "message_was_deleted",
            ClientEvent::ChatDeleted => "chat_was_deleted",
            ClientEvent::LikeToggled => "chat_was_liked/unliked",
            ClientEvent::Reaction { .. } => "message_reaction",
        }
    }

    /// Classify a raw envelope.
    ///
    /// An envelope with a recognized `event_type` and its required
    /// companion fields maps to that variant. Anything else — no
    /// `event_type`, an unknown one, or missing companions — falls through
    /// to the default `chat_message` path, where it is fully
    /// schema-validated. The fallthrough is intentional: historically,
    /// absence of `event_type` means "post a message".
    pub fn classify(raw: &Value) -> Result<ClientEvent, GatewayError> {
        let event_type = raw.get("event_type").and_then(Value::as_str);
        let id = raw.get("id").and_then(Value::as_i64);

        match event_type {
            Some("message_was_deleted") => {
                if let Some(id) = id {
                    return Ok(ClientEvent::MessageDeleted { id });
                }
            }
            Some("message_was_updated") => {
                let new_text = raw
                    .get("new_text")
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty());
                if let (Some(id), Some(new_text)) = (id, new_text) {
                    return Ok(ClientEvent::MessageUpdated {
                        id,
                        new_text: new_text.to_string(),
                    });
                }
            }
            Some("chat_was_deleted") => return Ok(ClientEvent::ChatDeleted),
            Some("chat_was_liked/unliked") => return Ok(ClientEvent::LikeToggled),
            Some("message_reaction") => {
                let reaction = raw
                    .get("reaction")
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty());
                if let (Some(id), Some(reaction)) = (id, reaction) {
                    return Ok(ClientEvent::Reaction {
                        id,
                        reaction: reaction.to_string(),
                    });
                }
            }
            _ => {}
        }

        let envelope: MessageEnvelope = serde_json::from_value(raw.clone())
            .map_err(|e| GatewayError::validation(format!("Invalid Websocket message: {}", e)))?;
        envelope.message.validate().map_err(validation_error)?;

        Ok(ClientEvent::NewMessage(envelope.message))
    }
}

/// A user as shown to other chat participants.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub avatar: Option<String>,
}

/// An attachment reference on an outbound message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentView {
    pub name: String,
    pub url: String,
}

/// A reaction on an outbound message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionView {
    pub reaction: String,
    pub user_name: Option<String>,
}

/// A fully serialized message as broadcast to the group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageView {
    pub id: i64,
    pub chat: i64,
    pub user_name: Option<String>,
    pub user_avatar: Option<String>,
    pub text: String,
    /// Epoch seconds
    pub timestamp: i64,
    pub attachments: Vec<AttachmentView>,
    pub reactions: Vec<ReactionView>,
}

/// Details attached to an `error` envelope: enough for the client to react,
/// nothing internal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub user_id: i64,
    pub user_name: String,
    pub chat_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<i64>,
}

/// An outbound envelope.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type")]
pub enum ServerEvent {
    #[serde(rename = "connected_user")]
    ConnectedUser { user: UserSummary },

    #[serde(rename = "disconnected_user")]
    DisconnectedUser { user: UserSummary },

    #[serde(rename = "online_user_list")]
    OnlineUserList { user_list: Vec<UserSummary> },

    #[serde(rename = "chat_message")]
    ChatMessage { message: MessageView },

    #[serde(rename = "message_was_updated")]
    MessageUpdated { id: i64, new_text: String },

    #[serde(rename = "message_was_deleted")]
    MessageDeleted { id: i64 },

    #[serde(rename = "chat_was_deleted")]
    ChatDeleted { id: i64 },

    #[serde(rename = "liked")]
    Liked { id: i64, user: String },

    #[serde(rename = "unliked")]
    Unliked { id: i64, user: String },

    #[serde(rename = "message_reaction_was_posted")]
    ReactionPosted {
        id: i64,
        reaction: String,
        user: String,
    },

    #[serde(rename = "message_reaction_was_deleted")]
    ReactionDeleted {
        id: i64,
        reaction: String,
        user: String,
    },

    #[serde(rename = "error")]
    Error {
        error_message: String,
        details: ErrorDetails,
    },
}

impl ServerEvent {
    /// Tag used for logging and metrics.
    pub fn event_type(&self) -> &'static str {
        match self {
            ServerEvent::ConnectedUser { .. } => "connected_user",
            ServerEvent::DisconnectedUser { .. } => "disconnected_user",
            ServerEvent::OnlineUserList { .. } => "online_user_list",
            ServerEvent::ChatMessage { .. } => "chat_message",
            ServerEvent::MessageUpdated { .. } => "message_was_updated",
            ServerEvent::MessageDeleted { .. } => "message_was_deleted",
            ServerEvent::ChatDeleted { .. } => "chat_was_deleted",
            ServerEvent::Liked { .. } => "liked",
            ServerEvent::Unliked { .. } => "unliked",
            ServerEvent::ReactionPosted { .. } => "message_reaction_was_posted",
            ServerEvent::ReactionDeleted { .. } => "message_reaction_was_deleted",
            ServerEvent::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case(json!({"event_type": "message_was_deleted", "id": 5}) => "message_was_deleted")]
    #[test_case(json!({"event_type": "message_was_updated", "id": 5, "new_text": "hi"}) => "message_was_updated")]
    #[test_case(json!({"event_type": "chat_was_deleted"}) => "chat_was_deleted")]
    #[test_case(json!({"event_type": "chat_was_liked/unliked"}) => "chat_was_liked/unliked")]
    #[test_case(json!({"event_type": "message_reaction", "id": 5, "reaction": "x"}) => "message_reaction")]
    #[test_case(json!({"event_type": "chat_message", "message": {"chat": 7, "text": "hi"}}) => "chat_message")]
    #[test_case(json!({"message": {"chat": 7, "text": "hi"}}) => "chat_message"; "no event_type means chat_message")]
    fn classification(raw: Value) -> &'static str {
        ClientEvent::classify(&raw).unwrap().event_type()
    }

    #[test]
    fn recognized_type_with_missing_fields_falls_through_to_default_path() {
        // No `id`: cannot be a delete, and it has no `message` either, so
        // the default path rejects it as an invalid websocket message.
        let raw = json!({"event_type": "message_was_deleted"});
        let err = ClientEvent::classify(&raw).unwrap_err();
        assert!(err.to_string().starts_with("Invalid Websocket message"));
    }

    #[test]
    fn update_with_empty_new_text_falls_through() {
        let raw = json!({"event_type": "message_was_updated", "id": 3, "new_text": ""});
        assert!(ClientEvent::classify(&raw).is_err());
    }

    #[test]
    fn overlong_text_is_rejected_on_the_default_path() {
        let raw = json!({"message": {"chat": 1, "text": "x".repeat(793)}});
        let err = ClientEvent::classify(&raw).unwrap_err();
        assert!(err.to_string().contains("792"));
    }

    #[test]
    fn server_events_carry_their_wire_tags() {
        let event = ServerEvent::ReactionPosted {
            id: 9,
            reaction: "x".into(),
            user: "u2".into(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "event_type": "message_reaction_was_posted",
                "id": 9,
                "reaction": "x",
                "user": "u2"
            })
        );
    }

    #[test]
    fn error_details_omit_absent_message_id() {
        let event = ServerEvent::Error {
            error_message: "boom".into(),
            details: ErrorDetails {
                user_id: 1,
                user_name: "u1".into(),
                chat_id: 7,
                message_id: None,
            },
        };
        let value = serde_json::to_value(&event).unwrap();
        assert!(value["details"].get("message_id").is_none());
    }
}
