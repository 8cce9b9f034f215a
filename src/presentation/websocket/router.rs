//! Event Router
//!
//! Classifies each inbound envelope and dispatches it to the matching
//! handler: validation, authorization, storage mutation, then the group
//! broadcast. Every failure surfaces as a `GatewayError`; the connection
//! handler turns it into a unicast `error` envelope.

use std::sync::Arc;

use serde_json::Value;
use validator::Validate;

use crate::domain::entities::like::LikeToggle;
use crate::domain::entities::message::{Message, NewMessage};
use crate::domain::entities::reaction::ReactionToggle;
use crate::domain::entities::file::StoredFile;
use crate::domain::Storage;
use crate::infrastructure::metrics;
use crate::shared::error::GatewayError;
use crate::shared::validation::validation_error;

use super::attachments::AttachmentIngest;
use super::bus::BroadcastBus;
use super::events::{
    AttachmentView, ClientEvent, MessagePayload, MessageView, ReactionView, ServerEvent,
};
use super::session::Session;

/// Routes inbound events for every connection.
pub struct EventRouter {
    storage: Storage,
    bus: Arc<BroadcastBus>,
    attachments: AttachmentIngest,
}

impl EventRouter {
    pub fn new(storage: Storage, bus: Arc<BroadcastBus>, max_attachment_bytes: usize) -> Self {
        let attachments = AttachmentIngest::new(storage.files.clone(), max_attachment_bytes);
        Self {
            storage,
            bus,
            attachments,
        }
    }

    /// Classify and handle one inbound envelope.
    pub async fn dispatch(&self, session: &Session, raw: Value) -> Result<(), GatewayError> {
        let event = match ClientEvent::classify(&raw) {
            Ok(event) => event,
            Err(e) => {
                metrics::EVENTS_TOTAL
                    .with_label_values(&["invalid", "error"])
                    .inc();
                return Err(e);
            }
        };
        tracing::debug!(
            user = %session.user.username,
            chat_id = session.chat_id,
            room = %session.room_name,
            event = event.event_type(),
            "Handling event"
        );

        let event_type = event.event_type();
        let result = self.handle(session, event).await;
        let outcome = if result.is_ok() { "ok" } else { "error" };
        metrics::EVENTS_TOTAL
            .with_label_values(&[event_type, outcome])
            .inc();
        result
    }

    async fn handle(&self, session: &Session, event: ClientEvent) -> Result<(), GatewayError> {
        match event {
            ClientEvent::NewMessage(payload) => self.handle_new_message(session, payload).await,
            ClientEvent::MessageUpdated { id, new_text } => {
                self.handle_message_updated(session, id, new_text).await
            }
            ClientEvent::MessageDeleted { id } => self.handle_message_deleted(session, id).await,
            ClientEvent::ChatDeleted => self.handle_chat_deleted(session).await,
            ClientEvent::LikeToggled => self.handle_like_toggled(session).await,
            ClientEvent::Reaction { id, reaction } => {
                self.handle_reaction(session, id, reaction).await
            }
        }
    }

    /// Default path: persist a new message and fan it out.
    ///
    /// Attachments are ingested before the message row exists; any
    /// attachment failure aborts the event with nothing persisted.
    async fn handle_new_message(
        &self,
        session: &Session,
        payload: MessagePayload,
    ) -> Result<(), GatewayError> {
        self.storage
            .chats
            .find_by_id(payload.chat)
            .await?
            .ok_or_else(|| GatewayError::NotFound {
                message: "Chat with the specified ID was not found".into(),
                message_id: None,
            })?;

        let text = payload.text.clone().unwrap_or_default();
        if text.trim().is_empty() && payload.attachments.is_empty() {
            return Err(GatewayError::validation(
                "Invalid message: text: This field may not be blank",
            ));
        }

        let files = self
            .attachments
            .ingest_all(session.user.id, &payload.attachments)
            .await?;

        let message = self
            .storage
            .messages
            .create(NewMessage {
                chat_id: payload.chat,
                user_id: session.user.id,
                text,
                attachment_ids: files.iter().map(|f| f.id).collect(),
            })
            .await?;

        let view = self.message_view(session, &message, &files).await?;
        self.bus
            .publish(&session.group_name, ServerEvent::ChatMessage { message: view });
        Ok(())
    }

    async fn handle_message_updated(
        &self,
        session: &Session,
        id: i64,
        new_text: String,
    ) -> Result<(), GatewayError> {
        // The replacement text passes the same validation as a new message.
        let probe = MessagePayload {
            chat: session.chat_id,
            text: Some(new_text.clone()),
            attachments: Vec::new(),
        };
        probe.validate().map_err(validation_error)?;
        if new_text.trim().is_empty() {
            return Err(GatewayError::validation(
                "Invalid message: text: This field may not be blank",
            ));
        }

        let message = self.find_message(id).await?;
        if message.is_deleted {
            return Err(GatewayError::Forbidden {
                message: "A deleted message cannot be edited".into(),
                message_id: Some(id),
            });
        }
        self.require_author(session, &message)?;

        // The guarded statement has the last word: a soft-delete that
        // landed after the check above makes it match nothing.
        let updated = self.storage.messages.update_text(id, &new_text).await?;
        if !updated {
            return Err(GatewayError::Forbidden {
                message: "A deleted message cannot be edited".into(),
                message_id: Some(id),
            });
        }
        tracing::debug!(message_id = id, chat_id = session.chat_id, "Message updated");

        self.bus.publish(
            &session.group_name,
            ServerEvent::MessageUpdated { id, new_text },
        );
        Ok(())
    }

    async fn handle_message_deleted(&self, session: &Session, id: i64) -> Result<(), GatewayError> {
        let message = self.find_message(id).await?;
        self.require_author(session, &message)?;

        self.storage.messages.soft_delete(id).await?;
        tracing::debug!(message_id = id, chat_id = session.chat_id, "Message soft-deleted");

        self.bus
            .publish(&session.group_name, ServerEvent::MessageDeleted { id });
        Ok(())
    }

    async fn handle_chat_deleted(&self, session: &Session) -> Result<(), GatewayError> {
        let chat = self
            .storage
            .chats
            .find_by_id(session.chat_id)
            .await?
            .ok_or_else(|| GatewayError::NotFound {
                message: "Chat with the specified ID was not found".into(),
                message_id: None,
            })?;

        if !chat.is_owned_by(session.user.id) {
            return Err(GatewayError::Forbidden {
                message: "You are not the author of this chat".into(),
                message_id: None,
            });
        }

        self.storage.chats.delete(chat.id).await?;
        tracing::info!(chat_id = chat.id, room = %session.room_name, "Chat deleted");

        self.bus
            .publish(&session.group_name, ServerEvent::ChatDeleted { id: chat.id });
        Ok(())
    }

    async fn handle_like_toggled(&self, session: &Session) -> Result<(), GatewayError> {
        self.storage
            .chats
            .find_by_id(session.chat_id)
            .await?
            .ok_or_else(|| GatewayError::NotFound {
                message: "Chat with the specified ID was not found".into(),
                message_id: None,
            })?;

        let outcome = self
            .storage
            .likes
            .toggle(session.chat_id, session.user.id)
            .await?;

        let event = match outcome {
            LikeToggle::Liked => ServerEvent::Liked {
                id: session.chat_id,
                user: session.user.username.clone(),
            },
            LikeToggle::Unliked => ServerEvent::Unliked {
                id: session.chat_id,
                user: session.user.username.clone(),
            },
        };
        self.bus.publish(&session.group_name, event);
        Ok(())
    }

    async fn handle_reaction(
        &self,
        session: &Session,
        id: i64,
        reaction: String,
    ) -> Result<(), GatewayError> {
        self.find_message(id).await?;

        let outcome = self
            .storage
            .reactions
            .toggle(id, session.user.id, &reaction)
            .await?;

        let event = match outcome {
            ReactionToggle::Posted => ServerEvent::ReactionPosted {
                id,
                reaction,
                user: session.user.username.clone(),
            },
            ReactionToggle::Deleted => ServerEvent::ReactionDeleted {
                id,
                reaction,
                user: session.user.username.clone(),
            },
        };
        self.bus.publish(&session.group_name, event);
        Ok(())
    }

    async fn find_message(&self, id: i64) -> Result<Message, GatewayError> {
        self.storage
            .messages
            .find_by_id(id)
            .await?
            .ok_or_else(|| GatewayError::NotFound {
                message: "Message with the specified ID was not found".into(),
                message_id: Some(id),
            })
    }

    fn require_author(&self, session: &Session, message: &Message) -> Result<(), GatewayError> {
        if !message.is_authored_by(session.user.id) {
            return Err(GatewayError::Forbidden {
                message: "You are not the author of this message".into(),
                message_id: Some(message.id),
            });
        }
        Ok(())
    }

    /// Serialize a freshly created message the way the group sees it.
    async fn message_view(
        &self,
        session: &Session,
        message: &Message,
        files: &[StoredFile],
    ) -> Result<MessageView, GatewayError> {
        let mut reactions = Vec::new();
        for r in self.storage.reactions.list_for_message(message.id).await? {
            let user_name = match r.user_id {
                Some(uid) => self.storage.users.find_by_id(uid).await?.map(|u| u.username),
                None => None,
            };
            reactions.push(ReactionView {
                reaction: r.reaction,
                user_name,
            });
        }

        Ok(MessageView {
            id: message.id,
            chat: message.chat_id,
            user_name: Some(session.user.username.clone()),
            user_avatar: session.user.avatar_url.clone(),
            text: message.text.clone(),
            timestamp: message.created_at.timestamp(),
            attachments: files
                .iter()
                .map(|f| AttachmentView {
                    name: f.file_name.clone(),
                    url: f.url.clone(),
                })
                .collect(),
            reactions,
        })
    }
}
