//! In-memory fakes for unit-testing the websocket layer without a
//! database. One `MemStore` backs every repository trait; tests assert
//! against its state after driving the router or gateway.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use crate::domain::entities::chat::{Chat, ChatRepository};
use crate::domain::entities::file::{FileRepository, NewFile, StoredFile};
use crate::domain::entities::like::{ChatLike, LikeRepository, LikeToggle};
use crate::domain::entities::message::{Message, MessageRepository, NewMessage, DELETED_TEXT};
use crate::domain::entities::presence::{PresenceRecord, PresenceRepository};
use crate::domain::entities::reaction::{Reaction, ReactionRepository, ReactionToggle};
use crate::domain::entities::user::{User, UserRepository};
use crate::domain::Storage;
use crate::shared::error::AppError;

#[derive(Default)]
struct State {
    chats: HashMap<i64, Chat>,
    messages: HashMap<i64, Message>,
    attachments: HashMap<i64, Vec<i64>>,
    reactions: Vec<Reaction>,
    likes: Vec<ChatLike>,
    presence: Vec<PresenceRecord>,
    users: HashMap<i64, User>,
    files: HashMap<i64, StoredFile>,
    next_id: i64,
    fail_joins: bool,
}

/// Single in-memory backing store for all repository fakes.
#[derive(Default)]
pub(crate) struct MemStore {
    state: Mutex<State>,
}

impl MemStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn next_id(state: &mut State) -> i64 {
        state.next_id += 1;
        state.next_id
    }

    pub fn seed_user(&self, id: i64, username: &str) -> User {
        let user = User {
            id,
            username: username.to_string(),
            avatar_url: None,
            created_at: Utc::now(),
        };
        self.state.lock().users.insert(id, user.clone());
        user
    }

    pub fn seed_chat(&self, id: i64, room: &str, title: &str, owner: i64) -> Chat {
        let chat = Chat {
            id,
            title: title.to_string(),
            room: room.to_string(),
            user_id: Some(owner),
            description: String::new(),
            img: None,
            created_at: Utc::now(),
        };
        self.state.lock().chats.insert(id, chat.clone());
        chat
    }

    pub fn seed_message(&self, chat_id: i64, user_id: i64, text: &str) -> Message {
        let mut state = self.state.lock();
        let id = Self::next_id(&mut state);
        let message = Message {
            id,
            chat_id,
            user_id: Some(user_id),
            text: text.to_string(),
            is_deleted: false,
            created_at: Utc::now(),
        };
        state.messages.insert(id, message.clone());
        message
    }

    pub fn message(&self, id: i64) -> Option<Message> {
        self.state.lock().messages.get(&id).cloned()
    }

    pub fn message_count(&self) -> usize {
        self.state.lock().messages.len()
    }

    pub fn reaction_count(&self, message_id: i64) -> usize {
        self.state
            .lock()
            .reactions
            .iter()
            .filter(|r| r.message_id == message_id)
            .count()
    }

    pub fn file_count(&self) -> usize {
        self.state.lock().files.len()
    }

    /// Make subsequent presence joins fail, to exercise connect teardown.
    pub fn fail_joins(&self) {
        self.state.lock().fail_joins = true;
    }

    pub fn attachment_ids(&self, message_id: i64) -> Vec<i64> {
        self.state
            .lock()
            .attachments
            .get(&message_id)
            .cloned()
            .unwrap_or_default()
    }
}

/// Assemble a `Storage` whose every repository is the given store.
pub(crate) fn mem_storage(store: &Arc<MemStore>) -> Storage {
    Storage {
        chats: store.clone(),
        messages: store.clone(),
        reactions: store.clone(),
        likes: store.clone(),
        presence: store.clone(),
        users: store.clone(),
        files: store.clone(),
    }
}

#[async_trait]
impl ChatRepository for MemStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Chat>, AppError> {
        Ok(self.state.lock().chats.get(&id).cloned())
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        let mut state = self.state.lock();
        state.chats.remove(&id);
        // Mirror the database cascades.
        let message_ids: Vec<i64> = state
            .messages
            .values()
            .filter(|m| m.chat_id == id)
            .map(|m| m.id)
            .collect();
        for mid in message_ids {
            state.messages.remove(&mid);
            state.reactions.retain(|r| r.message_id != mid);
        }
        state.likes.retain(|l| l.chat_id != id);
        state.presence.retain(|p| p.chat_id != id);
        Ok(())
    }
}

#[async_trait]
impl MessageRepository for MemStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Message>, AppError> {
        Ok(self.state.lock().messages.get(&id).cloned())
    }

    async fn create(&self, message: NewMessage) -> Result<Message, AppError> {
        let mut state = self.state.lock();
        let id = Self::next_id(&mut state);
        let created = Message {
            id,
            chat_id: message.chat_id,
            user_id: Some(message.user_id),
            text: message.text,
            is_deleted: false,
            created_at: Utc::now(),
        };
        state.messages.insert(id, created.clone());
        state.attachments.insert(id, message.attachment_ids);
        Ok(created)
    }

    async fn update_text(&self, id: i64, new_text: &str) -> Result<bool, AppError> {
        let mut state = self.state.lock();
        match state.messages.get_mut(&id) {
            Some(message) if !message.is_deleted => {
                message.text = new_text.to_string();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn soft_delete(&self, id: i64) -> Result<(), AppError> {
        let mut state = self.state.lock();
        let message = state
            .messages
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("Message not found".into()))?;
        message.is_deleted = true;
        message.text = DELETED_TEXT.to_string();
        Ok(())
    }
}

#[async_trait]
impl ReactionRepository for MemStore {
    async fn toggle(
        &self,
        message_id: i64,
        user_id: i64,
        reaction: &str,
    ) -> Result<ReactionToggle, AppError> {
        let mut state = self.state.lock();
        let before = state.reactions.len();
        state
            .reactions
            .retain(|r| !(r.message_id == message_id && r.user_id == Some(user_id)));
        if state.reactions.len() < before {
            return Ok(ReactionToggle::Deleted);
        }
        let id = Self::next_id(&mut state);
        state.reactions.push(Reaction {
            id,
            message_id,
            user_id: Some(user_id),
            reaction: reaction.to_string(),
            created_at: Utc::now(),
        });
        Ok(ReactionToggle::Posted)
    }

    async fn list_for_message(&self, message_id: i64) -> Result<Vec<Reaction>, AppError> {
        Ok(self
            .state
            .lock()
            .reactions
            .iter()
            .filter(|r| r.message_id == message_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl LikeRepository for MemStore {
    async fn toggle(&self, chat_id: i64, user_id: i64) -> Result<LikeToggle, AppError> {
        let mut state = self.state.lock();
        let before = state.likes.len();
        state
            .likes
            .retain(|l| !(l.chat_id == chat_id && l.user_id == user_id));
        if state.likes.len() < before {
            return Ok(LikeToggle::Unliked);
        }
        let id = Self::next_id(&mut state);
        state.likes.push(ChatLike {
            id,
            chat_id,
            user_id,
        });
        Ok(LikeToggle::Liked)
    }
}

#[async_trait]
impl PresenceRepository for MemStore {
    async fn join(&self, user_id: i64, chat_id: i64) -> Result<(), AppError> {
        let mut state = self.state.lock();
        if state.fail_joins {
            return Err(AppError::Internal("presence store unavailable".into()));
        }
        if state
            .presence
            .iter()
            .any(|p| p.chat_id == chat_id && p.user_id == user_id)
        {
            return Ok(());
        }
        let id = Self::next_id(&mut state);
        state.presence.push(PresenceRecord {
            id,
            chat_id,
            user_id,
        });
        Ok(())
    }

    async fn leave(&self, user_id: i64, chat_id: i64) -> Result<(), AppError> {
        self.state
            .lock()
            .presence
            .retain(|p| !(p.chat_id == chat_id && p.user_id == user_id));
        Ok(())
    }

    async fn list_for_chat(
        &self,
        chat_id: i64,
        excluding_user: i64,
    ) -> Result<Vec<PresenceRecord>, AppError> {
        Ok(self
            .state
            .lock()
            .presence
            .iter()
            .filter(|p| p.chat_id == chat_id && p.user_id != excluding_user)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UserRepository for MemStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self.state.lock().users.get(&id).cloned())
    }
}

#[async_trait]
impl FileRepository for MemStore {
    async fn create(&self, file: NewFile) -> Result<StoredFile, AppError> {
        let mut state = self.state.lock();
        let id = Self::next_id(&mut state);
        let stored = StoredFile {
            id,
            file_name: file.file_name.clone(),
            content_type: Some(file.content_type),
            size: file.content.len() as i64,
            url: format!("/media/uploads/{}", file.file_name),
            uploader_id: Some(file.uploader_id),
            uploaded_at: Utc::now(),
        };
        state.files.insert(id, stored.clone());
        Ok(stored)
    }
}
