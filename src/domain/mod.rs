//! Domain Layer
//!
//! Entities, repository traits, and the storage collaborator handle.

pub mod entities;

use std::sync::Arc;

pub use entities::*;

/// The storage collaborator: every repository the gateway mutates through.
///
/// Built over Postgres in production; router tests build it over in-memory
/// fakes implementing the same traits.
#[derive(Clone)]
pub struct Storage {
    pub chats: Arc<dyn ChatRepository>,
    pub messages: Arc<dyn MessageRepository>,
    pub reactions: Arc<dyn ReactionRepository>,
    pub likes: Arc<dyn LikeRepository>,
    pub presence: Arc<dyn PresenceRepository>,
    pub users: Arc<dyn UserRepository>,
    pub files: Arc<dyn FileRepository>,
}
