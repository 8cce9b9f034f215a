//! Repository Implementations
//!
//! PostgreSQL implementations of the domain repository traits.

pub mod chat_repository;
pub mod file_repository;
pub mod like_repository;
pub mod message_repository;
pub mod presence_repository;
pub mod reaction_repository;
pub mod user_repository;

pub use chat_repository::PgChatRepository;
pub use file_repository::PgFileRepository;
pub use like_repository::PgLikeRepository;
pub use message_repository::PgMessageRepository;
pub use presence_repository::PgPresenceRepository;
pub use reaction_repository::PgReactionRepository;
pub use user_repository::PgUserRepository;

use std::sync::Arc;

use sqlx::PgPool;

use crate::domain::Storage;

/// Build the storage handle over a Postgres pool.
pub fn pg_storage(pool: PgPool) -> Storage {
    Storage {
        chats: Arc::new(PgChatRepository::new(pool.clone())),
        messages: Arc::new(PgMessageRepository::new(pool.clone())),
        reactions: Arc::new(PgReactionRepository::new(pool.clone())),
        likes: Arc::new(PgLikeRepository::new(pool.clone())),
        presence: Arc::new(PgPresenceRepository::new(pool.clone())),
        users: Arc::new(PgUserRepository::new(pool.clone())),
        files: Arc::new(PgFileRepository::new(pool)),
    }
}
