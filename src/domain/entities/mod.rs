//! Domain Entities
//!
//! Core business entities and their repository traits.

pub mod chat;
pub mod file;
pub mod like;
pub mod message;
pub mod presence;
pub mod reaction;
pub mod user;

pub use chat::{Chat, ChatRepository};
pub use file::{FileRepository, NewFile, StoredFile};
pub use like::{ChatLike, LikeRepository, LikeToggle};
pub use message::{Message, MessageRepository, NewMessage, DELETED_TEXT, MAX_TEXT_LENGTH};
pub use presence::{PresenceRecord, PresenceRepository};
pub use reaction::{Reaction, ReactionRepository, ReactionToggle};
pub use user::{User, UserRepository};
