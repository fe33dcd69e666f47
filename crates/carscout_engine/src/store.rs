use std::collections::BTreeMap;
use std::sync::Mutex;

use carscout_core::{ChatId, ChatSession};

use crate::PersistError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
    #[error("could not encode state: {0}")]
    Encode(String),
    #[error("could not decode state: {0}")]
    Decode(String),
    #[error("store lock poisoned")]
    Poisoned,
    #[error("store writer failed: {0}")]
    Writer(String),
}

/// Durable home of every chat session.
///
/// `load_all_sessions` runs once at startup. `save` is awaited after every
/// mutation of a session and resolves once the write is durable; blocking
/// I/O belongs off the async worker threads.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    fn load_all_sessions(&self) -> Result<BTreeMap<ChatId, ChatSession>, StoreError>;
    async fn save(&self, chat_id: ChatId, session: &ChatSession) -> Result<(), StoreError>;
}

/// Keeps sessions in memory only. Used by tests and as a no-persistence mode.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: Mutex<BTreeMap<ChatId, ChatSession>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sessions(sessions: BTreeMap<ChatId, ChatSession>) -> Self {
        Self {
            sessions: Mutex::new(sessions),
        }
    }

    /// Last saved state of `chat_id`, if any.
    pub fn get(&self, chat_id: ChatId) -> Option<ChatSession> {
        self.sessions
            .lock()
            .ok()
            .and_then(|sessions| sessions.get(&chat_id).cloned())
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    fn load_all_sessions(&self) -> Result<BTreeMap<ChatId, ChatSession>, StoreError> {
        let sessions = self.sessions.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(sessions.clone())
    }

    async fn save(&self, chat_id: ChatId, session: &ChatSession) -> Result<(), StoreError> {
        let mut sessions = self.sessions.lock().map_err(|_| StoreError::Poisoned)?;
        sessions.insert(chat_id, session.clone());
        Ok(())
    }
}
