mod memory;
pub mod normalize;

pub use memory::MemoryHistoryStore;

use crate::cli::Args;
use crate::error::ConfigError;
use crate::models::chat::{ ChatRequest, Content, Role, Turn };
use log::info;
use std::fmt;
use std::sync::Arc;

/// Identifies one conversation's memory.
///
/// Both ids are kept as separate fields so a `:` inside either one can never
/// make two different conversations share a key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConversationKey {
    chat_id: String,
    sender_id: String,
}

impl ConversationKey {
    pub fn new(chat_id: impl Into<String>, sender_id: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            sender_id: sender_id.into(),
        }
    }

    /// Key for a request, or `None` for a stateless call.
    pub fn from_request(request: &ChatRequest) -> Option<Self> {
        match (request.chat_id.as_deref(), request.sender_id.as_deref()) {
            (Some(chat_id), Some(sender_id)) if !chat_id.is_empty() && !sender_id.is_empty() => {
                Some(Self::new(chat_id, sender_id))
            }
            _ => None,
        }
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chat_id, self.sender_id)
    }
}

/// Bounded conversation memory shared by all request handlers.
///
/// Implementations never fail: an unknown key reads as an empty history.
pub trait HistoryStore: Send + Sync {
    fn append(&self, key: &ConversationKey, role: Role, content: Content);

    /// The most recent `max_turns` turns for `key`, oldest first.
    fn read(&self, key: &ConversationKey, max_turns: usize) -> Vec<Turn>;

    fn clear(&self, key: &ConversationKey);

    /// Number of distinct conversations currently held.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HistoryConfig {
    pub max_conversations: usize,
    pub max_stored_turns: usize,
    pub read_window: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_conversations: 1000,
            max_stored_turns: 50,
            read_window: 10,
        }
    }
}

impl HistoryConfig {
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let config = Self {
            max_conversations: args.history_max_conversations,
            max_stored_turns: args.history_max_turns,
            read_window: args.history_window,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_conversations == 0 {
            return Err(ConfigError::Invalid("history max conversations must be at least 1".into()));
        }
        if self.read_window > self.max_stored_turns {
            return Err(
                ConfigError::Invalid(
                    format!(
                        "history window ({}) cannot exceed stored turns per conversation ({})",
                        self.read_window,
                        self.max_stored_turns
                    )
                )
            );
        }
        Ok(())
    }
}

pub fn initialize_history_store(config: &HistoryConfig) -> Arc<dyn HistoryStore> {
    let store = MemoryHistoryStore::new(config.max_conversations, config.max_stored_turns);
    info!(
        "Conversation memory: in-process, max {} conversations, {} stored turns each, read window {}",
        store.capacity(),
        config.max_stored_turns,
        config.read_window
    );
    Arc::new(store)
}
