use crate::history::{ ConversationKey, HistoryStore };
use crate::models::chat::{ Content, Role, Turn };
use chrono::Utc;
use log::debug;
use lru::LruCache;
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::num::NonZeroUsize;

/// In-process conversation memory.
///
/// Conversations are kept in write order: appending to a conversation makes it the
/// most recent one, reads leave the order alone. Inserting a new conversation at
/// capacity evicts the least recently written one.
pub struct MemoryHistoryStore {
    conversations: RwLock<LruCache<ConversationKey, VecDeque<Turn>>>,
    max_stored_turns: usize,
}

impl MemoryHistoryStore {
    pub fn new(max_conversations: usize, max_stored_turns: usize) -> Self {
        let capacity = NonZeroUsize::new(max_conversations).unwrap_or(NonZeroUsize::MIN);
        Self {
            conversations: RwLock::new(LruCache::new(capacity)),
            max_stored_turns: max_stored_turns.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.conversations.read().cap().get()
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn append(&self, key: &ConversationKey, role: Role, content: Content) {
        let turn = Turn {
            role,
            content,
            created_at: Utc::now().timestamp_millis(),
        };

        let mut conversations = self.conversations.write();
        if let Some(turns) = conversations.get_mut(key) {
            turns.push_back(turn);
            while turns.len() > self.max_stored_turns {
                turns.pop_front();
            }
            return;
        }

        let mut turns = VecDeque::with_capacity(self.max_stored_turns.min(16));
        turns.push_back(turn);
        if let Some((evicted, _)) = conversations.push(key.clone(), turns) {
            debug!("Conversation memory full, evicted {}", evicted);
        }
    }

    fn read(&self, key: &ConversationKey, max_turns: usize) -> Vec<Turn> {
        let conversations = self.conversations.read();
        match conversations.peek(key) {
            Some(turns) => {
                let skip = turns.len().saturating_sub(max_turns);
                turns.iter().skip(skip).cloned().collect()
            }
            None => Vec::new(),
        }
    }

    fn clear(&self, key: &ConversationKey) {
        self.conversations.write().pop(key);
    }

    fn len(&self) -> usize {
        self.conversations.read().len()
    }
}
