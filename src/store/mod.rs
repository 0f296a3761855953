pub mod models;

use models::{DocumentContext, Message, Sender};
use std::sync::{Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Both stores hold plain data, so a poisoned lock is still consistent.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Conversation ──

struct ConversationLog {
    next_id: u64,
    messages: Vec<Message>,
}

/// Append-only, ordered message log.
pub struct ConversationStore {
    inner: Mutex<ConversationLog>,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(ConversationLog {
                next_id: 1,
                messages: Vec::new(),
            }),
        }
    }

    pub fn append(&self, sender: Sender, content: &str) -> Message {
        let mut log = lock(&self.inner);
        let msg = Message {
            id: log.next_id,
            sender,
            content: content.to_string(),
        };
        log.next_id += 1;
        log.messages.push(msg.clone());
        msg
    }

    pub fn snapshot(&self) -> Vec<Message> {
        lock(&self.inner).messages.clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── Document context ──

/// Single-slot holder for the current document context. Last write wins.
#[derive(Default)]
pub struct ContextStore {
    slot: Mutex<DocumentContext>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, context: DocumentContext) {
        *lock(&self.slot) = context;
    }

    pub fn clear(&self) {
        *lock(&self.slot) = DocumentContext::default();
    }

    /// Current text, or an empty string when no document is loaded.
    pub fn get(&self) -> String {
        let slot = lock(&self.slot);
        if slot.present {
            slot.raw_text.clone()
        } else {
            String::new()
        }
    }

    pub fn snapshot(&self) -> DocumentContext {
        lock(&self.slot).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_assigns_increasing_ids() {
        let store = ConversationStore::new();
        let a = store.append(Sender::User, "same");
        let b = store.append(Sender::Assistant, "same");
        let c = store.append(Sender::User, "same");
        assert!(a.id < b.id && b.id < c.id);

        let snapshot = store.snapshot();
        assert_eq!(snapshot, vec![a, b, c]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_snapshot_is_detached_copy() {
        let store = ConversationStore::new();
        store.append(Sender::User, "hi");
        let before = store.snapshot();
        store.append(Sender::Assistant, "hello");
        assert_eq!(before.len(), 1);
        assert_eq!(store.snapshot().len(), 2);
    }

    #[test]
    fn test_context_set_replaces_previous() {
        let store = ContextStore::new();
        assert!(!store.snapshot().present);
        assert_eq!(store.get(), "");

        store.set(DocumentContext::new("A text".into(), Some("a.pdf".into()), 1));
        store.set(DocumentContext::new("B text".into(), Some("b.pdf".into()), 2));
        assert_eq!(store.get(), "B text");
        assert_eq!(store.snapshot().file_name.as_deref(), Some("b.pdf"));
    }

    #[test]
    fn test_context_clear_is_idempotent() {
        let store = ContextStore::new();
        store.set(DocumentContext::new("text".into(), None, 1));
        store.clear();
        store.clear();
        let ctx = store.snapshot();
        assert!(!ctx.present);
        assert!(ctx.raw_text.is_empty());
        assert_eq!(store.get(), "");
    }
}
